//! Search index error types.
//!
//! This module defines the unified error type for all search index operations,
//! including both low-level backend errors and high-level client errors.

use thiserror::Error;

/// Unified errors from search index operations.
///
/// Used by the `SearchBackend` trait and `SearchClient` for all search index
/// operations. Startup paths (configuration, connection, provisioning) and read
/// paths (`get`, `search`) return these errors to the caller. Write paths
/// (`add_document`, `delete_document`, `bulk_update`) never do: they log the
/// error and report `false` instead.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Required connection or index settings are missing.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to establish or keep a connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A read operation (get/search) failed.
    #[error("Operation error: {0}")]
    OperationError(String),

    /// Validation error (e.g., a bulk document without an id).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to write a document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Bulk operation had failures.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to create an index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to update the settings or mapping of an existing index.
    #[error("Index update error: {0}")]
    IndexUpdateError(String),

    /// Failed to parse a response from the search engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search engine.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Document not found.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
}

impl SearchIndexError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an operation error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::OperationError(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create an index update error.
    pub fn index_update(msg: impl Into<String>) -> Self {
        Self::IndexUpdateError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a document not found error.
    pub fn document_not_found(index: &str, id: &str) -> Self {
        Self::DocumentNotFound(format!("index={}, id={}", index, id))
    }

    /// Whether the error means the transport to the engine is unusable.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

impl From<serde_json::Error> for SearchIndexError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_cause() {
        let err = SearchIndexError::operation("Failed to search documents: boom");
        assert_eq!(
            err.to_string(),
            "Operation error: Failed to search documents: boom"
        );

        let err = SearchIndexError::document_not_found("dev_customers", "42");
        assert_eq!(
            err.to_string(),
            "Document not found: index=dev_customers, id=42"
        );
    }

    #[test]
    fn test_is_connection_error() {
        assert!(SearchIndexError::connection("refused").is_connection_error());
        assert!(!SearchIndexError::index("rejected").is_connection_error());
    }
}
