//! Search backend trait definitions.
//!
//! This module defines the low-level interface to a search engine, allowing for
//! different implementations (OpenSearch, in-memory, etc.).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::SearchClientConfig;
use crate::errors::SearchIndexError;
use crate::types::{BulkResponse, Document, SearchResponse};

/// Abstracts one live connection to a search engine.
///
/// Implementations translate engine responses into `SearchIndexError` without
/// applying any policy: every method returns its failure to the caller.
/// `SearchClient` decides which failures are raised and which are only logged.
/// Transport-level failures (refused connection, timeout) must be reported as
/// `SearchIndexError::ConnectionError` so the client can drop the connection and
/// reconnect on the next call.
///
/// Implementations are shared across tasks and must be safe for concurrent use.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Verify the engine is reachable.
    async fn ping(&self) -> Result<(), SearchIndexError>;

    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError>;

    /// Create an index with the given mapping and settings.
    async fn create_index(
        &self,
        index: &str,
        mapping: &Value,
        settings: &Value,
    ) -> Result<(), SearchIndexError>;

    /// Close an index; a closed index rejects reads and writes.
    async fn close_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Reopen a closed index.
    async fn open_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Apply index settings.
    async fn put_settings(&self, index: &str, settings: &Value) -> Result<(), SearchIndexError>;

    /// Apply a field mapping.
    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), SearchIndexError>;

    /// Write a full document under `id`, replacing any previous version.
    ///
    /// With `refresh`, the write is visible to reads once the call returns.
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
        refresh: bool,
    ) -> Result<(), SearchIndexError>;

    /// Merge `fields` into an existing document. The document must exist.
    async fn update_document(
        &self,
        index: &str,
        id: &str,
        fields: &Value,
        refresh: bool,
    ) -> Result<(), SearchIndexError>;

    /// Delete a document.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the document was deleted
    /// * `Ok(false)` - If no document had that id
    /// * `Err(SearchIndexError)` - If the deletion fails
    async fn delete_document(
        &self,
        index: &str,
        id: &str,
        refresh: bool,
    ) -> Result<bool, SearchIndexError>;

    /// Execute a bulk request given as alternating action / body lines.
    ///
    /// Per-item failures are reported inside the `BulkResponse`; only a failure
    /// of the request as a whole is an `Err`.
    async fn bulk(
        &self,
        operations: Vec<Value>,
        refresh: bool,
    ) -> Result<BulkResponse, SearchIndexError>;

    /// Fetch a document by id, `None` if it does not exist.
    async fn get_document(&self, index: &str, id: &str)
        -> Result<Option<Document>, SearchIndexError>;

    /// Run a query (the value of the `query` key of a search body).
    async fn search(&self, index: &str, query: &Value) -> Result<SearchResponse, SearchIndexError>;
}

/// Opens connections to a search engine.
///
/// `SearchClient` calls this once per connection attempt; the returned backend is
/// pinged before it is used.
#[async_trait]
pub trait SearchConnector: Send + Sync {
    /// Open a new connection using the given configuration.
    async fn connect(
        &self,
        config: &SearchClientConfig,
    ) -> Result<Arc<dyn SearchBackend>, SearchIndexError>;
}
