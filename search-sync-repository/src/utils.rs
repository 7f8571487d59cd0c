//! Utility functions for the search sync repository.

use serde_json::{json, Value};

use crate::errors::SearchIndexError;

/// Extract the document id from a projected document's `id` field.
///
/// String ids are used as-is; integer ids are rendered in decimal.
///
/// # Example
///
/// ```
/// use search_sync_repository::utils::document_id_of;
/// use serde_json::json;
///
/// assert_eq!(document_id_of(&json!({ "id": "42" })).unwrap(), "42");
/// assert_eq!(document_id_of(&json!({ "id": 7 })).unwrap(), "7");
/// ```
pub fn document_id_of(document: &Value) -> Result<String, SearchIndexError> {
    match document.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) if id.is_i64() || id.is_u64() => Ok(id.to_string()),
        Some(other) => Err(SearchIndexError::validation(format!(
            "Document id must be a non-empty string or integer, got {}",
            other
        ))),
        None => Err(SearchIndexError::validation("Document has no id field")),
    }
}

/// Body of one bulk request plus the documents left out of it.
#[derive(Debug, Default)]
pub struct BulkRequest {
    /// Alternating action-metadata / document lines.
    pub operations: Vec<Value>,
    /// Position in the input and reason for every document without a usable id.
    pub rejected: Vec<(usize, SearchIndexError)>,
}

impl BulkRequest {
    /// Number of documents in the request body.
    pub fn len(&self) -> usize {
        self.operations.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Build the body of a doc-as-upsert bulk request.
///
/// Produces alternating action-metadata / document pairs:
///
/// ```text
/// {"update": {"_index": "<index>", "_id": "<id>"}}
/// {"doc": <document>, "doc_as_upsert": true}
/// ```
///
/// A document without a usable id is left out and recorded in
/// `rejected`; the rest are still included.
pub fn build_bulk_operations(index: &str, documents: &[Value]) -> BulkRequest {
    let mut request = BulkRequest {
        operations: Vec::with_capacity(documents.len() * 2),
        rejected: Vec::new(),
    };
    for (position, document) in documents.iter().enumerate() {
        match document_id_of(document) {
            Ok(id) => {
                request
                    .operations
                    .push(json!({ "update": { "_index": index, "_id": id } }));
                request
                    .operations
                    .push(json!({ "doc": document, "doc_as_upsert": true }));
            }
            Err(e) => request.rejected.push((position, e)),
        }
    }
    request
}
