//! Request and response types for search index operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle of the client's connection to the search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection attempt has been made yet.
    Uninitialized,
    /// A connection attempt is in progress.
    Connecting,
    /// The engine answered a ping on the current connection.
    Connected,
    /// The connection was closed, dropped after a transport failure, or never came up.
    Disconnected,
}

/// A document fetched by id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Document {
    #[serde(rename = "_index")]
    pub index: String,

    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_version", default)]
    pub version: Option<u64>,

    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// Raw get-by-id response; `found` is false for a missing document.
#[derive(Debug, Clone, Deserialize)]
pub struct GetDocumentResponse {
    #[serde(rename = "_index")]
    pub index: String,

    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_version", default)]
    pub version: Option<u64>,

    #[serde(default)]
    pub found: bool,

    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
}

impl GetDocumentResponse {
    /// The document, if the engine found one.
    pub fn into_document(self) -> Option<Document> {
        if !self.found {
            return None;
        }
        Some(Document {
            index: self.index,
            id: self.id,
            version: self.version,
            source: self.source.unwrap_or(Value::Null),
        })
    }
}

/// Search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,

    #[serde(default)]
    pub timed_out: bool,

    pub hits: SearchHits,
}

impl SearchResponse {
    /// Total number of matching documents, when the engine reported it.
    pub fn total(&self) -> u64 {
        self.hits.total.as_ref().map(|t| t.value).unwrap_or(0)
    }

    /// Ids of the returned hits, in rank order.
    pub fn ids(&self) -> Vec<&str> {
        self.hits.hits.iter().map(|h| h.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHits {
    #[serde(default)]
    pub total: Option<SearchTotal>,

    #[serde(default)]
    pub max_score: Option<f64>,

    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchTotal {
    pub value: u64,
    #[serde(default)]
    pub relation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_index")]
    pub index: String,

    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_score", default)]
    pub score: Option<f64>,

    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// Bulk API response.
///
/// Each item is a single-key object mapping the action kind (`update`,
/// `index`, `create`, `delete`) to its outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,

    pub errors: bool,

    #[serde(default)]
    pub items: Vec<BTreeMap<String, BulkItemOutcome>>,
}

/// Outcome of one bulk action.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItemOutcome {
    #[serde(rename = "_index", default)]
    pub index: Option<String>,

    #[serde(rename = "_id", default)]
    pub id: Option<String>,

    #[serde(default)]
    pub status: u16,

    #[serde(default)]
    pub error: Option<Value>,
}

/// A failed bulk item, as logged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkItemFailure {
    /// Action kind the item was submitted under.
    pub action: String,
    pub id: Option<String>,
    pub status: u16,
    pub error: Value,
}

impl BulkResponse {
    /// Collect every failed item, whatever its action kind.
    pub fn failures(&self) -> Vec<BulkItemFailure> {
        self.items
            .iter()
            .flat_map(|item| item.iter())
            .filter_map(|(action, outcome)| {
                outcome.error.as_ref().map(|error| BulkItemFailure {
                    action: action.clone(),
                    id: outcome.id.clone(),
                    status: outcome.status,
                    error: error.clone(),
                })
            })
            .collect()
    }
}

/// Liveness report for probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    /// `healthy` or `unhealthy`.
    pub status: String,
    pub connected: bool,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            connected: true,
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            status: "unhealthy".to_string(),
            connected: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bulk_failures_cover_every_action_kind() {
        let response: BulkResponse = serde_json::from_value(json!({
            "took": 3,
            "errors": true,
            "items": [
                { "update": { "_index": "dev_customers", "_id": "1", "status": 200 } },
                { "update": { "_index": "dev_customers", "_id": "2", "status": 400,
                    "error": { "type": "mapper_parsing_exception", "reason": "failed to parse field [created_at]" } } },
                { "index": { "_index": "dev_customers", "_id": "3", "status": 429,
                    "error": { "type": "es_rejected_execution_exception" } } },
                { "delete": { "_index": "dev_customers", "_id": "4", "status": 404 } }
            ]
        }))
        .unwrap();

        let failures = response.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].action, "update");
        assert_eq!(failures[0].id.as_deref(), Some("2"));
        assert_eq!(failures[0].status, 400);
        assert_eq!(failures[1].action, "index");
        assert_eq!(failures[1].id.as_deref(), Some("3"));
    }

    #[test]
    fn test_bulk_without_errors() {
        let response: BulkResponse = serde_json::from_value(json!({
            "errors": false,
            "items": [ { "update": { "_id": "1", "status": 201 } } ]
        }))
        .unwrap();
        assert!(response.failures().is_empty());
    }

    #[test]
    fn test_get_response_not_found() {
        let response: GetDocumentResponse = serde_json::from_value(json!({
            "_index": "dev_customers",
            "_id": "404",
            "found": false
        }))
        .unwrap();
        assert!(response.into_document().is_none());
    }

    #[test]
    fn test_search_response() {
        let response: SearchResponse = serde_json::from_value(json!({
            "took": 2,
            "timed_out": false,
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "max_score": 1.2,
                "hits": [
                    { "_index": "dev_customers", "_id": "42", "_score": 1.2, "_source": { "email": "a@x.com" } }
                ]
            }
        }))
        .unwrap();

        assert_eq!(response.total(), 1);
        assert_eq!(response.ids(), vec!["42"]);
        assert_eq!(response.hits.hits[0].source["email"], "a@x.com");
    }
}
