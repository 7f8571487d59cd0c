//! # Search Sync Repository
//!
//! This crate owns everything that talks to the search engine: index
//! definitions and document projection, the `SearchClient` with its connection
//! lifecycle and failure policy, and the `SearchBackend` seam with OpenSearch
//! and in-memory implementations.

pub mod client;
pub mod config;
pub mod errors;
pub mod indices;
pub mod inmem;
pub mod interfaces;
pub mod opensearch;
pub mod types;
pub mod utils;

pub use client::SearchClient;
pub use config::{Credentials, SearchClientConfig};
pub use errors::SearchIndexError;
pub use indices::{default_settings, CustomerIndex, DocumentProjector, IndexDefinition, CUSTOMER_INDEX};
pub use interfaces::{SearchBackend, SearchConnector};
pub use opensearch::{OpenSearchBackend, OpenSearchConnector};
pub use types::{
    BulkItemFailure, BulkResponse, ConnectionState, Document, HealthStatus, SearchHit,
    SearchResponse,
};
pub use utils::{build_bulk_operations, document_id_of, BulkRequest};
