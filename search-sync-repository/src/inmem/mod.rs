//! In-memory search engine for tests and local runs without a cluster.

mod backend;

pub use backend::{BackendOperation, InMemoryConnector, InMemorySearchBackend, IndexSnapshot};
