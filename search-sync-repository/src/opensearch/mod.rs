//! OpenSearch implementation of the search backend.
//!
//! This module provides a concrete implementation of `SearchBackend`
//! using OpenSearch as the engine.

mod provider;

pub use provider::{OpenSearchBackend, OpenSearchConnector};
