//! Interface definitions for the search engine backend.
//!
//! This module defines the abstract `SearchBackend` and `SearchConnector` traits
//! that allow for dependency injection and swappable engine implementations.

mod search_backend;

pub use search_backend::{SearchBackend, SearchConnector};
