//! # Search Sync
//!
//! Keeps the customer search index in step with the primary store.
//!
//! ## Architecture
//!
//! 1. **Consumer**: Reads change messages (NDJSON) and submits them
//! 2. **Propagator**: Projects entities and applies writes in per-entity order
//! 3. **Search client**: Owns the engine connection (`search-sync-repository`)
//!
//! ## Modules
//!
//! - [`config`]: Dependency initialization
//! - [`consumer`]: Change message decoding and the line consumer
//! - [`propagator`]: Ordered, non-blocking change propagation
//! - [`errors`]: Error types for propagation

pub mod config;
pub mod consumer;
pub mod errors;
pub mod propagator;

pub use config::Dependencies;
pub use consumer::{ChangeMessage, LineConsumer, StreamSummary};
pub use errors::SyncError;
pub use propagator::{ChangePropagator, PropagatorConfig, PropagatorStats};

use search_sync_repository::SearchIndexError;
use thiserror::Error;

/// Errors that stop the sync service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Search engine error during startup.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchIndexError),

    /// Propagation error.
    #[error("Sync error: {0}")]
    SyncError(#[from] SyncError),
}

impl ServiceError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
