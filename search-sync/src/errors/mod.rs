//! Error types for change propagation.

use thiserror::Error;

/// Errors raised while feeding change events to the propagator.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A change message could not be decoded.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Reading the change stream failed.
    #[error("IO error: {0}")]
    IoError(String),

    /// A worker could not be reached or joined.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl SyncError {
    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}
