//! Consumer module for change propagation.
//!
//! Reads change messages and hands them to the `ChangePropagator`.

mod line_consumer;
mod messages;

pub use line_consumer::{LineConsumer, StreamSummary};
pub use messages::{ChangeAction, ChangeMessage};
