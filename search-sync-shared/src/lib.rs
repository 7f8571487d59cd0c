//! # Search Sync Shared
//!
//! This crate defines the data structures shared across the customer search sync:
//! the customer snapshot published by the primary store, the document shape stored
//! in the search index, and the lifecycle events that connect the two.

pub mod types;

pub use types::change_event::{ChangeKind, EntityChangeEvent};
pub use types::customer::{Customer, CustomerProfile, CustomerStatus};
pub use types::customer_document::{CustomerDocument, ProfileDocument};
