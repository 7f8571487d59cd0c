//! Type definitions for the customer search sync.

pub mod change_event;
pub mod customer;
pub mod customer_document;
