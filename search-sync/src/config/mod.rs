//! Configuration and dependency wiring for the sync service.

mod dependencies;

pub use dependencies::Dependencies;
