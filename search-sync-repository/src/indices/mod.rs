//! Index definitions and document projection.
//!
//! An index definition declares, per entity type, the physical index name, the
//! field mapping and the engine settings. A projector turns an entity snapshot
//! into the document shape the mapping declares. Both are pure: nothing here
//! performs I/O, so definitions are usable before any connection exists.

mod customer;
mod settings;

pub use customer::{CustomerIndex, CUSTOMER_INDEX};
pub use settings::default_settings;

use serde::Serialize;
use serde_json::Value;

use crate::errors::SearchIndexError;

/// Declares the shape and settings of one search index.
pub trait IndexDefinition: Send + Sync {
    /// Stable logical identifier, e.g. `customers`.
    fn logical_name(&self) -> &str;

    /// Process-wide environment prefix, e.g. `dev`.
    fn environment_prefix(&self) -> &str;

    /// Field mapping (the `mappings` body of a create-index request).
    fn mapping(&self) -> Value;

    /// Engine-level index settings.
    fn settings(&self) -> Value {
        default_settings()
    }

    /// Physical index name, `{environment_prefix}_{logical_name}`.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The physical index name
    /// * `Err(SearchIndexError::ConfigurationError)` - If the logical name is unset
    fn index_name(&self) -> Result<String, SearchIndexError> {
        let logical = self.logical_name().trim();
        if logical.is_empty() {
            return Err(SearchIndexError::configuration(
                "index definition has no index name",
            ));
        }
        Ok(format!("{}_{}", self.environment_prefix(), logical))
    }
}

/// Converts primary-store entities into search documents.
pub trait DocumentProjector: IndexDefinition {
    /// Primary-store entity snapshot.
    type Entity: Send + Sync + 'static;
    /// Document stored in the index.
    type Document: Serialize;

    /// Identifier of the document for an entity; equals the entity's primary key.
    fn document_id(&self, entity: &Self::Entity) -> String;

    /// Project an entity into its document. Total and pure.
    fn project(&self, entity: &Self::Entity) -> Self::Document;

    /// Project an entity straight to the JSON source sent to the engine.
    fn to_source(&self, entity: &Self::Entity) -> Result<Value, SearchIndexError> {
        Ok(serde_json::to_value(self.project(entity))?)
    }
}
