//! Customer index definition and projection.

use serde_json::{json, Value};

use search_sync_shared::{Customer, CustomerDocument, ProfileDocument};

use super::{DocumentProjector, IndexDefinition};

/// Logical name of the customer index.
pub const CUSTOMER_INDEX: &str = "customers";

/// Index definition for customers.
///
/// The physical name is `{prefix}_customers`, e.g. `dev_customers`.
#[derive(Debug, Clone)]
pub struct CustomerIndex {
    environment_prefix: String,
}

impl CustomerIndex {
    /// Create the definition for the given environment prefix.
    pub fn new(environment_prefix: impl Into<String>) -> Self {
        Self {
            environment_prefix: environment_prefix.into(),
        }
    }
}

impl IndexDefinition for CustomerIndex {
    fn logical_name(&self) -> &str {
        CUSTOMER_INDEX
    }

    fn environment_prefix(&self) -> &str {
        &self.environment_prefix
    }

    /// Names are analyzed with `custom_analyzer` and keep a `keyword` sub-field
    /// for exact matching and sorting; everything else is an exact-match keyword
    /// or a date.
    fn mapping(&self) -> Value {
        json!({
            "properties": {
                "id": { "type": "keyword" },
                "email": { "type": "keyword" },
                "first_name": {
                    "type": "text",
                    "analyzer": "custom_analyzer",
                    "fields": {
                        "keyword": { "type": "keyword" }
                    }
                },
                "last_name": {
                    "type": "text",
                    "analyzer": "custom_analyzer",
                    "fields": {
                        "keyword": { "type": "keyword" }
                    }
                },
                "phone": { "type": "keyword" },
                "country": { "type": "keyword" },
                "status": { "type": "keyword" },
                "kyc_status": { "type": "keyword" },
                "agent_id": { "type": "keyword" },
                "profile": {
                    "properties": {
                        "date_of_birth": { "type": "date" },
                        "nationality": { "type": "keyword" },
                        "address": { "type": "object" }
                    }
                },
                "created_at": { "type": "date" },
                "updated_at": { "type": "date" }
            }
        })
    }
}

impl DocumentProjector for CustomerIndex {
    type Entity = Customer;
    type Document = CustomerDocument;

    fn document_id(&self, entity: &Customer) -> String {
        entity.id.to_string()
    }

    fn project(&self, customer: &Customer) -> CustomerDocument {
        let profile = customer
            .profile
            .as_ref()
            .map(|p| ProfileDocument {
                date_of_birth: p.date_of_birth,
                nationality: p.nationality.clone(),
                address: p.address.clone(),
            })
            .unwrap_or_default();

        CustomerDocument {
            id: self.document_id(customer),
            email: customer.email.clone(),
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            phone: customer.phone.clone(),
            country: customer.country.clone(),
            status: customer.status.as_str().to_string(),
            kyc_status: customer.kyc_status.clone(),
            agent_id: customer.agent_id.clone(),
            profile,
            created_at: customer.created_at,
            updated_at: customer.updated_at,
        }
    }
}
