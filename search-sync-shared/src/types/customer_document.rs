//! Customer document types for the search index.
//!
//! This module defines the document structure that is indexed in the search engine
//! for every customer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Profile sub-document.
///
/// Always present on a [`CustomerDocument`]; its fields are `null` when the
/// customer has no profile record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProfileDocument {
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub address: Option<Value>,
}

/// Document representation of a customer in the search index.
///
/// Optional fields serialize as explicit `null` rather than being skipped, so
/// every document carries exactly the fields the index mapping declares.
/// Timestamps serialize as RFC 3339 text and calendar dates as `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerDocument {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub country: String,
    pub status: String,
    pub kyc_status: Option<String>,
    pub agent_id: Option<String>,
    pub profile: ProfileDocument,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerDocument {
    /// The document ID used in the search index.
    pub fn document_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> CustomerDocument {
        CustomerDocument {
            id: "42".to_string(),
            email: "a@x.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: String::new(),
            country: "GB".to_string(),
            status: "active".to_string(),
            kyc_status: None,
            agent_id: None,
            profile: ProfileDocument::default(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 15, 30).unwrap(),
        }
    }

    #[test]
    fn test_optional_fields_serialize_as_null() {
        let json = serde_json::to_value(sample()).unwrap();

        assert!(json["kyc_status"].is_null());
        assert!(json["agent_id"].is_null());
        assert!(json["profile"].is_object());
        assert!(json["profile"]["date_of_birth"].is_null());
        assert!(json["profile"]["nationality"].is_null());
        assert!(json["profile"]["address"].is_null());
    }

    #[test]
    fn test_timestamps_use_rfc3339_text() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["created_at"], "2024-05-01T08:30:00Z");

        let back: CustomerDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back.created_at, sample().created_at);
        assert_eq!(back.document_id(), "42");
    }
}
