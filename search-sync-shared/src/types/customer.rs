//! Customer snapshot types.
//!
//! This module defines the customer record as the primary store publishes it
//! alongside each lifecycle event.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Account status of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
    /// Set by staff from the CRM.
    Blocked,
}

impl CustomerStatus {
    /// The value stored in the `status` keyword field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional profile record related to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CustomerProfile {
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub nationality: Option<String>,
    /// Free-form address object.
    #[serde(default)]
    pub address: Option<Value>,
}

/// Snapshot of a customer row taken at commit time.
///
/// # Fields
///
/// - `id`: Primary key in the relational store
/// - `email`: Login email, unique per customer
/// - `first_name` / `last_name`: Display names
/// - `phone`: Contact phone, may be empty
/// - `country`: ISO 3166-1 alpha-2 code, may be empty
/// - `status`: Account status
/// - `kyc_status`: KYC review state when the customer has one
/// - `agent_id`: Assigned sales agent, if any
/// - `profile`: Related profile record, if one exists
/// - `created_at` / `updated_at`: Row timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub status: CustomerStatus,
    #[serde(default)]
    pub kyc_status: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub profile: Option<CustomerProfile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Create an active customer with no optional related data.
    ///
    /// Both timestamps are set to the current time.
    ///
    /// # Example
    ///
    /// ```
    /// use search_sync_shared::{Customer, CustomerStatus};
    ///
    /// let customer = Customer::new(42, "a@x.com");
    /// assert_eq!(customer.status, CustomerStatus::Active);
    /// assert!(customer.profile.is_none());
    /// ```
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            phone: String::new(),
            country: String::new(),
            status: CustomerStatus::Active,
            kyc_status: None,
            agent_id: None,
            profile: None,
            created_at: now,
            updated_at: now,
        }
    }
}
