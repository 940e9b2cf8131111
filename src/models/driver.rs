use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public identity shown to sellers when listing bids and, after
/// assignment, as the counterparty contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverProfile {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
