use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::DriverProfile;

/// A driver's recorded interest in an open delivery. Immutable after
/// insert; at most one per (delivery, driver) pair. Bids are kept after
/// assignment as seller-visible history but become inert once the delivery
/// leaves `Open`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub driver_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A bid joined with the bidding driver's public profile, for the seller's
/// decision-making.
#[derive(Debug, Clone, Serialize)]
pub struct BidView {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub driver: DriverProfile,
    pub created_at: DateTime<Utc>,
}
