use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Open,
    Assigned,
    OnRoute,
    Delivered,
    Paid,
    Closed,
    Cancelled,
    Dispute,
    /// Legacy value still present in historical rows. Must deserialize and
    /// display, but is never a transition target and has no outgoing
    /// transitions.
    Returned,
}

impl DeliveryStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeliveryStatus::Closed
                | DeliveryStatus::Cancelled
                | DeliveryStatus::Dispute
                | DeliveryStatus::Returned
        )
    }

    /// States reachable only after a driver has been assigned. In these
    /// states `chosen_driver_id` is always set; in `Open` and `Cancelled`
    /// it is always `None`.
    pub fn requires_driver(self) -> bool {
        matches!(
            self,
            DeliveryStatus::Assigned
                | DeliveryStatus::OnRoute
                | DeliveryStatus::Delivered
                | DeliveryStatus::Paid
                | DeliveryStatus::Closed
                | DeliveryStatus::Dispute
        )
    }
}

/// One endpoint of the route. District and subdistrict are coarse and
/// always visible; address, coordinates and contact phone are gated by the
/// disclosure policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub district: String,
    pub subdistrict: String,
    pub address: String,
    pub location: GeoPoint,
    pub contact_phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub chosen_driver_id: Option<Uuid>,
    pub status: DeliveryStatus,
    pub pickup: Stop,
    pub dropoff: Stop,
    /// `None` means the price is negotiable.
    pub price: Option<u64>,
    pub note: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub on_route_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDelivery {
    pub pickup: Stop,
    pub dropoff: Stop,
    pub price: Option<u64>,
    #[serde(default)]
    pub note: String,
    pub category: String,
}
