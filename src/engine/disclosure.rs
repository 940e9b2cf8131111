use serde::Serialize;
use uuid::Uuid;

use crate::models::actor::Role;
use crate::models::delivery::{Delivery, DeliveryStatus, GeoPoint};

/// Which gated fields a viewer may see. Computed fresh on every read from
/// the current row; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disclosure {
    pub pickup_address: bool,
    pub pickup_contact: bool,
    pub dropoff_address: bool,
    pub dropoff_contact: bool,
    pub driver_profile: bool,
}

impl Disclosure {
    pub const NONE: Disclosure = Disclosure {
        pickup_address: false,
        pickup_contact: false,
        dropoff_address: false,
        dropoff_contact: false,
        driver_profile: false,
    };
}

/// Pure policy function of (row, viewer role, viewer id).
///
/// Before assignment everyone sees coarse location only. Once assigned,
/// the chosen driver gains the pickup address and pickup contact phone,
/// and the seller gains the driver's profile. Once the item is picked up
/// the chosen driver additionally gains the dropoff address and contact.
/// A driver who bid but was not chosen sees coarse fields only.
///
/// Dropoff visibility keys off `on_route_at` rather than the current
/// status, so a field revealed at pickup stays visible through
/// `Delivered`, `Paid`, `Closed` and a later dispute.
pub fn visible_fields(delivery: &Delivery, role: Role, viewer_id: Uuid) -> Disclosure {
    let is_chosen_driver =
        role == Role::Driver && delivery.chosen_driver_id == Some(viewer_id);
    let is_owning_seller = role == Role::Seller && delivery.seller_id == viewer_id;
    let picked_up = delivery.on_route_at.is_some();

    Disclosure {
        pickup_address: is_chosen_driver,
        pickup_contact: is_chosen_driver,
        dropoff_address: is_chosen_driver && picked_up,
        dropoff_contact: is_chosen_driver && picked_up,
        driver_profile: is_owning_seller && delivery.chosen_driver_id.is_some(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StopView {
    pub district: String,
    pub subdistrict: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

/// A delivery as one particular viewer is allowed to see it.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryView {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub chosen_driver_id: Option<Uuid>,
    pub status: DeliveryStatus,
    pub pickup: StopView,
    pub dropoff: StopView,
    pub price: Option<u64>,
    pub note: String,
    pub category: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub on_route_at: Option<chrono::DateTime<chrono::Utc>>,
    pub closed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Applies `visible_fields` to produce the redacted projection.
pub fn project(delivery: &Delivery, role: Role, viewer_id: Uuid) -> DeliveryView {
    let disclosure = visible_fields(delivery, role, viewer_id);
    project_with(delivery, disclosure)
}

/// Coarse projection for anonymous browsing of the open board.
pub fn project_coarse(delivery: &Delivery) -> DeliveryView {
    project_with(delivery, Disclosure::NONE)
}

fn project_with(delivery: &Delivery, disclosure: Disclosure) -> DeliveryView {
    let pickup = StopView {
        district: delivery.pickup.district.clone(),
        subdistrict: delivery.pickup.subdistrict.clone(),
        address: disclosure
            .pickup_address
            .then(|| delivery.pickup.address.clone()),
        location: disclosure.pickup_address.then(|| delivery.pickup.location),
        contact_phone: disclosure
            .pickup_contact
            .then(|| delivery.pickup.contact_phone.clone()),
    };

    let dropoff = StopView {
        district: delivery.dropoff.district.clone(),
        subdistrict: delivery.dropoff.subdistrict.clone(),
        address: disclosure
            .dropoff_address
            .then(|| delivery.dropoff.address.clone()),
        location: disclosure.dropoff_address.then(|| delivery.dropoff.location),
        contact_phone: disclosure
            .dropoff_contact
            .then(|| delivery.dropoff.contact_phone.clone()),
    };

    DeliveryView {
        id: delivery.id,
        seller_id: delivery.seller_id,
        chosen_driver_id: delivery.chosen_driver_id,
        status: delivery.status,
        pickup,
        dropoff,
        price: delivery.price,
        note: delivery.note.clone(),
        category: delivery.category.clone(),
        created_at: delivery.created_at,
        on_route_at: delivery.on_route_at,
        closed_at: delivery.closed_at,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{visible_fields, Disclosure};
    use crate::models::actor::Role;
    use crate::models::delivery::{Delivery, DeliveryStatus, GeoPoint, Stop};

    fn stop(district: &str) -> Stop {
        Stop {
            district: district.to_string(),
            subdistrict: "center".to_string(),
            address: "12 Canal St".to_string(),
            location: GeoPoint { lat: 13.75, lng: 100.5 },
            contact_phone: "+66-81-000-0000".to_string(),
        }
    }

    fn delivery(status: DeliveryStatus, chosen: Option<Uuid>, picked_up: bool) -> Delivery {
        Delivery {
            id: Uuid::from_u128(1),
            seller_id: Uuid::from_u128(10),
            chosen_driver_id: chosen,
            status,
            pickup: stop("north"),
            dropoff: stop("south"),
            price: Some(120),
            note: String::new(),
            category: "documents".to_string(),
            created_at: Utc::now(),
            on_route_at: picked_up.then(Utc::now),
            closed_at: None,
        }
    }

    fn granted(d: Disclosure) -> u32 {
        [
            d.pickup_address,
            d.pickup_contact,
            d.dropoff_address,
            d.dropoff_contact,
            d.driver_profile,
        ]
        .iter()
        .filter(|v| **v)
        .count() as u32
    }

    #[test]
    fn open_delivery_reveals_nothing() {
        let d = delivery(DeliveryStatus::Open, None, false);
        let driver = Uuid::from_u128(20);

        assert_eq!(visible_fields(&d, Role::Driver, driver), Disclosure::NONE);
        assert_eq!(
            visible_fields(&d, Role::Seller, d.seller_id),
            Disclosure::NONE
        );
    }

    #[test]
    fn chosen_driver_sees_pickup_after_assignment() {
        let driver = Uuid::from_u128(20);
        let d = delivery(DeliveryStatus::Assigned, Some(driver), false);

        let fields = visible_fields(&d, Role::Driver, driver);
        assert!(fields.pickup_address);
        assert!(fields.pickup_contact);
        assert!(!fields.dropoff_address);
        assert!(!fields.dropoff_contact);
    }

    #[test]
    fn chosen_driver_sees_dropoff_after_pickup() {
        let driver = Uuid::from_u128(20);
        let d = delivery(DeliveryStatus::OnRoute, Some(driver), true);

        let fields = visible_fields(&d, Role::Driver, driver);
        assert!(fields.dropoff_address);
        assert!(fields.dropoff_contact);
    }

    #[test]
    fn losing_bidder_reverts_to_coarse_after_assignment() {
        let winner = Uuid::from_u128(20);
        let loser = Uuid::from_u128(21);
        let d = delivery(DeliveryStatus::Assigned, Some(winner), false);

        assert_eq!(visible_fields(&d, Role::Driver, loser), Disclosure::NONE);
    }

    #[test]
    fn seller_sees_driver_profile_once_assigned() {
        let driver = Uuid::from_u128(20);
        let d = delivery(DeliveryStatus::Assigned, Some(driver), false);

        let fields = visible_fields(&d, Role::Seller, d.seller_id);
        assert!(fields.driver_profile);
        assert!(!fields.pickup_address);
    }

    #[test]
    fn visibility_is_monotone_for_the_chosen_driver() {
        let driver = Uuid::from_u128(20);

        let stages = [
            delivery(DeliveryStatus::Open, None, false),
            delivery(DeliveryStatus::Assigned, Some(driver), false),
            delivery(DeliveryStatus::OnRoute, Some(driver), true),
            delivery(DeliveryStatus::Delivered, Some(driver), true),
            delivery(DeliveryStatus::Paid, Some(driver), true),
            delivery(DeliveryStatus::Closed, Some(driver), true),
        ];

        let mut previous = 0;
        for stage in &stages {
            let count = granted(visible_fields(stage, Role::Driver, driver));
            assert!(count >= previous, "visibility regressed at {:?}", stage.status);
            previous = count;
        }
    }

    #[test]
    fn dispute_after_pickup_keeps_dropoff_visible() {
        let driver = Uuid::from_u128(20);
        let d = delivery(DeliveryStatus::Dispute, Some(driver), true);

        let fields = visible_fields(&d, Role::Driver, driver);
        assert!(fields.dropoff_address);
        assert!(fields.dropoff_contact);
    }

    #[test]
    fn foreign_seller_sees_nothing_extra() {
        let driver = Uuid::from_u128(20);
        let other_seller = Uuid::from_u128(99);
        let d = delivery(DeliveryStatus::OnRoute, Some(driver), true);

        assert_eq!(
            visible_fields(&d, Role::Seller, other_seller),
            Disclosure::NONE
        );
    }
}
