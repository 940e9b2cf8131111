use std::sync::Arc;

use chrono::Utc;
use delivery_exchange::engine::{assignment, bids, deliveries, lifecycle};
use delivery_exchange::error::AppError;
use delivery_exchange::models::actor::{Actor, Role};
use delivery_exchange::models::delivery::{DeliveryStatus, GeoPoint, NewDelivery, Stop};
use delivery_exchange::models::driver::DriverProfile;
use delivery_exchange::store::MemoryStore;
use futures::future::join_all;
use uuid::Uuid;

fn stop(district: &str) -> Stop {
    Stop {
        district: district.to_string(),
        subdistrict: "center".to_string(),
        address: "12 Canal St".to_string(),
        location: GeoPoint {
            lat: 13.75,
            lng: 100.5,
        },
        contact_phone: "+66-81-000-0000".to_string(),
    }
}

fn new_delivery() -> NewDelivery {
    NewDelivery {
        pickup: stop("north"),
        dropoff: stop("south"),
        price: Some(150),
        note: "fragile".to_string(),
        category: "documents".to_string(),
    }
}

fn register_driver(store: &MemoryStore, seed: u128) -> Uuid {
    let driver = DriverProfile {
        id: Uuid::from_u128(seed),
        name: format!("driver-{seed}"),
        phone: format!("+66-90-000-{seed:04}"),
        avatar_url: None,
        created_at: Utc::now(),
    };
    store.insert_driver(driver.clone());
    driver.id
}

fn as_seller(id: Uuid) -> Actor {
    Actor {
        user_id: id,
        role: Role::Seller,
    }
}

fn as_driver(id: Uuid) -> Actor {
    Actor {
        user_id: id,
        role: Role::Driver,
    }
}

#[tokio::test]
async fn concurrent_assignment_has_exactly_one_winner() {
    let store = Arc::new(MemoryStore::new());
    let seller_id = Uuid::from_u128(1);
    let delivery = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();

    let driver_ids: Vec<Uuid> = (100..108).map(|seed| register_driver(&store, seed)).collect();

    let handles: Vec<_> = driver_ids
        .iter()
        .map(|&driver_id| {
            let store = store.clone();
            let delivery_id = delivery.id;
            tokio::spawn(async move {
                assignment::assign_driver(&store, delivery_id, driver_id, seller_id)
            })
        })
        .collect();

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for result in join_all(handles).await {
        match result.unwrap() {
            Ok(updated) => winners.push(updated),
            Err(AppError::AssignmentConflict) => conflicts += 1,
            Err(other) => panic!("unexpected outcome: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, driver_ids.len() - 1);

    let final_row = store.delivery(delivery.id).unwrap();
    assert_eq!(final_row.status, DeliveryStatus::Assigned);
    assert_eq!(final_row.chosen_driver_id, winners[0].chosen_driver_id);
    assert!(final_row.chosen_driver_id.is_some());
}

#[tokio::test]
async fn concurrent_duplicate_bids_store_one_row() {
    let store = Arc::new(MemoryStore::new());
    let seller_id = Uuid::from_u128(1);
    let delivery = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();
    let driver_id = register_driver(&store, 100);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let delivery_id = delivery.id;
            tokio::spawn(async move { bids::submit_bid(&store, delivery_id, driver_id) })
        })
        .collect();

    let mut accepted = 0;
    let mut duplicates = 0;
    for result in join_all(handles).await {
        match result.unwrap() {
            Ok(_) => accepted += 1,
            Err(AppError::DuplicateBid) => duplicates += 1,
            Err(other) => panic!("unexpected outcome: {other}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(store.bids_for(delivery.id).len(), 1);
}

#[test]
fn distinct_drivers_can_all_bid() {
    let store = MemoryStore::new();
    let seller_id = Uuid::from_u128(1);
    let delivery = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();

    for seed in 100..105 {
        let driver_id = register_driver(&store, seed);
        bids::submit_bid(&store, delivery.id, driver_id).unwrap();
    }

    let listed = bids::list_bids(&store, delivery.id).unwrap();
    assert_eq!(listed.len(), 5);

    // Most recent interest first.
    for pair in listed.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

#[test]
fn bid_requires_open_delivery_and_registered_driver() {
    let store = MemoryStore::new();
    let seller_id = Uuid::from_u128(1);
    let delivery = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();

    let unregistered = Uuid::from_u128(999);
    assert!(matches!(
        bids::submit_bid(&store, delivery.id, unregistered),
        Err(AppError::Validation(_))
    ));

    assert!(matches!(
        bids::submit_bid(&store, Uuid::from_u128(424242), unregistered),
        Err(AppError::NotFound(_))
    ));

    let driver_id = register_driver(&store, 100);
    assignment::assign_driver(&store, delivery.id, driver_id, seller_id).unwrap();

    // The ledger goes inert once the delivery leaves Open.
    let late_driver = register_driver(&store, 101);
    assert!(matches!(
        bids::submit_bid(&store, delivery.id, late_driver),
        Err(AppError::StatusConflict {
            current: DeliveryStatus::Assigned
        })
    ));
}

#[test]
fn mark_delivered_before_pickup_is_rejected() {
    let store = MemoryStore::new();
    let seller_id = Uuid::from_u128(1);
    let delivery = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();
    let driver_id = register_driver(&store, 100);
    assignment::assign_driver(&store, delivery.id, driver_id, seller_id).unwrap();

    let result = lifecycle::mark_delivered(&store, delivery.id, as_driver(driver_id));
    assert!(matches!(
        result,
        Err(AppError::StatusConflict {
            current: DeliveryStatus::Assigned
        })
    ));

    let row = store.delivery(delivery.id).unwrap();
    assert_eq!(row.status, DeliveryStatus::Assigned);
    assert!(row.on_route_at.is_none());
}

#[test]
fn cancellation_boundary() {
    let store = MemoryStore::new();
    let seller_id = Uuid::from_u128(1);

    let open = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();
    let cancelled = lifecycle::cancel_delivery(&store, open.id, as_seller(seller_id)).unwrap();
    assert_eq!(cancelled.status, DeliveryStatus::Cancelled);
    assert!(cancelled.chosen_driver_id.is_none());
    assert!(cancelled.closed_at.is_some());

    let assigned = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();
    let driver_id = register_driver(&store, 100);
    assignment::assign_driver(&store, assigned.id, driver_id, seller_id).unwrap();

    let result = lifecycle::cancel_delivery(&store, assigned.id, as_seller(seller_id));
    assert!(matches!(
        result,
        Err(AppError::StatusConflict {
            current: DeliveryStatus::Assigned
        })
    ));
    assert_eq!(
        store.delivery(assigned.id).unwrap().status,
        DeliveryStatus::Assigned
    );
}

#[test]
fn only_the_owning_seller_assigns() {
    let store = MemoryStore::new();
    let seller_id = Uuid::from_u128(1);
    let delivery = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();
    let driver_id = register_driver(&store, 100);

    let impostor = Uuid::from_u128(2);
    assert!(matches!(
        assignment::assign_driver(&store, delivery.id, driver_id, impostor),
        Err(AppError::AssignmentConflict)
    ));
    assert_eq!(store.delivery(delivery.id).unwrap().status, DeliveryStatus::Open);
}

#[test]
fn transition_authorization() {
    let store = MemoryStore::new();
    let seller_id = Uuid::from_u128(1);
    let delivery = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();
    let driver_id = register_driver(&store, 100);
    let stranger = register_driver(&store, 101);
    assignment::assign_driver(&store, delivery.id, driver_id, seller_id).unwrap();

    assert!(matches!(
        lifecycle::mark_picked_up(&store, delivery.id, as_driver(stranger)),
        Err(AppError::Unauthorized)
    ));

    lifecycle::mark_picked_up(&store, delivery.id, as_driver(driver_id)).unwrap();

    assert!(matches!(
        lifecycle::mark_delivered(&store, delivery.id, as_driver(stranger)),
        Err(AppError::Unauthorized)
    ));

    lifecycle::mark_delivered(&store, delivery.id, as_driver(driver_id)).unwrap();

    // Settlement belongs to the seller.
    assert!(matches!(
        lifecycle::mark_paid(&store, delivery.id, as_driver(driver_id)),
        Err(AppError::Unauthorized)
    ));
    assert!(matches!(
        lifecycle::mark_paid(&store, delivery.id, as_seller(Uuid::from_u128(2))),
        Err(AppError::Unauthorized)
    ));
}

#[test]
fn seller_may_mark_pickup_on_behalf_of_the_driver() {
    let store = MemoryStore::new();
    let seller_id = Uuid::from_u128(1);
    let delivery = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();
    let driver_id = register_driver(&store, 100);
    assignment::assign_driver(&store, delivery.id, driver_id, seller_id).unwrap();

    let updated = lifecycle::mark_picked_up(&store, delivery.id, as_seller(seller_id)).unwrap();
    assert_eq!(updated.status, DeliveryStatus::OnRoute);
    assert!(updated.on_route_at.is_some());
}

#[test]
fn dispute_requires_an_assigned_delivery() {
    let store = MemoryStore::new();
    let seller_id = Uuid::from_u128(1);
    let delivery = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();

    assert!(matches!(
        lifecycle::open_dispute(&store, delivery.id, as_seller(seller_id)),
        Err(AppError::StatusConflict {
            current: DeliveryStatus::Open
        })
    ));

    let driver_id = register_driver(&store, 100);
    assignment::assign_driver(&store, delivery.id, driver_id, seller_id).unwrap();
    lifecycle::mark_picked_up(&store, delivery.id, as_driver(driver_id)).unwrap();

    let disputed = lifecycle::open_dispute(&store, delivery.id, as_driver(driver_id)).unwrap();
    assert_eq!(disputed.status, DeliveryStatus::Dispute);

    // Terminal for the engine; nothing moves out of it.
    assert!(matches!(
        lifecycle::mark_delivered(&store, delivery.id, as_driver(driver_id)),
        Err(AppError::StatusConflict {
            current: DeliveryStatus::Dispute
        })
    ));
}

#[test]
fn soft_hide_is_per_role_and_never_deletes() {
    let store = MemoryStore::new();
    let seller_id = Uuid::from_u128(1);
    let delivery = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();
    let driver_id = register_driver(&store, 100);
    bids::submit_bid(&store, delivery.id, driver_id).unwrap();

    deliveries::hide_delivery(&store, delivery.id, as_seller(seller_id)).unwrap();

    assert!(deliveries::dashboard(&store, as_seller(seller_id)).is_empty());
    assert_eq!(deliveries::dashboard(&store, as_driver(driver_id)).len(), 1);

    // History survives the hide.
    assert!(store.delivery(delivery.id).is_some());
    assert_eq!(store.bids_for(delivery.id).len(), 1);

    let outsider = register_driver(&store, 101);
    assert!(matches!(
        deliveries::hide_delivery(&store, delivery.id, as_driver(outsider)),
        Err(AppError::Unauthorized)
    ));
}

#[test]
fn create_delivery_validation() {
    let store = MemoryStore::new();
    let seller_id = Uuid::from_u128(1);

    let mut missing_district = new_delivery();
    missing_district.pickup.district = "  ".to_string();
    assert!(matches!(
        deliveries::create_delivery(&store, seller_id, missing_district),
        Err(AppError::Validation(_))
    ));

    let mut zero_price = new_delivery();
    zero_price.price = Some(0);
    assert!(matches!(
        deliveries::create_delivery(&store, seller_id, zero_price),
        Err(AppError::Validation(_))
    ));

    let mut negotiable = new_delivery();
    negotiable.price = None;
    let created = deliveries::create_delivery(&store, seller_id, negotiable).unwrap();
    assert_eq!(created.price, None);
    assert_eq!(created.status, DeliveryStatus::Open);
}

#[test]
fn full_lifecycle_scenario() {
    let store = MemoryStore::new();
    let seller_id = Uuid::from_u128(1);
    let delivery = deliveries::create_delivery(&store, seller_id, new_delivery()).unwrap();

    let driver_a = register_driver(&store, 100);
    let driver_b = register_driver(&store, 101);
    bids::submit_bid(&store, delivery.id, driver_a).unwrap();
    bids::submit_bid(&store, delivery.id, driver_b).unwrap();

    let assigned = assignment::assign_driver(&store, delivery.id, driver_a, seller_id).unwrap();
    assert_eq!(assigned.status, DeliveryStatus::Assigned);
    assert_eq!(assigned.chosen_driver_id, Some(driver_a));

    assert!(matches!(
        assignment::assign_driver(&store, delivery.id, driver_b, seller_id),
        Err(AppError::AssignmentConflict)
    ));

    let on_route = lifecycle::mark_picked_up(&store, delivery.id, as_driver(driver_a)).unwrap();
    assert_eq!(on_route.status, DeliveryStatus::OnRoute);
    assert!(on_route.on_route_at.is_some());

    let delivered = lifecycle::mark_delivered(&store, delivery.id, as_driver(driver_a)).unwrap();
    assert_eq!(delivered.status, DeliveryStatus::Delivered);

    let paid = lifecycle::mark_paid(&store, delivery.id, as_seller(seller_id)).unwrap();
    assert_eq!(paid.status, DeliveryStatus::Paid);

    let closed = lifecycle::close_delivery(&store, delivery.id, as_seller(seller_id)).unwrap();
    assert_eq!(closed.status, DeliveryStatus::Closed);
    assert!(closed.closed_at.is_some());
    assert_eq!(closed.on_route_at, on_route.on_route_at);
    assert_eq!(closed.created_at, delivery.created_at);

    // The full bid history remains for the seller's reference.
    assert_eq!(bids::list_bids(&store, delivery.id).unwrap().len(), 2);
}
