use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::bid::{Bid, BidView};
use crate::models::delivery::DeliveryStatus;
use crate::store::MemoryStore;

/// Records a driver's interest in an open delivery. The delivery row is
/// not touched; the bid ledger is informative only and never decides who
/// is assigned.
///
/// A duplicate submission, concurrent or not, loses against the store's
/// (delivery, driver) uniqueness constraint and surfaces as
/// `DuplicateBid`, which the caller may treat as "already submitted".
pub fn submit_bid(
    store: &MemoryStore,
    delivery_id: Uuid,
    driver_id: Uuid,
) -> Result<Bid, AppError> {
    let delivery = store
        .delivery(delivery_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

    if store.driver(driver_id).is_none() {
        return Err(AppError::Validation(format!(
            "driver {driver_id} is not registered"
        )));
    }

    if delivery.status != DeliveryStatus::Open {
        return Err(AppError::StatusConflict {
            current: delivery.status,
        });
    }

    let bid = Bid {
        id: Uuid::new_v4(),
        delivery_id,
        driver_id,
        created_at: Utc::now(),
    };

    if !store.insert_bid(bid.clone()) {
        return Err(AppError::DuplicateBid);
    }

    info!(delivery_id = %delivery_id, driver_id = %driver_id, "bid submitted");
    Ok(bid)
}

/// All bids on a delivery, most recent first, each joined with the
/// driver's public profile. Read-only projection.
pub fn list_bids(store: &MemoryStore, delivery_id: Uuid) -> Result<Vec<BidView>, AppError> {
    if store.delivery(delivery_id).is_none() {
        return Err(AppError::NotFound(format!(
            "delivery {delivery_id} not found"
        )));
    }

    let views = store
        .bids_for(delivery_id)
        .into_iter()
        .filter_map(|bid| {
            let driver = store.driver(bid.driver_id)?;
            Some(BidView {
                id: bid.id,
                delivery_id: bid.delivery_id,
                driver,
                created_at: bid.created_at,
            })
        })
        .collect();

    Ok(views)
}
