use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::disclosure::{project, project_coarse, DeliveryView};
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::delivery::{Delivery, DeliveryStatus, NewDelivery, Stop};
use crate::store::MemoryStore;

/// Creates a delivery in `Open`, the sole initial state.
pub fn create_delivery(
    store: &MemoryStore,
    seller_id: Uuid,
    new: NewDelivery,
) -> Result<Delivery, AppError> {
    validate_stop(&new.pickup, "pickup")?;
    validate_stop(&new.dropoff, "dropoff")?;

    if new.category.trim().is_empty() {
        return Err(AppError::Validation("category cannot be empty".to_string()));
    }

    if new.price == Some(0) {
        return Err(AppError::Validation(
            "price must be positive, or omitted for negotiable".to_string(),
        ));
    }

    let delivery = Delivery {
        id: Uuid::new_v4(),
        seller_id,
        chosen_driver_id: None,
        status: DeliveryStatus::Open,
        pickup: new.pickup,
        dropoff: new.dropoff,
        price: new.price,
        note: new.note,
        category: new.category,
        created_at: Utc::now(),
        on_route_at: None,
        closed_at: None,
    };

    store.insert_delivery(delivery.clone());
    info!(delivery_id = %delivery.id, seller_id = %seller_id, "delivery created");

    Ok(delivery)
}

fn validate_stop(stop: &Stop, which: &str) -> Result<(), AppError> {
    if stop.district.trim().is_empty() || stop.subdistrict.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "{which} district and subdistrict are required"
        )));
    }

    if stop.address.trim().is_empty() {
        return Err(AppError::Validation(format!("{which} address is required")));
    }

    if stop.contact_phone.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "{which} contact phone is required"
        )));
    }

    Ok(())
}

/// The public board: every open delivery, coarse fields only.
pub fn open_board(store: &MemoryStore) -> Vec<DeliveryView> {
    store
        .deliveries_where(|d| d.status == DeliveryStatus::Open)
        .iter()
        .map(project_coarse)
        .collect()
}

/// One viewer's dashboard: a seller's own deliveries, or the deliveries a
/// driver is assigned to or has bid on. Soft-hidden rows are filtered
/// out; everything else is projected through the disclosure policy.
pub fn dashboard(store: &MemoryStore, actor: Actor) -> Vec<DeliveryView> {
    let mine = |d: &Delivery| match actor.role {
        Role::Seller => d.seller_id == actor.user_id,
        Role::Driver => {
            d.chosen_driver_id == Some(actor.user_id) || store.has_bid(d.id, actor.user_id)
        }
    };

    store
        .deliveries_where(|d| mine(d) && !store.is_hidden(d.id, actor.role))
        .iter()
        .map(|d| project(d, actor.role, actor.user_id))
        .collect()
}

/// Soft-hides a delivery from the actor's own dashboard. The row and its
/// history are untouched; active deliveries are never deleted.
pub fn hide_delivery(
    store: &MemoryStore,
    delivery_id: Uuid,
    actor: Actor,
) -> Result<(), AppError> {
    let delivery = store
        .delivery(delivery_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

    let permitted = match actor.role {
        Role::Seller => delivery.seller_id == actor.user_id,
        Role::Driver => {
            delivery.chosen_driver_id == Some(actor.user_id)
                || store.has_bid(delivery_id, actor.user_id)
        }
    };
    if !permitted {
        return Err(AppError::Unauthorized);
    }

    store.hide(delivery_id, actor.role);
    Ok(())
}

/// A single delivery as a given viewer sees it; an absent viewer gets the
/// coarse projection.
pub fn view_delivery(
    store: &MemoryStore,
    delivery_id: Uuid,
    viewer: Option<Actor>,
) -> Result<DeliveryView, AppError> {
    let delivery = store
        .delivery(delivery_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

    Ok(match viewer {
        Some(actor) => project(&delivery, actor.role, actor.user_id),
        None => project_coarse(&delivery),
    })
}
