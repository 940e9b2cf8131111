use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::store::MemoryStore;

// Guarded transitions past assignment. Each one is a compare-and-swap
// keyed on the expected current status, with the actor identity checked
// again inside the same critical section. A failed guard writes nothing
// and is never retried here; the caller re-reads and decides. Actor
// mismatch is reported as `Unauthorized`, a stale status as
// `StatusConflict` carrying the status observed after the failure.

/// `Assigned -> OnRoute`. The chosen driver self-reports pickup, or the
/// seller marks it on the driver's behalf. Sets `on_route_at` once.
pub fn mark_picked_up(
    store: &MemoryStore,
    delivery_id: Uuid,
    actor: Actor,
) -> Result<Delivery, AppError> {
    let current = fetch(store, delivery_id)?;

    let permitted = match actor.role {
        Role::Driver => current.chosen_driver_id == Some(actor.user_id),
        Role::Seller => current.seller_id == actor.user_id,
    };
    if !permitted {
        return Err(AppError::Unauthorized);
    }

    let updated = store
        .update_delivery_if(
            delivery_id,
            |d| {
                d.status == DeliveryStatus::Assigned
                    && match actor.role {
                        Role::Driver => d.chosen_driver_id == Some(actor.user_id),
                        Role::Seller => d.seller_id == actor.user_id,
                    }
            },
            |d| {
                d.status = DeliveryStatus::OnRoute;
                if d.on_route_at.is_none() {
                    d.on_route_at = Some(Utc::now());
                }
            },
        )
        .ok_or_else(|| status_conflict(store, delivery_id))?;

    info!(delivery_id = %delivery_id, actor_id = %actor.user_id, "delivery picked up");
    Ok(updated)
}

/// `OnRoute -> Delivered`, chosen driver only.
pub fn mark_delivered(
    store: &MemoryStore,
    delivery_id: Uuid,
    actor: Actor,
) -> Result<Delivery, AppError> {
    let current = fetch(store, delivery_id)?;

    if actor.role != Role::Driver || current.chosen_driver_id != Some(actor.user_id) {
        return Err(AppError::Unauthorized);
    }

    let updated = store
        .update_delivery_if(
            delivery_id,
            |d| {
                d.status == DeliveryStatus::OnRoute
                    && d.chosen_driver_id == Some(actor.user_id)
            },
            |d| d.status = DeliveryStatus::Delivered,
        )
        .ok_or_else(|| status_conflict(store, delivery_id))?;

    info!(delivery_id = %delivery_id, driver_id = %actor.user_id, "delivery confirmed");
    Ok(updated)
}

/// `Delivered -> Paid`, owning seller only.
pub fn mark_paid(
    store: &MemoryStore,
    delivery_id: Uuid,
    actor: Actor,
) -> Result<Delivery, AppError> {
    seller_transition(
        store,
        delivery_id,
        actor,
        &[DeliveryStatus::Delivered],
        DeliveryStatus::Paid,
        "settlement confirmed",
    )
}

/// `Delivered | Paid -> Closed`, owning seller only. Sets `closed_at`.
pub fn close_delivery(
    store: &MemoryStore,
    delivery_id: Uuid,
    actor: Actor,
) -> Result<Delivery, AppError> {
    seller_transition(
        store,
        delivery_id,
        actor,
        &[DeliveryStatus::Delivered, DeliveryStatus::Paid],
        DeliveryStatus::Closed,
        "delivery closed",
    )
}

/// `Open -> Cancelled`, owning seller only. A delivery that already has a
/// driver cannot be cancelled this way; it has to go through dispute, so
/// a seller can never unilaterally strand a driver mid-route. Sets
/// `closed_at`; `chosen_driver_id` stays `None`.
pub fn cancel_delivery(
    store: &MemoryStore,
    delivery_id: Uuid,
    actor: Actor,
) -> Result<Delivery, AppError> {
    seller_transition(
        store,
        delivery_id,
        actor,
        &[DeliveryStatus::Open],
        DeliveryStatus::Cancelled,
        "delivery cancelled",
    )
}

/// Exceptional exit into `Dispute`, available to either party once a
/// driver is assigned. Resolution is external to the engine.
pub fn open_dispute(
    store: &MemoryStore,
    delivery_id: Uuid,
    actor: Actor,
) -> Result<Delivery, AppError> {
    let current = fetch(store, delivery_id)?;

    let permitted = match actor.role {
        Role::Seller => current.seller_id == actor.user_id,
        Role::Driver => current.chosen_driver_id == Some(actor.user_id),
    };
    if !permitted {
        return Err(AppError::Unauthorized);
    }

    let updated = store
        .update_delivery_if(
            delivery_id,
            |d| {
                crate::engine::status::transition_allowed(d.status, DeliveryStatus::Dispute)
                    && match actor.role {
                        Role::Seller => d.seller_id == actor.user_id,
                        Role::Driver => d.chosen_driver_id == Some(actor.user_id),
                    }
            },
            |d| d.status = DeliveryStatus::Dispute,
        )
        .ok_or_else(|| status_conflict(store, delivery_id))?;

    info!(delivery_id = %delivery_id, actor_id = %actor.user_id, "dispute opened");
    Ok(updated)
}

fn seller_transition(
    store: &MemoryStore,
    delivery_id: Uuid,
    actor: Actor,
    expected: &[DeliveryStatus],
    target: DeliveryStatus,
    log_line: &'static str,
) -> Result<Delivery, AppError> {
    let current = fetch(store, delivery_id)?;

    if actor.role != Role::Seller || current.seller_id != actor.user_id {
        return Err(AppError::Unauthorized);
    }

    let updated = store
        .update_delivery_if(
            delivery_id,
            |d| expected.contains(&d.status) && d.seller_id == actor.user_id,
            |d| {
                d.status = target;
                if target.is_terminal() && d.closed_at.is_none() {
                    d.closed_at = Some(Utc::now());
                }
            },
        )
        .ok_or_else(|| status_conflict(store, delivery_id))?;

    info!(delivery_id = %delivery_id, seller_id = %actor.user_id, "{log_line}");
    Ok(updated)
}

fn fetch(store: &MemoryStore, delivery_id: Uuid) -> Result<Delivery, AppError> {
    store
        .delivery(delivery_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))
}

/// Re-reads after a failed compare-and-swap so the conflict carries the
/// status that actually blocked the transition, not the stale one.
fn status_conflict(store: &MemoryStore, delivery_id: Uuid) -> AppError {
    match store.delivery(delivery_id) {
        Some(current) => AppError::StatusConflict {
            current: current.status,
        },
        None => AppError::NotFound(format!("delivery {delivery_id} not found")),
    }
}
