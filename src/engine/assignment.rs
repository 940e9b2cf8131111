use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::store::MemoryStore;

/// Binds exactly one driver to a delivery.
///
/// The whole operation is a single compare-and-swap on the delivery row:
/// the row is updated only if, at the moment of the write, it is still
/// `Open`, unassigned, and owned by the acting seller. Sellers
/// double-tapping, racing browser tabs, and stale reads all collapse into
/// one winner; every losing attempt observes `AssignmentConflict` and is
/// expected to re-read current state rather than retry.
///
/// Authority over who is assigned lives solely in the delivery row's own
/// fields. The bid ledger is never consulted here, so no cross-row
/// transaction is needed.
pub fn assign_driver(
    store: &MemoryStore,
    delivery_id: Uuid,
    driver_id: Uuid,
    acting_seller_id: Uuid,
) -> Result<Delivery, AppError> {
    if store.delivery(delivery_id).is_none() {
        return Err(AppError::NotFound(format!(
            "delivery {delivery_id} not found"
        )));
    }

    if store.driver(driver_id).is_none() {
        return Err(AppError::Validation(format!(
            "driver {driver_id} is not registered"
        )));
    }

    let updated = store
        .update_delivery_if(
            delivery_id,
            |d| {
                d.status == DeliveryStatus::Open
                    && d.chosen_driver_id.is_none()
                    && d.seller_id == acting_seller_id
            },
            |d| {
                d.status = DeliveryStatus::Assigned;
                d.chosen_driver_id = Some(driver_id);
            },
        )
        .ok_or(AppError::AssignmentConflict)?;

    info!(delivery_id = %delivery_id, driver_id = %driver_id, "driver assigned");
    Ok(updated)
}
