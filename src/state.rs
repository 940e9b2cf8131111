use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::observability::metrics::Metrics;
use crate::store::MemoryStore;

/// Broadcast to websocket clients whenever a delivery changes state.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    pub delivery_id: Uuid,
    pub status: DeliveryStatus,
    pub chosen_driver_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}

pub struct AppState {
    pub store: MemoryStore,
    pub lifecycle_events_tx: broadcast::Sender<LifecycleEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (lifecycle_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            store: MemoryStore::new(),
            lifecycle_events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn publish_lifecycle(&self, delivery: &Delivery) {
        let _ = self.lifecycle_events_tx.send(LifecycleEvent {
            delivery_id: delivery.id,
            status: delivery.status,
            chosen_driver_id: delivery.chosen_driver_id,
            at: Utc::now(),
        });
    }
}
