use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::actor::Role;
use crate::models::bid::Bid;
use crate::models::delivery::Delivery;
use crate::models::driver::DriverProfile;

/// Row store backing the engine. It provides the three capabilities the
/// correctness argument depends on: filtered reads, an insert with a
/// uniqueness constraint on (delivery_id, driver_id) for bids, and a
/// conditional update that checks and mutates a delivery row under a
/// single lock.
#[derive(Default)]
pub struct MemoryStore {
    deliveries: DashMap<Uuid, Delivery>,
    bids: DashMap<(Uuid, Uuid), Bid>,
    drivers: DashMap<Uuid, DriverProfile>,
    hidden: DashMap<(Uuid, Role), ()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_delivery(&self, delivery: Delivery) {
        self.deliveries.insert(delivery.id, delivery);
    }

    pub fn delivery(&self, id: Uuid) -> Option<Delivery> {
        self.deliveries.get(&id).map(|entry| entry.value().clone())
    }

    /// Snapshot of all deliveries matching `filter`, most recent first.
    pub fn deliveries_where<F>(&self, filter: F) -> Vec<Delivery>
    where
        F: Fn(&Delivery) -> bool,
    {
        let mut rows: Vec<Delivery> = self
            .deliveries
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    /// Compare-and-swap on a single delivery row. The row's shard write
    /// lock is held across `check` and `apply`, so the check can never go
    /// stale before the mutation lands. Returns the updated snapshot, or
    /// `None` (row missing or check failed) with the row untouched.
    ///
    /// This is the sole serialization point for status transitions; a
    /// separate read followed by a write is never race-free and must not
    /// be used instead.
    pub fn update_delivery_if<C, A>(&self, id: Uuid, check: C, apply: A) -> Option<Delivery>
    where
        C: FnOnce(&Delivery) -> bool,
        A: FnOnce(&mut Delivery),
    {
        let mut entry = self.deliveries.get_mut(&id)?;

        if !check(entry.value()) {
            return None;
        }

        apply(entry.value_mut());
        Some(entry.value().clone())
    }

    /// Inserts a bid unless one already exists for the same
    /// (delivery_id, driver_id) pair. The entry API makes the
    /// check-and-insert atomic, so a racing duplicate loses cleanly.
    pub fn insert_bid(&self, bid: Bid) -> bool {
        match self.bids.entry((bid.delivery_id, bid.driver_id)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(bid);
                true
            }
        }
    }

    /// All bids for a delivery, most recent first.
    pub fn bids_for(&self, delivery_id: Uuid) -> Vec<Bid> {
        let mut rows: Vec<Bid> = self
            .bids
            .iter()
            .filter(|entry| entry.value().delivery_id == delivery_id)
            .map(|entry| entry.value().clone())
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    pub fn has_bid(&self, delivery_id: Uuid, driver_id: Uuid) -> bool {
        self.bids.contains_key(&(delivery_id, driver_id))
    }

    pub fn insert_driver(&self, driver: DriverProfile) {
        self.drivers.insert(driver.id, driver);
    }

    pub fn driver(&self, id: Uuid) -> Option<DriverProfile> {
        self.drivers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn drivers(&self) -> Vec<DriverProfile> {
        self.drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Soft-hide: removes the delivery from one role's dashboard without
    /// touching the row or its history. Kept apart from the row so a
    /// dashboard preference can never masquerade as a lifecycle state.
    pub fn hide(&self, delivery_id: Uuid, role: Role) {
        self.hidden.insert((delivery_id, role), ());
    }

    pub fn is_hidden(&self, delivery_id: Uuid, role: Role) -> bool {
        self.hidden.contains_key(&(delivery_id, role))
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.len()
    }

    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }
}
