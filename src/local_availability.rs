use crate::{
    backend::AvailabilityBackend,
    error::StoreError,
    types::{AvailabilitySlot, NewAvailability, Property, Seller},
};
use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug, Default)]
struct LocalState {
    sellers: HashMap<Uuid, Seller>,
    properties: HashMap<Uuid, Property>,
    slots: HashMap<Uuid, AvailabilitySlot>,
}

impl LocalState {
    fn sorted(&self, filter: impl Fn(&AvailabilitySlot) -> bool) -> Vec<AvailabilitySlot> {
        let mut slots: Vec<AvailabilitySlot> =
            self.slots.values().filter(|slot| filter(slot)).cloned().collect();
        slots.sort_unstable_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        slots
    }
}

/// Non-persistent store for running without a database.
#[derive(Debug, Clone, Default)]
pub struct LocalAvailability {
    state: Arc<Mutex<LocalState>>,
}

impl LocalAvailability {
    fn state(&self) -> Result<MutexGuard<'_, LocalState>, StoreError> {
        self.state.lock().map_err(|_| {
            let err = "Local availability store is poisoned";
            error!(err);
            StoreError::connection(err)
        })
    }
}

impl AvailabilityBackend for LocalAvailability {
    fn save_availability(&self, slot: NewAvailability) -> Result<AvailabilitySlot, StoreError> {
        let mut state = self.state()?;

        // Checked before provisioning so a rejected slot leaves no parents behind.
        if state.slots.values().any(|stored| slot.is_same_slot(stored)) {
            return Err(StoreError::DuplicateSlot);
        }

        if !state.sellers.contains_key(&slot.seller_id) {
            debug!(seller_id = %slot.seller_id, "Provisioning seller");
            state
                .sellers
                .insert(slot.seller_id, Seller::provisioned(slot.seller_id));
        }
        if !state.properties.contains_key(&slot.property_id) {
            debug!(property_id = %slot.property_id, "Provisioning property");
            state.properties.insert(
                slot.property_id,
                Property::provisioned(slot.property_id, slot.seller_id),
            );
        }

        let now = Utc::now();
        let stored = AvailabilitySlot {
            id: Uuid::new_v4(),
            property_id: slot.property_id,
            seller_id: slot.seller_id,
            start_time: slot.start_time,
            end_time: slot.end_time,
            created_at: now,
            updated_at: now,
        };
        state.slots.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn availability(
        &self,
        property_id: Uuid,
        seller_id: Option<Uuid>,
    ) -> Result<Vec<AvailabilitySlot>, StoreError> {
        let state = self.state()?;
        Ok(state.sorted(|slot| {
            slot.property_id == property_id && seller_id.map_or(true, |id| slot.seller_id == id)
        }))
    }

    fn delete_availability(
        &self,
        property_id: Uuid,
        seller_id: Option<Uuid>,
    ) -> Result<usize, StoreError> {
        let mut state = self.state()?;
        let before = state.slots.len();
        state.slots.retain(|_, slot| {
            !(slot.property_id == property_id
                && seller_id.map_or(true, |id| slot.seller_id == id))
        });
        Ok(before - state.slots.len())
    }

    fn availability_slot(&self, id: Uuid) -> Result<AvailabilitySlot, StoreError> {
        self.state()?
            .slots
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn remove_availability_slot(&self, id: Uuid) -> Result<Uuid, StoreError> {
        match self.state()?.slots.remove(&id) {
            Some(slot) => Ok(slot.id),
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn seller_availability(&self, seller_id: Uuid) -> Result<Vec<AvailabilitySlot>, StoreError> {
        let state = self.state()?;
        Ok(state.sorted(|slot| slot.seller_id == seller_id))
    }

    fn seller(&self, id: Uuid) -> Result<Option<Seller>, StoreError> {
        Ok(self.state()?.sellers.get(&id).cloned())
    }

    fn property(&self, id: Uuid) -> Result<Option<Property>, StoreError> {
        Ok(self.state()?.properties.get(&id).cloned())
    }

    fn health_check(&self) -> Result<DateTime<Utc>, StoreError> {
        drop(self.state()?);
        Ok(Utc::now())
    }
}
