use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    backend::AvailabilityBackend,
    configuration::{Configuration, DatabaseConfig, StorageKind},
    error::StoreError,
    types::{AvailabilitySlot, NewAvailability, Property, Seller},
};

#[derive(Clone, Default)]
pub struct TestConfiguration {
    pub allowed_origins: Vec<String>,
}

impl Configuration for TestConfiguration {
    fn port(&self) -> u16 {
        0
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Memory
    }

    fn database(&self) -> DatabaseConfig {
        DatabaseConfig::default()
    }

    fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins.clone()
    }

    fn run_migrations(&self) -> bool {
        false
    }

    fn connect_attempts(&self) -> u32 {
        1
    }
}

pub struct MockAvailabilityBackendInner {
    pub failure: Mutex<Option<StoreError>>,
    pub calls_to_save_availability: AtomicU64,
    pub calls_to_availability: AtomicU64,
    pub calls_to_delete_availability: AtomicU64,
    pub calls_to_availability_slot: AtomicU64,
    pub calls_to_remove_availability_slot: AtomicU64,
    pub calls_to_seller_availability: AtomicU64,
    pub calls_to_seller: AtomicU64,
    pub calls_to_property: AtomicU64,
    pub calls_to_health_check: AtomicU64,
    pub slots: Mutex<Vec<AvailabilitySlot>>,
    pub last_filter: Mutex<Option<(Uuid, Option<Uuid>)>>,
}

#[derive(Clone)]
pub struct MockAvailabilityBackend(pub Arc<MockAvailabilityBackendInner>);

impl MockAvailabilityBackendInner {
    fn new() -> Self {
        Self {
            failure: Mutex::default(),
            calls_to_save_availability: AtomicU64::default(),
            calls_to_availability: AtomicU64::default(),
            calls_to_delete_availability: AtomicU64::default(),
            calls_to_availability_slot: AtomicU64::default(),
            calls_to_remove_availability_slot: AtomicU64::default(),
            calls_to_seller_availability: AtomicU64::default(),
            calls_to_seller: AtomicU64::default(),
            calls_to_property: AtomicU64::default(),
            calls_to_health_check: AtomicU64::default(),
            slots: Mutex::default(),
            last_filter: Mutex::default(),
        }
    }
}

impl MockAvailabilityBackend {
    pub fn new() -> Self {
        Self(Arc::new(MockAvailabilityBackendInner::new()))
    }

    pub fn fail_with(&self, err: StoreError) {
        *self.0.failure.lock().unwrap() = Some(err);
    }

    pub fn calls(&self, counter: fn(&MockAvailabilityBackendInner) -> &AtomicU64) -> u64 {
        counter(&self.0).load(Ordering::SeqCst)
    }

    fn result(&self) -> Result<(), StoreError> {
        match self.0.failure.lock().unwrap().clone() {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    fn slot(id: Uuid) -> AvailabilitySlot {
        let now = Utc::now();
        AvailabilitySlot {
            id,
            property_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            start_time: now,
            end_time: now + chrono::Duration::hours(1),
            created_at: now,
            updated_at: now,
        }
    }
}

impl AvailabilityBackend for MockAvailabilityBackend {
    fn save_availability(&self, slot: NewAvailability) -> Result<AvailabilitySlot, StoreError> {
        self.0
            .calls_to_save_availability
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        let now = Utc::now();
        Ok(AvailabilitySlot {
            id: Uuid::new_v4(),
            property_id: slot.property_id,
            seller_id: slot.seller_id,
            start_time: slot.start_time,
            end_time: slot.end_time,
            created_at: now,
            updated_at: now,
        })
    }

    fn availability(
        &self,
        property_id: Uuid,
        seller_id: Option<Uuid>,
    ) -> Result<Vec<AvailabilitySlot>, StoreError> {
        self.0.calls_to_availability.fetch_add(1, Ordering::SeqCst);
        *self.0.last_filter.lock().unwrap() = Some((property_id, seller_id));
        self.result()?;
        Ok(self.0.slots.lock().unwrap().clone())
    }

    fn delete_availability(
        &self,
        property_id: Uuid,
        seller_id: Option<Uuid>,
    ) -> Result<usize, StoreError> {
        self.0
            .calls_to_delete_availability
            .fetch_add(1, Ordering::SeqCst);
        *self.0.last_filter.lock().unwrap() = Some((property_id, seller_id));
        self.result()?;
        Ok(self.0.slots.lock().unwrap().len())
    }

    fn availability_slot(&self, id: Uuid) -> Result<AvailabilitySlot, StoreError> {
        self.0
            .calls_to_availability_slot
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(Self::slot(id))
    }

    fn remove_availability_slot(&self, id: Uuid) -> Result<Uuid, StoreError> {
        self.0
            .calls_to_remove_availability_slot
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(id)
    }

    fn seller_availability(&self, _seller_id: Uuid) -> Result<Vec<AvailabilitySlot>, StoreError> {
        self.0
            .calls_to_seller_availability
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(self.0.slots.lock().unwrap().clone())
    }

    fn seller(&self, id: Uuid) -> Result<Option<Seller>, StoreError> {
        self.0.calls_to_seller.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(Some(Seller::provisioned(id)))
    }

    fn property(&self, _id: Uuid) -> Result<Option<Property>, StoreError> {
        self.0.calls_to_property.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(None)
    }

    fn health_check(&self) -> Result<DateTime<Utc>, StoreError> {
        self.0.calls_to_health_check.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        Ok(Utc::now())
    }
}
