use crate::error::StoreError;
use crate::types::{AvailabilitySlot, BatchOutcome, NewAvailability, Property, Seller, SlotRange};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

pub trait AvailabilityBackend: Clone + Send + Sync + 'static {
    /// Stores one slot, creating the seller and property rows it references
    /// when they don't exist yet. Nothing is kept if the slot can't be stored.
    fn save_availability(&self, slot: NewAvailability) -> Result<AvailabilitySlot, StoreError>;

    /// Slots of a property ordered by `start_time`, optionally only those of one seller.
    fn availability(
        &self,
        property_id: Uuid,
        seller_id: Option<Uuid>,
    ) -> Result<Vec<AvailabilitySlot>, StoreError>;

    /// Returns how many slots were removed. Zero matches is not an error.
    fn delete_availability(
        &self,
        property_id: Uuid,
        seller_id: Option<Uuid>,
    ) -> Result<usize, StoreError>;

    fn availability_slot(&self, id: Uuid) -> Result<AvailabilitySlot, StoreError>;

    fn remove_availability_slot(&self, id: Uuid) -> Result<Uuid, StoreError>;

    fn seller_availability(&self, seller_id: Uuid) -> Result<Vec<AvailabilitySlot>, StoreError>;

    fn seller(&self, id: Uuid) -> Result<Option<Seller>, StoreError>;

    fn property(&self, id: Uuid) -> Result<Option<Property>, StoreError>;

    fn health_check(&self) -> Result<DateTime<Utc>, StoreError>;

    /// Saves every range as its own slot. Duplicates are counted and skipped,
    /// any other failure stops the batch and is returned.
    fn save_availability_batch(
        &self,
        property_id: Uuid,
        seller_id: Uuid,
        ranges: &[SlotRange],
    ) -> Result<BatchOutcome, StoreError> {
        let mut slots = Vec::with_capacity(ranges.len());
        let mut duplicate_slots = 0;

        for range in ranges {
            match self.save_availability(NewAvailability::new(property_id, seller_id, *range)) {
                Ok(slot) => slots.push(slot),
                Err(StoreError::DuplicateSlot) => {
                    debug!(%property_id, %seller_id, ?range, "Skipping duplicate slot");
                    duplicate_slots += 1;
                }
                Err(err) => {
                    warn!(?err, %property_id, %seller_id, "Saving availability batch aborted");
                    return Err(err);
                }
            }
        }

        Ok(BatchOutcome {
            message: format!(
                "Created {} out of {} availability slots",
                slots.len(),
                ranges.len()
            ),
            total_slots: ranges.len(),
            successful_slots: slots.len(),
            duplicate_slots,
            slots,
        })
    }
}
