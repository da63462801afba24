use crate::schema::{availability, properties, sellers};
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = sellers)]
pub struct Seller {
    pub id: Uuid,
    pub name: String,
}

impl Seller {
    /// Placeholder row for a seller first seen through one of its slots.
    pub fn provisioned(id: Uuid) -> Self {
        Self {
            id,
            name: format!("Seller {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = properties)]
pub struct Property {
    pub id: Uuid,
    pub name: String,
    pub seller_id: Uuid,
}

impl Property {
    /// Placeholder row for a property first seen through one of its slots,
    /// owned by the seller of that slot.
    pub fn provisioned(id: Uuid, seller_id: Uuid) -> Self {
        Self {
            id,
            name: format!("Property {id}"),
            seller_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = availability)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub property_id: Uuid,
    pub seller_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A slot as handed to the store. Ordering of `start_time` and `end_time` is
/// the caller's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Insertable)]
#[diesel(table_name = availability)]
pub struct NewAvailability {
    pub property_id: Uuid,
    pub seller_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl NewAvailability {
    pub fn new(property_id: Uuid, seller_id: Uuid, range: SlotRange) -> Self {
        Self {
            property_id,
            seller_id,
            start_time: range.start_time,
            end_time: range.end_time,
        }
    }

    pub fn is_same_slot(&self, slot: &AvailabilitySlot) -> bool {
        self.property_id == slot.property_id
            && self.seller_id == slot.seller_id
            && self.start_time == slot.start_time
            && self.end_time == slot.end_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_slot_range"))]
pub struct SlotRange {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

fn validate_slot_range(range: &SlotRange) -> Result<(), ValidationError> {
    if range.end_time <= range.start_time {
        let mut err = ValidationError::new("slot_range");
        err.message = Some("end_time must be after start_time".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub message: String,
    pub total_slots: usize,
    pub successful_slots: usize,
    pub duplicate_slots: usize,
    pub slots: Vec<AvailabilitySlot>,
}
