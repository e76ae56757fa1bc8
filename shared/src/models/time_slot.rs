//! Warehouse time slot models

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// First hour of the default booking day
pub const DEFAULT_SLOT_START_HOUR: u32 = 9;
/// Hour at which the last default slot ends
pub const DEFAULT_SLOT_END_HOUR: u32 = 17;
/// Capacity of each auto-provisioned slot
pub const DEFAULT_SLOT_CAPACITY: i32 = 1;

/// A bookable interval on one warehouse and date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Administrative switch, independent of capacity
    pub is_available: bool,
    pub max_bookings: i32,
    pub current_bookings: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeSlot {
    pub fn has_capacity(&self) -> bool {
        self.current_bookings < self.max_bookings
    }

    /// Open for new bookings: switched on and not full
    pub fn is_bookable(&self) -> bool {
        self.is_available && self.has_capacity()
    }

    pub fn remaining_capacity(&self) -> i32 {
        (self.max_bookings - self.current_bookings).max(0)
    }
}

/// Start/end pair for one slot of the default plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotWindow {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// The eight one-hour windows provisioned for a warehouse day (09:00-17:00)
pub fn default_slot_plan() -> Vec<SlotWindow> {
    (DEFAULT_SLOT_START_HOUR..DEFAULT_SLOT_END_HOUR)
        .filter_map(|hour| {
            Some(SlotWindow {
                start_time: NaiveTime::from_hms_opt(hour, 0, 0)?,
                end_time: NaiveTime::from_hms_opt(hour + 1, 0, 0)?,
            })
        })
        .collect()
}

/// Aggregate slot figures for a date range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlotStatistics {
    pub total_slots: i64,
    /// Slots switched on with spare capacity
    pub available_slots: i64,
    pub total_bookings: i64,
    pub total_capacity: i64,
}

impl TimeSlotStatistics {
    /// Share of total capacity currently booked, 0-100
    pub fn utilization_percent(&self) -> f64 {
        if self.total_capacity <= 0 {
            return 0.0;
        }
        self.total_bookings as f64 / self.total_capacity as f64 * 100.0
    }
}
