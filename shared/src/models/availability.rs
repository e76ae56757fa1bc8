//! Warehouse availability calendar models
//!
//! Warehouses are open unless a record explicitly marks a date unavailable.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explicit availability override for one warehouse on one date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityRecord {
    pub warehouse_id: Uuid,
    pub date: NaiveDate,
    pub is_available: bool,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dates of a range split by availability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateAvailability {
    pub available: Vec<NaiveDate>,
    pub unavailable: Vec<NaiveDate>,
}

/// Resolve availability for a date, defaulting to open when no override exists
pub fn resolve_availability(explicit: Option<bool>) -> bool {
    explicit.unwrap_or(true)
}

/// Every calendar day from `start` to `end`, inclusive
pub fn dates_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|date| *date <= end).collect()
}

/// Classify each day of the range against the explicit overrides
pub fn classify_dates(
    start: NaiveDate,
    end: NaiveDate,
    overrides: &HashMap<NaiveDate, bool>,
) -> DateAvailability {
    let mut result = DateAvailability::default();
    for date in dates_in_range(start, end) {
        if resolve_availability(overrides.get(&date).copied()) {
            result.available.push(date);
        } else {
            result.unavailable.push(date);
        }
    }
    result
}
