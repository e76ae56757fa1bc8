//! Validation utilities for the warehouse booking platform

use chrono::{NaiveDate, NaiveTime};
use validator::ValidationError;

use crate::types::DateRange;

// ============================================================================
// Booking Validations
// ============================================================================

/// Validate a farmer mobile number.
/// Accepts 10-digit local numbers and international numbers with an optional
/// leading `+`, ignoring spaces and dashes.
pub fn validate_mobile_number(mobile: &str) -> Result<(), &'static str> {
    let trimmed = mobile.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);

    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
    {
        return Err("Mobile number may only contain digits, spaces and dashes");
    }

    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !(10..=15).contains(&digits) {
        return Err("Mobile number must have 10 to 15 digits");
    }
    Ok(())
}

/// `validator` adapter for [`validate_mobile_number`]
pub fn validate_mobile_field(mobile: &str) -> Result<(), ValidationError> {
    validate_mobile_number(mobile).map_err(|msg| {
        let mut err = ValidationError::new("mobile");
        err.message = Some(msg.into());
        err
    })
}

/// Validate that a slot ends after it starts
pub fn validate_slot_times(start: NaiveTime, end: NaiveTime) -> Result<(), &'static str> {
    if end <= start {
        return Err("Slot end time must be after start time");
    }
    Ok(())
}

/// Validate slot capacity
pub fn validate_max_bookings(max_bookings: i32) -> Result<(), &'static str> {
    if max_bookings < 1 {
        return Err("Slot capacity must be at least 1");
    }
    Ok(())
}

/// Validate a query date range and cap its length
pub fn validate_date_range(
    start: NaiveDate,
    end: NaiveDate,
    max_days: i64,
) -> Result<DateRange, &'static str> {
    if start > end {
        return Err("Start date must not be after end date");
    }
    let range = DateRange::new(start, end);
    if range.days() > max_days {
        return Err("Date range is too long");
    }
    Ok(range)
}

/// Validate a free-text reason (rejections, closures)
pub fn validate_reason(reason: &str) -> Result<(), &'static str> {
    if reason.trim().is_empty() {
        return Err("Reason must not be empty");
    }
    if reason.chars().count() > 500 {
        return Err("Reason must be at most 500 characters");
    }
    Ok(())
}
