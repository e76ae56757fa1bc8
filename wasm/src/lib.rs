//! WebAssembly module for the warehouse booking portals
//!
//! Provides client-side checks for:
//! - Booking lifecycle transitions
//! - Default slot plan
//! - Farmer contact validation
//! - QR token inspection before submitting a scan

use chrono::NaiveDate;
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

fn parse_status(status: &str) -> Result<BookingStatus, JsValue> {
    BookingStatus::from_str(status)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown booking status: {}", status)))
}

fn parse_action(action: &str) -> Result<BookingAction, JsValue> {
    BookingAction::ALL
        .into_iter()
        .find(|a| a.as_str() == action)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown booking action: {}", action)))
}

fn parse_date(date: &str) -> Result<NaiveDate, JsValue> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| JsValue::from_str(&format!("Invalid date {}: {}", date, e)))
}

/// Status a booking moves to after `action`, or an error if the action is not
/// allowed from `status`
#[wasm_bindgen]
pub fn next_booking_status(status: &str, action: &str) -> Result<String, JsValue> {
    let status = parse_status(status)?;
    let action = parse_action(action)?;

    check_transition(status, action)
        .map(|next| next.as_str().to_string())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Actions the portal should offer for a booking in `status`
#[wasm_bindgen]
pub fn allowed_booking_actions(status: &str) -> Result<String, JsValue> {
    let status = parse_status(status)?;
    let actions: Vec<&str> = BookingAction::ALL
        .into_iter()
        .filter(|a| check_transition(status, *a).is_ok())
        .map(|a| a.as_str())
        .collect();

    serde_json::to_string(&actions).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Default daily slot windows as JSON
#[wasm_bindgen]
pub fn default_slot_plan_json() -> Result<String, JsValue> {
    serde_json::to_string(&default_slot_plan()).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Check a farmer mobile number before submitting a booking
#[wasm_bindgen]
pub fn is_valid_mobile(mobile: &str) -> bool {
    validate_mobile_number(mobile).is_ok()
}

/// Check a slot's time window, both given as `HH:MM`
#[wasm_bindgen]
pub fn is_valid_slot_window(start: &str, end: &str) -> bool {
    let parse = |t: &str| chrono::NaiveTime::parse_from_str(t, "%H:%M").ok();
    match (parse(start), parse(end)) {
        (Some(start), Some(end)) => validate_slot_times(start, end).is_ok(),
        _ => false,
    }
}

/// Whether an approved booking has missed its slot date
#[wasm_bindgen]
pub fn is_booking_overdue(status: &str, slot_date: &str, today: &str) -> Result<bool, JsValue> {
    Ok(is_overdue(
        parse_status(status)?,
        parse_date(slot_date)?,
        parse_date(today)?,
    ))
}

#[derive(Serialize)]
struct QrTokenSummary {
    purpose: QrPurpose,
    booking_id: String,
    issued_at: Option<String>,
}

/// Decode a scanned QR payload so the scanner can show which booking it is for
#[wasm_bindgen]
pub fn inspect_qr_token(raw: &str) -> Result<String, JsValue> {
    let token = QrToken::parse(raw).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let summary = QrTokenSummary {
        purpose: token.purpose,
        booking_id: token.booking_id.to_string(),
        issued_at: token.issued_at().map(|at| at.to_rfc3339()),
    };

    serde_json::to_string(&summary).map_err(|e| JsValue::from_str(&e.to_string()))
}
