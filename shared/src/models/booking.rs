//! Warehouse booking models and lifecycle rules

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A farmer's reservation of one warehouse time slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub warehouse_id: Uuid,
    pub time_slot_id: Uuid,
    pub farmer_name: String,
    pub farmer_mobile: String,
    pub farmer_email: Option<String>,
    pub farmer_address: Option<String>,
    pub storage_requirements: Option<String>,
    pub status: BookingStatus,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    /// Scannable URL for the current QR artifact (pickup, then return)
    pub qr_code_url: Option<String>,
    /// Opaque token encoded in the current QR artifact
    pub qr_code_data: Option<String>,
    /// Admin who approved or rejected the booking
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Approved,
        BookingStatus::Rejected,
        BookingStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "approved" => Some(BookingStatus::Approved),
            "rejected" => Some(BookingStatus::Rejected),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    /// Completed and rejected bookings accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Rejected | BookingStatus::Completed)
    }

    /// Whether a booking in this status occupies one unit of slot capacity
    pub fn holds_capacity(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operations that move a booking through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    Approve,
    Reject,
    ConfirmPickup,
    ConfirmReturn,
}

impl BookingAction {
    pub const ALL: [BookingAction; 4] = [
        BookingAction::Approve,
        BookingAction::Reject,
        BookingAction::ConfirmPickup,
        BookingAction::ConfirmReturn,
    ];

    /// The only status from which this action is legal
    pub fn required_status(&self) -> BookingStatus {
        match self {
            BookingAction::Approve | BookingAction::Reject => BookingStatus::Pending,
            BookingAction::ConfirmPickup | BookingAction::ConfirmReturn => BookingStatus::Approved,
        }
    }

    /// Status after the action succeeds. Pickup stays inside `approved`.
    pub fn resulting_status(&self) -> BookingStatus {
        match self {
            BookingAction::Approve | BookingAction::ConfirmPickup => BookingStatus::Approved,
            BookingAction::Reject => BookingStatus::Rejected,
            BookingAction::ConfirmReturn => BookingStatus::Completed,
        }
    }

    /// Whether the action hands the reserved slot capacity back to the pool
    pub fn releases_capacity(&self) -> bool {
        matches!(self, BookingAction::Reject | BookingAction::ConfirmReturn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Approve => "approve",
            BookingAction::Reject => "reject",
            BookingAction::ConfirmPickup => "confirm_pickup",
            BookingAction::ConfirmReturn => "confirm_return",
        }
    }
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Booking is not in {required} status")]
    NotInRequiredStatus {
        required: BookingStatus,
        actual: BookingStatus,
    },
}

/// Check that `action` is legal from `current` and return the next status
pub fn check_transition(
    current: BookingStatus,
    action: BookingAction,
) -> Result<BookingStatus, TransitionError> {
    let required = action.required_status();
    if current != required {
        return Err(TransitionError::NotInRequiredStatus {
            required,
            actual: current,
        });
    }
    Ok(action.resulting_status())
}

/// An approved booking whose slot date has already passed
pub fn is_overdue(status: BookingStatus, slot_date: NaiveDate, today: NaiveDate) -> bool {
    status == BookingStatus::Approved && slot_date < today
}

/// Booking counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingStatistics {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub completed: i64,
}

impl BookingStatistics {
    /// Bookings currently holding slot capacity
    pub fn active(&self) -> i64 {
        self.pending + self.approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_strings() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::from_str("cancelled"), None);
    }

    #[test]
    fn test_pending_transitions() {
        assert_eq!(
            check_transition(BookingStatus::Pending, BookingAction::Approve),
            Ok(BookingStatus::Approved)
        );
        assert_eq!(
            check_transition(BookingStatus::Pending, BookingAction::Reject),
            Ok(BookingStatus::Rejected)
        );
        assert!(check_transition(BookingStatus::Pending, BookingAction::ConfirmPickup).is_err());
        assert!(check_transition(BookingStatus::Pending, BookingAction::ConfirmReturn).is_err());
    }

    #[test]
    fn test_pickup_keeps_approved() {
        assert_eq!(
            check_transition(BookingStatus::Approved, BookingAction::ConfirmPickup),
            Ok(BookingStatus::Approved)
        );
        assert_eq!(
            check_transition(BookingStatus::Approved, BookingAction::ConfirmReturn),
            Ok(BookingStatus::Completed)
        );
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for status in [BookingStatus::Rejected, BookingStatus::Completed] {
            assert!(status.is_terminal());
            for action in BookingAction::ALL {
                assert!(check_transition(status, action).is_err());
            }
        }
    }

    #[test]
    fn test_transition_error_message() {
        let err = check_transition(BookingStatus::Approved, BookingAction::Approve).unwrap_err();
        assert_eq!(err.to_string(), "Booking is not in pending status");

        let err = check_transition(BookingStatus::Pending, BookingAction::ConfirmReturn).unwrap_err();
        assert_eq!(err.to_string(), "Booking is not in approved status");
    }

    #[test]
    fn test_overdue_rule() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();

        assert!(is_overdue(BookingStatus::Approved, yesterday, today));
        assert!(!is_overdue(BookingStatus::Approved, today, today));
        assert!(!is_overdue(BookingStatus::Approved, tomorrow, today));
        assert!(!is_overdue(BookingStatus::Completed, yesterday, today));
        assert!(!is_overdue(BookingStatus::Pending, yesterday, today));
    }
}
