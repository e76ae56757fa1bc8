//! QR handshake tokens for warehouse pickup and return
//!
//! A token is an opaque string of the form
//! `WAREHOUSE_{PICKUP|RETURN}_{booking_id}_{unix_millis}`. The booking keeps
//! only the most recent token; scanning an older one is treated as stale.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const TOKEN_PREFIX: &str = "WAREHOUSE_";

/// Which leg of the handshake a QR artifact authorises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrPurpose {
    Pickup,
    Return,
}

impl QrPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrPurpose::Pickup => "PICKUP",
            QrPurpose::Return => "RETURN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PICKUP" => Some(QrPurpose::Pickup),
            "RETURN" => Some(QrPurpose::Return),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QrTokenError {
    #[error("QR token must start with WAREHOUSE_")]
    MissingPrefix,
    #[error("Unknown QR token purpose: {0}")]
    UnknownPurpose(String),
    #[error("QR token is malformed")]
    Malformed,
    #[error("QR token has an invalid booking id")]
    InvalidBookingId,
    #[error("QR token has an invalid timestamp")]
    InvalidTimestamp,
}

/// Parsed QR handshake token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrToken {
    pub purpose: QrPurpose,
    pub booking_id: Uuid,
    pub issued_at_millis: i64,
}

impl QrToken {
    pub fn new(purpose: QrPurpose, booking_id: Uuid, issued_at: DateTime<Utc>) -> Self {
        Self {
            purpose,
            booking_id,
            issued_at_millis: issued_at.timestamp_millis(),
        }
    }

    pub fn pickup(booking_id: Uuid, issued_at: DateTime<Utc>) -> Self {
        Self::new(QrPurpose::Pickup, booking_id, issued_at)
    }

    pub fn return_of(booking_id: Uuid, issued_at: DateTime<Utc>) -> Self {
        Self::new(QrPurpose::Return, booking_id, issued_at)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.issued_at_millis).single()
    }

    /// Parse a scanned token
    pub fn parse(raw: &str) -> Result<Self, QrTokenError> {
        let rest = raw
            .trim()
            .strip_prefix(TOKEN_PREFIX)
            .ok_or(QrTokenError::MissingPrefix)?;

        let (purpose, rest) = rest.split_once('_').ok_or(QrTokenError::Malformed)?;
        let purpose = QrPurpose::from_str(purpose)
            .ok_or_else(|| QrTokenError::UnknownPurpose(purpose.to_string()))?;

        // UUIDs contain hyphens but never underscores
        let (booking_id, millis) = rest.rsplit_once('_').ok_or(QrTokenError::Malformed)?;
        let booking_id = Uuid::parse_str(booking_id).map_err(|_| QrTokenError::InvalidBookingId)?;
        let issued_at_millis = millis
            .parse::<i64>()
            .map_err(|_| QrTokenError::InvalidTimestamp)?;

        Ok(Self {
            purpose,
            booking_id,
            issued_at_millis,
        })
    }
}

impl std::fmt::Display for QrToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}_{}_{}",
            TOKEN_PREFIX,
            self.purpose.as_str(),
            self.booking_id,
            self.issued_at_millis
        )
    }
}
