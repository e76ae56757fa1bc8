//! Farmer notifications for booking decisions
//!
//! Delivery is best-effort: a missing gateway or a failed send is logged and
//! never fails the booking operation that triggered it.

use chrono::NaiveDate;
use shared::Booking;

use crate::external::{SmsGatewayClient, SmsMessage};

/// Notification service for booking outcomes
#[derive(Clone, Default)]
pub struct NotificationService {
    sms: Option<SmsGatewayClient>,
}

impl NotificationService {
    pub fn new(sms: Option<SmsGatewayClient>) -> Self {
        Self { sms }
    }

    /// Service with no gateway; every send is skipped
    pub fn disabled() -> Self {
        Self { sms: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sms.is_some()
    }

    /// Send one SMS. Returns whether the gateway accepted it.
    pub async fn send_sms(&self, sms: SmsMessage) -> bool {
        let Some(client) = &self.sms else {
            tracing::debug!("SMS gateway not configured, skipping message to {}", sms.recipient);
            return false;
        };

        match client.send_sms(&sms).await {
            Ok(()) => {
                tracing::info!("SMS sent to {}", sms.recipient);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to send SMS to {}: {}", sms.recipient, e);
                false
            }
        }
    }

    /// Tell the farmer the booking was approved, with the pickup QR link
    pub async fn notify_approved(&self, booking: &Booking, slot_date: Option<NaiveDate>) -> bool {
        self.send_sms(approval_message(booking, slot_date)).await
    }

    /// Tell the farmer the booking was rejected and why
    pub async fn notify_rejected(&self, booking: &Booking) -> bool {
        self.send_sms(rejection_message(booking)).await
    }
}

/// Approval text for a booking
pub fn approval_message(booking: &Booking, slot_date: Option<NaiveDate>) -> SmsMessage {
    let mut message = format!(
        "Dear {}, your warehouse booking {} has been approved",
        booking.farmer_name,
        short_reference(booking)
    );
    if let Some(date) = slot_date {
        message.push_str(&format!(" for {}", date.format("%d-%m-%Y")));
    }
    message.push('.');
    if let Some(url) = &booking.qr_code_url {
        message.push_str(&format!(" Show this QR code at pickup: {}", url));
    }

    SmsMessage {
        recipient: booking.farmer_mobile.clone(),
        message,
    }
}

/// Rejection text for a booking
pub fn rejection_message(booking: &Booking) -> SmsMessage {
    let reason = booking
        .rejection_reason
        .as_deref()
        .unwrap_or("not specified");

    SmsMessage {
        recipient: booking.farmer_mobile.clone(),
        message: format!(
            "Dear {}, your warehouse booking {} has been rejected. Reason: {}",
            booking.farmer_name,
            short_reference(booking),
            reason
        ),
    }
}

/// First block of the booking ID, enough for a farmer to quote
fn short_reference(booking: &Booking) -> String {
    booking
        .id
        .to_string()
        .split('-')
        .next()
        .unwrap_or_default()
        .to_uppercase()
}
