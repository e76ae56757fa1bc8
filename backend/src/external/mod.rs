//! External service integrations

pub mod qr;
pub mod sms;

pub use qr::{QrArtifact, QrCodeGenerator};
pub use sms::{SmsGatewayClient, SmsMessage};
