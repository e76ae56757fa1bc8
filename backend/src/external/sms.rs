//! SMS gateway client for farmer notifications
//!
//! Posts JSON messages to an HTTP SMS gateway. Delivery receipts are not tracked.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::config::NotificationConfig;
use crate::error::{AppError, AppResult};

/// SMS gateway client
#[derive(Clone)]
pub struct SmsGatewayClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    sender_id: String,
}

/// One outbound text message
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SmsMessage {
    pub recipient: String,
    pub message: String,
}

/// Wire format expected by the gateway
#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    to: &'a str,
    sender: &'a str,
    message: &'a str,
}

impl SmsGatewayClient {
    /// Build a client from configuration; `None` when no gateway is configured
    pub fn from_config(config: &NotificationConfig) -> AppResult<Option<Self>> {
        let Some(base_url) = config.sms_gateway_url.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Configuration(format!("SMS client: {}", e)))?;

        Ok(Some(Self {
            client,
            base_url,
            api_key: config.sms_api_key.clone(),
            sender_id: config.sender_id.clone(),
        }))
    }

    /// Send a message through the gateway
    pub async fn send_sms(&self, sms: &SmsMessage) -> AppResult<()> {
        let mut request = self.client.post(&self.base_url).json(&GatewayRequest {
            to: &sms.recipient,
            sender: &self.sender_id,
            message: &sms.message,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("SMS gateway request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "SMS gateway error: {} - {}",
                status, body
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_gateway_is_disabled() {
        let client = SmsGatewayClient::from_config(&NotificationConfig::default()).unwrap();
        assert!(client.is_none());
    }

    #[test]
    fn test_configured_gateway() {
        let config = NotificationConfig {
            sms_gateway_url: Some("http://localhost:9000/sms".to_string()),
            ..NotificationConfig::default()
        };
        let client = SmsGatewayClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.sender_id, "AGRISV");
    }
}
