//! QR artifact composition
//!
//! Image rendering is delegated to an external generator that takes the token
//! as a query parameter; only the token and the URL are stored.

use serde::Serialize;
use shared::QrToken;

use crate::config::QrConfig;

/// Token plus the URL that renders it as a scannable image
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QrArtifact {
    pub data: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct QrCodeGenerator {
    generator_url: String,
}

impl QrCodeGenerator {
    pub fn new(config: &QrConfig) -> Self {
        Self {
            generator_url: config.generator_url.clone(),
        }
    }

    pub fn artifact(&self, token: &QrToken) -> QrArtifact {
        let data = token.to_string();
        QrArtifact {
            url: format!("{}{}", self.generator_url, data),
            data,
        }
    }
}

impl Default for QrCodeGenerator {
    fn default() -> Self {
        Self::new(&QrConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_artifact_url_embeds_token() {
        let generator = QrCodeGenerator::new(&QrConfig {
            generator_url: "https://qr.example.org/render?data=".to_string(),
        });
        let token = QrToken::pickup(Uuid::new_v4(), Utc::now());
        let artifact = generator.artifact(&token);

        assert_eq!(artifact.data, token.to_string());
        assert_eq!(
            artifact.url,
            format!("https://qr.example.org/render?data={}", token)
        );
    }
}
