use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Image storage is not configured")]
    NotConfigured,

    #[error("Image storage transport error: {0}")]
    Transport(String),

    #[error("Image storage rejected the request: {0}")]
    Rejected(String),
}

/// External image storage. Only deletion is needed server-side; uploads go
/// straight from the browser to the CDN.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Returns `false` when the store has no asset with this id.
    async fn destroy(&self, public_id: &str) -> Result<bool, AssetError>;
}

pub struct CloudinaryStore {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryStore {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name,
            api_key,
            api_secret,
        }
    }

    /// `None` unless all three credentials are present.
    pub fn from_config(config: &StorageConfig) -> Option<Self> {
        match (&config.cloud_name, &config.api_key, &config.api_secret) {
            (Some(name), Some(key), Some(secret)) => {
                Some(Self::new(name.clone(), key.clone(), secret.clone()))
            }
            _ => None,
        }
    }

    fn destroy_url(&self) -> String {
        format!("https://api.cloudinary.com/v1_1/{}/image/destroy", self.cloud_name)
    }
}

/// Request signature: SHA-256 over the sorted `key=value` pairs joined by
/// `&`, with the API secret appended.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let payload = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl AssetStore for CloudinaryStore {
    async fn destroy(&self, public_id: &str) -> Result<bool, AssetError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let response = self
            .client
            .post(self.destroy_url())
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await
            .map_err(|e| AssetError::Transport(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AssetError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = body["error"]["message"].as_str().unwrap_or("unknown error");
            return Err(AssetError::Rejected(format!("{}: {}", status.as_u16(), message)));
        }

        match body["result"].as_str() {
            Some("ok") => {
                tracing::info!("Destroyed asset {}", public_id);
                Ok(true)
            }
            Some("not found") => Ok(false),
            other => Err(AssetError::Rejected(format!("unexpected result {:?}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_order_independent() {
        let a = sign_params(&[("timestamp", "1700000000"), ("public_id", "cms/hero")], "secret");
        let b = sign_params(&[("public_id", "cms/hero"), ("timestamp", "1700000000")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn signature_covers_the_secret() {
        let params = [("public_id", "cms/hero"), ("timestamp", "1700000000")];
        assert_ne!(sign_params(&params, "one"), sign_params(&params, "two"));
    }

    #[test]
    fn partial_credentials_disable_the_store() {
        let config = StorageConfig {
            cloud_name: Some("demo".into()),
            api_key: Some("key".into()),
            api_secret: None,
        };
        assert!(CloudinaryStore::from_config(&config).is_none());
    }
}
