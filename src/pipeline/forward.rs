//! Outbound forwarding to the downstream automation webhook.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ConfigError, ForwardError};

/// Default deadline for the outbound call.
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(15);

/// Delivers a routed payload downstream. One attempt, no retries.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, payload: &Value) -> Result<(), ForwardError>;
}

/// POSTs the payload as JSON to a fixed URL.
pub struct HttpForwarder {
    url: String,
    client: reqwest::Client,
}

impl HttpForwarder {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "forward_timeout".into(),
                message: e.to_string(),
            })?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, payload: &Value) -> Result<(), ForwardError> {
        let resp = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %self.url, error = %e, "Forward request failed");
                ForwardError::Unreachable(e.to_string())
            })?;

        let status = resp.status();
        if status.as_u16() >= 300 {
            let body = resp.text().await.unwrap_or_default();
            warn!(url = %self.url, status = status.as_u16(), "Downstream rejected forward");
            return Err(ForwardError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %self.url, status = status.as_u16(), "Forward accepted");
        Ok(())
    }
}
