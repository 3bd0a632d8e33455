//! Operator notifications
//!
//! The webhook sink posts `{"text": ...}` to `<base_url>/send` of a chat bot.
//! Delivery is best-effort: callers log failures and move on.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::domain::{DomainError, DomainResult, NotificationSink};

#[derive(Debug, Serialize)]
struct Notice<'a> {
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> DomainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Upstream(format!("notification client: {}", e)))?;
        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            url: format!("{}/send", base_url.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, text: &str) -> DomainResult<()> {
        let response = self
            .http
            .post(&self.url)
            .json(&Notice { text })
            .send()
            .await
            .map_err(|e| DomainError::Upstream(format!("notification request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Upstream(format!(
                "notification endpoint returned {}",
                status.as_u16()
            )));
        }
        debug!("Notification delivered");
        Ok(())
    }
}

/// Used when no webhook is configured
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl NotificationSink for NoopNotifier {
    async fn notify(&self, text: &str) -> DomainResult<()> {
        debug!(text, "Notifications disabled, dropping");
        Ok(())
    }
}
