//! Conversational voice webhook collaborator
//!
//! When a placed call connects, the provider asks this server for
//! call-control markup; we in turn redirect to the conversational webhook
//! configured for the dialed number. The collaborator is consumed as two
//! capabilities: resolve a number's webhook target, and fetch the markup
//! from it. Failures never surface to the provider — the API layer answers
//! with [`fallback_markup`] instead.

use async_trait::async_trait;
use serde::Serialize;

use callwatch_core::errors::{Result, TrackerError};

use crate::provider::NumberConfig;

/// Resolved webhook endpoint for one phone number.
#[derive(Debug, Clone)]
pub struct WebhookTarget {
    pub webhook_id: String,
    pub api_key: String,
}

/// Call context forwarded to the webhook when requesting markup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MarkupParams {
    pub call_id: String,
    pub caller: String,
}

#[async_trait]
pub trait VoiceWebhook: Send + Sync {
    /// Resolve the webhook target configured for a number.
    async fn resolve(&self, number: &NumberConfig) -> Result<WebhookTarget>;

    /// Fetch call-control markup from a resolved webhook.
    async fn fetch_markup(&self, target: &WebhookTarget, params: &MarkupParams) -> Result<String>;
}

/// Spoken apology plus hangup, served when the webhook collaborator fails.
pub fn fallback_markup() -> String {
    concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<Response>",
        "<Say>We are sorry, we cannot connect your call at this time. Please try again later.</Say>",
        "<Hangup/>",
        "</Response>"
    )
    .to_string()
}

/// HTTP client for the conversational webhook service.
pub struct HttpVoiceWebhook {
    http: reqwest::Client,
    base_url: String,
}

impl HttpVoiceWebhook {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl VoiceWebhook for HttpVoiceWebhook {
    async fn resolve(&self, number: &NumberConfig) -> Result<WebhookTarget> {
        let webhook_id = number.voice_application_id.clone().ok_or_else(|| {
            TrackerError::Webhook(format!(
                "no voice application configured for {}",
                number.phone_number
            ))
        })?;
        let api_key = number.voice_api_key.clone().ok_or_else(|| {
            TrackerError::Webhook(format!("no webhook api key configured for {}", number.phone_number))
        })?;

        Ok(WebhookTarget { webhook_id, api_key })
    }

    async fn fetch_markup(&self, target: &WebhookTarget, params: &MarkupParams) -> Result<String> {
        let url = format!("{}/webhooks/{}/call-control", self.base_url, target.webhook_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&target.api_key)
            .json(params)
            .send()
            .await
            .map_err(|e| TrackerError::Webhook(format!("markup request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TrackerError::Webhook(format!(
                "webhook {} answered HTTP {}",
                target.webhook_id,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| TrackerError::Webhook(format!("unreadable markup response: {e}")))
    }
}
