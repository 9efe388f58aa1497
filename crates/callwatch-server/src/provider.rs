//! Telephony provider collaborator
//!
//! The tracker consumes the provider as a capability: place a call with
//! callback URLs attached, and look up the configuration of one of our
//! phone numbers. [`HttpTelephonyProvider`] is the production
//! implementation against the provider's REST API; tests substitute their
//! own trait impls.

use async_trait::async_trait;
use serde::Deserialize;

use callwatch_core::errors::{Result, TrackerError};

/// Callback URLs handed to the provider at call placement.
#[derive(Debug, Clone)]
pub struct CallbackConfig {
    pub status_callback_url: String,
    pub voice_url: String,
}

/// Provider's response to a placement request.
#[derive(Debug, Clone, Deserialize)]
pub struct CallHandle {
    /// Provider-assigned call identifier.
    pub sid: String,
    /// Initial placement status (e.g. `queued`).
    pub status: String,
}

/// Provider-side configuration of one of our phone numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NumberConfig {
    pub phone_number: String,
    /// Conversational application wired to this number, if any.
    pub voice_application_id: Option<String>,
    /// API key for that application's webhook service.
    pub voice_api_key: Option<String>,
}

#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Place an outbound call from `from` to `to`, registering the given
    /// callback URLs for lifecycle events and call-control markup.
    async fn place_call(&self, to: &str, from: &str, callbacks: &CallbackConfig)
        -> Result<CallHandle>;

    /// Fetch the provider-side configuration for one of our numbers.
    async fn lookup_number_config(&self, phone_number: &str) -> Result<NumberConfig>;
}

/// REST client for the telephony provider.
pub struct HttpTelephonyProvider {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
    auth_token: String,
}

impl HttpTelephonyProvider {
    pub fn new(
        base_url: impl Into<String>,
        account_id: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            account_id: account_id.into(),
            auth_token: auth_token.into(),
        }
    }
}

#[async_trait]
impl TelephonyProvider for HttpTelephonyProvider {
    async fn place_call(
        &self,
        to: &str,
        from: &str,
        callbacks: &CallbackConfig,
    ) -> Result<CallHandle> {
        let url = format!("{}/accounts/{}/calls", self.base_url, self.account_id);
        tracing::debug!(to, from, "placing call via provider");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_id, Some(&self.auth_token))
            .form(&[
                ("To", to),
                ("From", from),
                ("Url", callbacks.voice_url.as_str()),
                ("StatusCallback", callbacks.status_callback_url.as_str()),
                ("MachineDetection", "Enable"),
            ])
            .send()
            .await
            .map_err(|e| TrackerError::Provider(format!("call placement request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TrackerError::Provider(format!(
                "call placement rejected with HTTP {}",
                response.status()
            )));
        }

        response
            .json::<CallHandle>()
            .await
            .map_err(|e| TrackerError::Provider(format!("malformed placement response: {e}")))
    }

    async fn lookup_number_config(&self, phone_number: &str) -> Result<NumberConfig> {
        let url = format!(
            "{}/accounts/{}/numbers/{}",
            self.base_url, self.account_id, phone_number
        );

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.account_id, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| TrackerError::Provider(format!("number lookup request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TrackerError::Provider(format!(
                "number lookup for {} failed with HTTP {}",
                phone_number,
                response.status()
            )));
        }

        response
            .json::<NumberConfig>()
            .await
            .map_err(|e| TrackerError::Provider(format!("malformed number config: {e}")))
    }
}
