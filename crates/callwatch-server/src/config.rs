//! Server configuration
//!
//! All settings come from the environment and are validated once at
//! startup; a missing credential or base URL is a fatal startup error, not
//! something the tracker discovers at runtime.

use callwatch_core::errors::{Result, TrackerError};

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(TrackerError::Config(format!(
            "missing required environment variable {name}"
        ))),
    }
}

/// Runtime configuration for the callwatch server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Provider account identifier used to authenticate API requests.
    pub provider_account_id: String,
    /// Provider auth token, paired with the account id for basic auth.
    pub provider_auth_token: String,
    /// Base URL of the provider REST API.
    pub provider_base_url: String,
    /// Base URL of the conversational webhook service.
    pub webhook_base_url: String,
    /// Publicly reachable base URL of this server, used to build the
    /// callback URLs handed to the provider at call placement.
    pub public_base_url: String,
    /// TCP port to listen on.
    pub port: u16,
}

impl ServerConfig {
    /// Load and validate configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| TrackerError::Config(format!("invalid PORT value: {raw}")))?,
            Err(_) => 3000,
        };

        Ok(Self {
            provider_account_id: required_env("PROVIDER_ACCOUNT_ID")?,
            provider_auth_token: required_env("PROVIDER_AUTH_TOKEN")?,
            provider_base_url: std::env::var("PROVIDER_BASE_URL")
                .unwrap_or_else(|_| "https://api.telephony.example.com".to_string()),
            webhook_base_url: std::env::var("WEBHOOK_BASE_URL")
                .unwrap_or_else(|_| "https://webhooks.voice.example.com".to_string()),
            public_base_url: required_env("PUBLIC_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            port,
        })
    }

    /// URL the provider posts lifecycle status callbacks to.
    pub fn status_callback_url(&self) -> String {
        format!("{}/call-status", self.public_base_url)
    }

    /// URL the provider fetches call-control markup from when a call
    /// connects.
    pub fn voice_url(&self) -> String {
        format!("{}/voice", self.public_base_url)
    }

    /// Public status-lookup URL for one call.
    pub fn status_url(&self, call_id: &str) -> String {
        format!("{}/status/{}", self.public_base_url, call_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_urls_are_built_from_the_public_base() {
        let config = ServerConfig {
            provider_account_id: "AC1".into(),
            provider_auth_token: "token".into(),
            provider_base_url: "https://api.example.com".into(),
            webhook_base_url: "https://hooks.example.com".into(),
            public_base_url: "https://calls.example.com".into(),
            port: 3000,
        };

        assert_eq!(config.status_callback_url(), "https://calls.example.com/call-status");
        assert_eq!(config.voice_url(), "https://calls.example.com/voice");
        assert_eq!(config.status_url("CA1"), "https://calls.example.com/status/CA1");
    }
}
