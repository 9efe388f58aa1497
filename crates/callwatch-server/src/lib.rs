//! # Callwatch Server - HTTP Surface and Provider Integration
//!
//! This crate wires the callwatch tracker core to the outside world: an
//! axum REST API for call placement and status lookup, the provider's
//! webhook endpoints that feed the tracker, and reqwest-backed clients for
//! the telephony provider and the conversational voice webhook.

pub mod api;
pub mod config;
pub mod provider;
pub mod validation;
pub mod webhook;

pub use api::{create_router, ApiState};
pub use config::ServerConfig;
pub use provider::{CallHandle, CallbackConfig, HttpTelephonyProvider, NumberConfig, TelephonyProvider};
pub use webhook::{fallback_markup, HttpVoiceWebhook, MarkupParams, VoiceWebhook, WebhookTarget};
