//! Error types for call tracking operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("call record already exists: {0}")]
    DuplicateCall(String),

    #[error("call record not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("telephony provider error: {0}")]
    Provider(String),

    #[error("voice webhook error: {0}")]
    Webhook(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
