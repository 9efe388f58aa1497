//! # Callwatch Core - Call Lifecycle State Tracking
//!
//! This crate converts the asynchronous lifecycle notifications a telephony
//! provider delivers for outbound calls into a single queryable, semantic
//! status per call. It owns the in-memory call records, normalizes raw
//! provider statuses (plus answering-machine detection and SIP response
//! codes) into a small outcome taxonomy, guards freshly placed calls with a
//! no-answer timeout, and retires completed records after a retention
//! window.

pub mod errors;
pub mod normalize;
pub mod retention;
pub mod store;
pub mod timeout;
pub mod tracker;
pub mod types;

pub use errors::{Result, TrackerError};
pub use normalize::normalize;
pub use retention::RetentionSweeper;
pub use store::{CallRecordStore, EventExtras};
pub use timeout::TimeoutScheduler;
pub use tracker::{CallTracker, TrackerConfig, TrackerStats};
pub use types::{
    is_terminal_raw_status, AnsweredBy, CallEvent, CallId, CallRecord, SemanticStatus, StatusEvent,
};
