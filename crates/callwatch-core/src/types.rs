//! Type definitions for the call tracker
//!
//! The tracker speaks two vocabularies: the *raw* lifecycle status strings
//! reported verbatim by the telephony provider (`ringing`, `completed`, ...)
//! and the *semantic* outcome exposed to API consumers. Raw statuses stay
//! plain strings because the provider owns that namespace; semantic outcomes
//! are the closed [`SemanticStatus`] variant set, with [`SemanticStatus::Raw`]
//! carrying non-terminal statuses through unchanged.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Opaque call identifier assigned by the telephony provider at placement.
///
/// Globally unique for the lifetime of one call attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CallId(pub String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw statuses after which the provider sends no further lifecycle events.
pub fn is_terminal_raw_status(raw_status: &str) -> bool {
    matches!(
        raw_status,
        "completed" | "failed" | "busy" | "no-answer" | "canceled"
    )
}

/// Normalized outcome exposed to API consumers.
///
/// `Raw` carries a provider status through unchanged: the in-flight statuses
/// (`initiated`, `ringing`, `in-progress`) and the direct `no-answer` write
/// the timeout expiry path performs without going through the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticStatus {
    Completed,
    Declined,
    Machine,
    Failed,
    Error,
    Raw(String),
}

impl SemanticStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SemanticStatus::Completed => "completed",
            SemanticStatus::Declined => "declined",
            SemanticStatus::Machine => "machine",
            SemanticStatus::Failed => "failed",
            SemanticStatus::Error => "error",
            SemanticStatus::Raw(raw) => raw,
        }
    }
}

impl fmt::Display for SemanticStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for SemanticStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Answering-machine-detection outcome reported by the provider.
///
/// Parsing is lenient: values this build does not know about degrade to
/// `Unknown` rather than failing the webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsweredBy {
    Human,
    MachineStart,
    MachineEndBeep,
    MachineEndSilence,
    MachineEndOther,
    Fax,
    Unknown,
}

impl AnsweredBy {
    pub fn parse(value: &str) -> Self {
        match value {
            "human" => AnsweredBy::Human,
            "machine_start" => AnsweredBy::MachineStart,
            "machine_end_beep" => AnsweredBy::MachineEndBeep,
            "machine_end_silence" => AnsweredBy::MachineEndSilence,
            "machine_end_other" => AnsweredBy::MachineEndOther,
            "fax" => AnsweredBy::Fax,
            _ => AnsweredBy::Unknown,
        }
    }

    /// Machine-end variants mean the answering machine finished its greeting.
    pub fn is_machine_end(&self) -> bool {
        matches!(
            self,
            AnsweredBy::MachineEndBeep | AnsweredBy::MachineEndSilence | AnsweredBy::MachineEndOther
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnsweredBy::Human => "human",
            AnsweredBy::MachineStart => "machine_start",
            AnsweredBy::MachineEndBeep => "machine_end_beep",
            AnsweredBy::MachineEndSilence => "machine_end_silence",
            AnsweredBy::MachineEndOther => "machine_end_other",
            AnsweredBy::Fax => "fax",
            AnsweredBy::Unknown => "unknown",
        }
    }
}

impl Serialize for AnsweredBy {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One parsed provider status callback, ready to fold into the tracker.
///
/// Ancillary fields are already degraded at the parsing boundary: a missing
/// or non-numeric duration arrives as `None`, an absent answering-machine
/// outcome as `None`.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub call_id: CallId,
    pub raw_status: String,
    pub sip_code: Option<u16>,
    pub duration_secs: Option<u64>,
    pub answered_by: Option<AnsweredBy>,
}

/// One folded entry in a call record's append-only event log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvent {
    pub status: SemanticStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_by: Option<AnsweredBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sip_code: Option<u16>,
}

/// Current state of one tracked call.
///
/// `to` and `from` are immutable after creation; `status` and `last_updated`
/// change only through the store's fold operation; `events` is append-only
/// and never reordered or truncated short of full deletion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub call_id: CallId,
    pub to: String,
    pub from: String,
    pub status: SemanticStatus,
    pub last_updated: DateTime<Utc>,
    pub events: Vec<CallEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_raw_statuses() {
        for s in ["completed", "failed", "busy", "no-answer", "canceled"] {
            assert!(is_terminal_raw_status(s), "{s} should be terminal");
        }
        for s in ["initiated", "ringing", "in-progress", "queued", ""] {
            assert!(!is_terminal_raw_status(s), "{s} should not be terminal");
        }
    }

    #[test]
    fn answered_by_parsing_is_lenient() {
        assert_eq!(AnsweredBy::parse("human"), AnsweredBy::Human);
        assert_eq!(AnsweredBy::parse("machine_end_beep"), AnsweredBy::MachineEndBeep);
        assert_eq!(AnsweredBy::parse("something-new"), AnsweredBy::Unknown);
        assert!(AnsweredBy::MachineEndSilence.is_machine_end());
        assert!(!AnsweredBy::MachineStart.is_machine_end());
    }

    #[test]
    fn semantic_status_serializes_as_string() {
        let json = serde_json::to_string(&SemanticStatus::Declined).unwrap();
        assert_eq!(json, "\"declined\"");
        let json = serde_json::to_string(&SemanticStatus::Raw("ringing".to_string())).unwrap();
        assert_eq!(json, "\"ringing\"");
    }

    #[test]
    fn call_record_serializes_camel_case() {
        let record = CallRecord {
            call_id: CallId::new("CA123"),
            to: "+15550001111".to_string(),
            from: "+15550002222".to_string(),
            status: SemanticStatus::Raw("ringing".to_string()),
            last_updated: Utc::now(),
            events: vec![],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["callId"], "CA123");
        assert_eq!(value["status"], "ringing");
        assert!(value["lastUpdated"].is_string());
    }
}
