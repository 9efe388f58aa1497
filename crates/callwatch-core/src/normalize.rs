//! Raw status normalization
//!
//! Maps one raw provider lifecycle status plus its ancillary signals (SIP
//! response code, reported duration, answering-machine outcome) to the
//! semantic outcome and human-readable message stored on the call record.
//! Pure and total: every raw status value lands in exactly one branch, and
//! no input combination reachable from a parsed webhook body can fail.

use chrono::{DateTime, Utc};

use crate::types::{AnsweredBy, SemanticStatus};

/// SIP codes that mean the callee (or their network) rejected the attempt:
/// 480 temporarily unavailable, 486 busy here, 487 request terminated,
/// 603 decline.
fn is_declined_sip_code(sip_code: u16) -> bool {
    matches!(sip_code, 487 | 486 | 480 | 603)
}

/// Normalize one raw lifecycle status into `(semantic status, message)`.
///
/// The decision rules apply only to the terminal pair `completed`/`failed`
/// and are evaluated in priority order: a real conversation (duration above
/// two seconds) wins over everything, then SIP-level or zero-duration
/// decline, then voicemail detection, then plain failure. `busy`,
/// `no-answer` and `canceled` map to `declined` with their own messages;
/// any other status passes through unchanged.
///
/// `ring_at` and `in_progress_at` are accepted for elapsed-time diagnostics
/// only; the reported `duration_secs` is the sole duration input to the
/// decision.
pub fn normalize(
    raw_status: &str,
    sip_code: Option<u16>,
    duration_secs: u64,
    answered_by: Option<AnsweredBy>,
    ring_at: Option<DateTime<Utc>>,
    in_progress_at: Option<DateTime<Utc>>,
) -> (SemanticStatus, String) {
    if let (Some(ring), Some(answered)) = (ring_at, in_progress_at) {
        let ring_secs = (answered - ring).num_seconds();
        tracing::trace!(raw_status, ring_secs, "ring-to-answer elapsed");
    }

    match raw_status {
        "completed" | "failed" => {
            if duration_secs > 2 {
                (SemanticStatus::Completed, "call completed".to_string())
            } else if sip_code.map_or(false, is_declined_sip_code)
                || (duration_secs == 0 && answered_by.is_none())
            {
                (SemanticStatus::Declined, "call was declined".to_string())
            } else if answered_by.map_or(false, |a| a.is_machine_end()) {
                (SemanticStatus::Machine, "call answered by voicemail".to_string())
            } else if raw_status == "failed" {
                (SemanticStatus::Failed, "call failed".to_string())
            } else {
                (SemanticStatus::Completed, "call completed".to_string())
            }
        }
        "busy" => (SemanticStatus::Declined, "line was busy".to_string()),
        "no-answer" => (SemanticStatus::Declined, "call was not answered".to_string()),
        "canceled" => (SemanticStatus::Declined, "call was canceled".to_string()),
        other => (SemanticStatus::Raw(other.to_string()), other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(
        raw: &str,
        sip: Option<u16>,
        duration: u64,
        answered: Option<AnsweredBy>,
    ) -> (SemanticStatus, String) {
        normalize(raw, sip, duration, answered, None, None)
    }

    #[test]
    fn long_duration_always_completes() {
        // Duration above two seconds wins over SIP code and machine detection.
        let (status, message) = norm("completed", Some(486), 5, Some(AnsweredBy::MachineEndBeep));
        assert_eq!(status, SemanticStatus::Completed);
        assert_eq!(message, "call completed");

        let (status, _) = norm("failed", None, 5, None);
        assert_eq!(status, SemanticStatus::Completed);
    }

    #[test]
    fn declined_sip_codes() {
        for code in [487, 486, 480, 603] {
            let (status, message) = norm("failed", Some(code), 0, None);
            assert_eq!(status, SemanticStatus::Declined, "sip {code}");
            assert_eq!(message, "call was declined");
        }
        // 404 is not a decline code; zero duration with no AMD still declines.
        let (status, _) = norm("failed", Some(404), 0, None);
        assert_eq!(status, SemanticStatus::Declined);
    }

    #[test]
    fn zero_duration_without_amd_declines() {
        let (status, message) = norm("completed", None, 0, None);
        assert_eq!(status, SemanticStatus::Declined);
        assert_eq!(message, "call was declined");
    }

    #[test]
    fn decline_check_precedes_machine_check() {
        // Both the zero-duration decline rule and the machine rule match here
        // textually; the decline rule has priority.
        let (status, message) = norm("completed", Some(487), 0, Some(AnsweredBy::MachineEndBeep));
        assert_eq!(status, SemanticStatus::Declined);
        assert_eq!(message, "call was declined");
    }

    #[test]
    fn machine_end_variants_map_to_voicemail() {
        for answered in [
            AnsweredBy::MachineEndBeep,
            AnsweredBy::MachineEndSilence,
            AnsweredBy::MachineEndOther,
        ] {
            let (status, message) = norm("completed", None, 1, Some(answered));
            assert_eq!(status, SemanticStatus::Machine);
            assert_eq!(message, "call answered by voicemail");
        }
    }

    #[test]
    fn machine_start_is_not_voicemail() {
        // A short call flagged machine_start falls through to completed.
        let (status, _) = norm("completed", None, 1, Some(AnsweredBy::MachineStart));
        assert_eq!(status, SemanticStatus::Completed);
    }

    #[test]
    fn short_failed_call_is_failed() {
        let (status, message) = norm("failed", None, 1, Some(AnsweredBy::Human));
        assert_eq!(status, SemanticStatus::Failed);
        assert_eq!(message, "call failed");
    }

    #[test]
    fn busy_no_answer_canceled_decline_with_messages() {
        let (status, message) = norm("busy", None, 0, None);
        assert_eq!(status, SemanticStatus::Declined);
        assert_eq!(message, "line was busy");

        let (status, message) = norm("no-answer", None, 0, None);
        assert_eq!(status, SemanticStatus::Declined);
        assert_eq!(message, "call was not answered");

        let (status, message) = norm("canceled", None, 0, None);
        assert_eq!(status, SemanticStatus::Declined);
        assert_eq!(message, "call was canceled");
    }

    #[test]
    fn non_terminal_statuses_pass_through() {
        for raw in ["initiated", "ringing", "in-progress", "queued", "custom-status"] {
            let (status, message) = norm(raw, Some(486), 10, Some(AnsweredBy::Human));
            assert_eq!(status, SemanticStatus::Raw(raw.to_string()));
            assert_eq!(message, raw);
        }
    }

    #[test]
    fn timestamps_do_not_affect_the_decision() {
        let ring = Utc::now();
        let answered = ring + chrono::Duration::seconds(30);
        let (status, _) = normalize("completed", None, 5, None, Some(ring), Some(answered));
        assert_eq!(status, SemanticStatus::Completed);
        let (status, _) = normalize("completed", None, 0, None, Some(ring), Some(answered));
        assert_eq!(status, SemanticStatus::Declined);
    }
}
