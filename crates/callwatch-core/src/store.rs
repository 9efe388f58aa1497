//! Call record store
//!
//! Owns the mapping from call identifier to its current record and
//! append-only event log. All mutation goes through [`CallRecordStore`]; the
//! raw map is never exposed, which keeps the one-record-per-call invariant
//! enforceable. Mutations are visible to subsequent `get` calls immediately
//! (single logical owner, no caching layer).

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use chrono::Utc;

use crate::errors::{Result, TrackerError};
use crate::types::{AnsweredBy, CallEvent, CallId, CallRecord, SemanticStatus};

/// Ancillary fields carried onto a folded event entry.
#[derive(Debug, Clone, Default)]
pub struct EventExtras {
    pub duration_secs: Option<u64>,
    pub answered_by: Option<AnsweredBy>,
    pub sip_code: Option<u16>,
}

#[derive(Debug, Default)]
struct StoreStats {
    total_created: usize,
    total_retired: usize,
}

/// In-memory store of call records, keyed by call identifier.
///
/// Process-wide state with no persistence; lost on restart by design.
#[derive(Debug)]
pub struct CallRecordStore {
    records: Arc<RwLock<HashMap<CallId, CallRecord>>>,
    stats: Arc<RwLock<StoreStats>>,
}

impl CallRecordStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(StoreStats::default())),
        }
    }

    /// Register a record at call placement.
    ///
    /// Fails with [`TrackerError::DuplicateCall`] if a record already exists
    /// for this identifier. Correct placement never hits that branch, but
    /// the guard keeps a provider-side identifier reuse from silently
    /// clobbering an existing record.
    pub async fn create_record(
        &self,
        call_id: CallId,
        to: impl Into<String>,
        from: impl Into<String>,
        initial_status: SemanticStatus,
    ) -> Result<CallRecord> {
        let mut records = self.records.write().await;
        if records.contains_key(&call_id) {
            return Err(TrackerError::DuplicateCall(call_id.0));
        }

        let record = CallRecord {
            call_id: call_id.clone(),
            to: to.into(),
            from: from.into(),
            status: initial_status,
            last_updated: Utc::now(),
            events: Vec::new(),
        };
        records.insert(call_id.clone(), record.clone());
        self.stats.write().await.total_created += 1;

        tracing::debug!(call_id = %call_id, "registered call record");
        Ok(record)
    }

    /// Fold one normalized event into a record: append to the event log and
    /// make the event's status the record's current status.
    ///
    /// Never errors. If no record exists one is synthesized with empty
    /// endpoints: a status callback can race the placement path, or arrive
    /// after the record was retired, and both must still be recorded.
    /// Duplicate deliveries append a second event entry; they are recorded,
    /// not deduplicated.
    pub async fn fold_event(
        &self,
        call_id: &CallId,
        status: SemanticStatus,
        message: impl Into<String>,
        extras: EventExtras,
    ) -> CallRecord {
        let now = Utc::now();
        let mut records = self.records.write().await;

        let record = records.entry(call_id.clone()).or_insert_with(|| {
            tracing::debug!(call_id = %call_id, "synthesizing record for unseen call");
            CallRecord {
                call_id: call_id.clone(),
                to: String::new(),
                from: String::new(),
                status: status.clone(),
                last_updated: now,
                events: Vec::new(),
            }
        });

        record.events.push(CallEvent {
            status: status.clone(),
            message: message.into(),
            timestamp: now,
            duration_secs: extras.duration_secs,
            answered_by: extras.answered_by,
            sip_code: extras.sip_code,
        });
        record.status = status;
        record.last_updated = now;

        record.clone()
    }

    pub async fn get(&self, call_id: &CallId) -> Option<CallRecord> {
        self.records.read().await.get(call_id).cloned()
    }

    /// Remove a record. Returns whether one existed.
    pub async fn delete(&self, call_id: &CallId) -> bool {
        let removed = self.records.write().await.remove(call_id).is_some();
        if removed {
            self.stats.write().await.total_retired += 1;
            tracing::debug!(call_id = %call_id, "deleted call record");
        }
        removed
    }

    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Clone for CallRecordStore {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            stats: Arc::clone(&self.stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get() {
        let store = CallRecordStore::new();
        let id = CallId::new("CA100");
        store
            .create_record(id.clone(), "+15550001111", "+15550002222", SemanticStatus::Raw("queued".into()))
            .await
            .unwrap();

        let record = store.get(&id).await.unwrap();
        assert_eq!(record.to, "+15550001111");
        assert_eq!(record.status, SemanticStatus::Raw("queued".into()));
        assert!(record.events.is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = CallRecordStore::new();
        let id = CallId::new("CA100");
        store
            .create_record(id.clone(), "+1", "+2", SemanticStatus::Raw("queued".into()))
            .await
            .unwrap();

        let err = store
            .create_record(id, "+3", "+4", SemanticStatus::Raw("queued".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateCall(_)));
    }

    #[tokio::test]
    async fn fold_appends_and_updates_status() {
        let store = CallRecordStore::new();
        let id = CallId::new("CA200");
        store
            .create_record(id.clone(), "+1", "+2", SemanticStatus::Raw("queued".into()))
            .await
            .unwrap();

        store
            .fold_event(&id, SemanticStatus::Raw("ringing".into()), "ringing", EventExtras::default())
            .await;
        let record = store
            .fold_event(&id, SemanticStatus::Completed, "call completed", EventExtras {
                duration_secs: Some(12),
                ..Default::default()
            })
            .await;

        assert_eq!(record.status, SemanticStatus::Completed);
        assert_eq!(record.events.len(), 2);
        assert_eq!(record.events[0].message, "ringing");
        assert_eq!(record.events[1].duration_secs, Some(12));
    }

    #[tokio::test]
    async fn duplicate_terminal_fold_keeps_status_and_appends() {
        let store = CallRecordStore::new();
        let id = CallId::new("CA201");

        store
            .fold_event(&id, SemanticStatus::Completed, "call completed", EventExtras::default())
            .await;
        let record = store
            .fold_event(&id, SemanticStatus::Completed, "call completed", EventExtras::default())
            .await;

        assert_eq!(record.status, SemanticStatus::Completed);
        assert_eq!(record.events.len(), 2);
    }

    #[tokio::test]
    async fn fold_on_unknown_call_synthesizes_bare_record() {
        let store = CallRecordStore::new();
        let id = CallId::new("CA300");
        let record = store
            .fold_event(&id, SemanticStatus::Raw("ringing".into()), "ringing", EventExtras::default())
            .await;

        assert_eq!(record.call_id, id);
        assert!(record.to.is_empty());
        assert!(record.from.is_empty());
        assert_eq!(record.events.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = CallRecordStore::new();
        let id = CallId::new("CA400");
        store
            .create_record(id.clone(), "+1", "+2", SemanticStatus::Raw("queued".into()))
            .await
            .unwrap();

        assert!(store.delete(&id).await);
        assert!(store.get(&id).await.is_none());
        assert!(!store.delete(&id).await);
    }
}
