//! Call lifecycle tracker
//!
//! [`CallTracker`] is the single owner of the three per-call maps: the
//! record store, the transient tracking state, and the pending timeout
//! timers. All three are keyed exclusively by call identifier and only the
//! operations on this type mutate them, so at most one record, one tracking
//! state and one pending timeout exist per call at any time.
//!
//! # Concurrency contract
//!
//! Inbound work (webhook callbacks, expiry timers, retention timers) is
//! dispatched as discrete tokio tasks. Each map sits behind its own
//! `RwLock`, which gives whole-map mutual exclusion: no two tasks mutate
//! the same call's state concurrently, and none of the lock-holding
//! sections perform blocking I/O. Provider deliveries may still arrive out
//! of order or duplicated over the network; every fold is treated as
//! authoritative at time of arrival (last-write-wins on status, append-only
//! on the event log) and no monotonic raw-status ordering is assumed.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::normalize::normalize;
use crate::retention::{RetentionSweeper, DEFAULT_RETENTION_WINDOW};
use crate::store::{CallRecordStore, EventExtras};
use crate::timeout::TimeoutScheduler;
use crate::types::{is_terminal_raw_status, CallId, CallRecord, SemanticStatus, StatusEvent};

pub const DEFAULT_NO_ANSWER_TIMEOUT: Duration = Duration::from_secs(45);

/// Tracker tuning knobs.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How long a freshly placed call may go without any status callback
    /// before a synthetic no-answer is folded.
    pub no_answer_timeout: Duration,
    /// How long a completed call's record stays queryable after its
    /// terminal fold.
    pub retention_window: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            no_answer_timeout: DEFAULT_NO_ANSWER_TIMEOUT,
            retention_window: DEFAULT_RETENTION_WINDOW,
        }
    }
}

/// Transient per-call state, created lazily on the first raw event and
/// destroyed when a terminal raw status is folded.
#[derive(Debug, Default)]
struct TrackingState {
    /// First-observed timestamp per raw status name, used for
    /// ring-to-answer elapsed diagnostics.
    raw_timestamps: HashMap<String, DateTime<Utc>>,
}

/// Point-in-time counters over the tracker's maps.
#[derive(Debug, Clone, Copy)]
pub struct TrackerStats {
    pub records: usize,
    pub tracked_calls: usize,
    pub armed_timeouts: usize,
}

#[derive(Debug)]
struct TrackerInner {
    store: CallRecordStore,
    tracking: RwLock<HashMap<CallId, TrackingState>>,
    timeouts: TimeoutScheduler,
    sweeper: RetentionSweeper,
    config: TrackerConfig,
}

/// Facade over the record store, timeout scheduler and retention sweeper.
pub struct CallTracker {
    inner: Arc<TrackerInner>,
}

impl CallTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let store = CallRecordStore::new();
        let sweeper = RetentionSweeper::new(store.clone(), config.retention_window);
        Self {
            inner: Arc::new(TrackerInner {
                store,
                tracking: RwLock::new(HashMap::new()),
                timeouts: TimeoutScheduler::new(),
                sweeper,
                config,
            }),
        }
    }

    /// Register a freshly placed call and arm its no-answer timeout.
    ///
    /// `initial_status` is the provider's placement status (e.g. `queued`)
    /// and is carried through as-is. The expiry callback holds only a weak
    /// reference to the tracker, so a timer outliving the tracker fires
    /// into nothing.
    pub async fn register_call(
        &self,
        call_id: CallId,
        to: impl Into<String>,
        from: impl Into<String>,
        initial_status: &str,
    ) -> Result<CallRecord> {
        let record = self
            .inner
            .store
            .create_record(
                call_id.clone(),
                to,
                from,
                SemanticStatus::Raw(initial_status.to_string()),
            )
            .await?;

        let weak: Weak<TrackerInner> = Arc::downgrade(&self.inner);
        self.inner
            .timeouts
            .arm(call_id.clone(), self.inner.config.no_answer_timeout, move |id| async move {
                if let Some(inner) = weak.upgrade() {
                    CallTracker { inner }.expire_call(id).await;
                }
            })
            .await;

        tracing::info!(call_id = %call_id, status = initial_status, "tracking new call");
        Ok(record)
    }

    /// Fold one inbound provider status callback.
    ///
    /// Every arrival disarms the pending timeout, terminal or not: once the
    /// provider has shown any sign of life for a call, the no-answer guard
    /// is considered spent. A terminal raw status additionally retires the
    /// tracking state immediately and schedules the record's deferred
    /// deletion.
    pub async fn handle_status_event(&self, event: StatusEvent) -> CallRecord {
        self.inner.timeouts.disarm(&event.call_id).await;

        let now = Utc::now();
        let (ring_at, in_progress_at) = {
            let mut tracking = self.inner.tracking.write().await;
            let state = tracking.entry(event.call_id.clone()).or_default();
            state
                .raw_timestamps
                .entry(event.raw_status.clone())
                .or_insert(now);
            (
                state.raw_timestamps.get("ringing").copied(),
                state.raw_timestamps.get("in-progress").copied(),
            )
        };

        let duration_secs = event.duration_secs.unwrap_or(0);
        let (status, message) = normalize(
            &event.raw_status,
            event.sip_code,
            duration_secs,
            event.answered_by,
            ring_at,
            in_progress_at,
        );

        tracing::info!(
            call_id = %event.call_id,
            raw_status = %event.raw_status,
            status = %status,
            "folding status event"
        );

        let record = self
            .inner
            .store
            .fold_event(
                &event.call_id,
                status,
                message,
                EventExtras {
                    duration_secs: event.duration_secs,
                    answered_by: event.answered_by,
                    sip_code: event.sip_code,
                },
            )
            .await;

        if is_terminal_raw_status(&event.raw_status) {
            self.inner.tracking.write().await.remove(&event.call_id);
            self.inner.sweeper.schedule_deletion(event.call_id.clone());
        }

        record
    }

    /// Fold an asynchronous-path failure (e.g. the voice webhook collaborator
    /// erroring while the call is live) into the record.
    pub async fn record_failure(&self, call_id: &CallId, message: impl Into<String>) -> CallRecord {
        let message = message.into();
        tracing::warn!(call_id = %call_id, %message, "recording call failure");
        self.inner
            .store
            .fold_event(call_id, SemanticStatus::Error, message, EventExtras::default())
            .await
    }

    pub async fn status(&self, call_id: &CallId) -> Option<CallRecord> {
        self.inner.store.get(call_id).await
    }

    pub async fn stats(&self) -> TrackerStats {
        TrackerStats {
            records: self.inner.store.record_count().await,
            tracked_calls: self.inner.tracking.read().await.len(),
            armed_timeouts: self.inner.timeouts.armed_count().await,
        }
    }

    /// Expiry path: the call received no callback at all within the armed
    /// window. The terminal status is written directly as `no-answer`,
    /// deliberately not the normalizer's `declined` mapping for a
    /// provider-reported `no-answer`; the two labels distinguish a timeout
    /// we synthesized from an outcome the provider reported.
    async fn expire_call(&self, call_id: CallId) {
        tracing::info!(call_id = %call_id, "no status callback within timeout, closing call");
        self.inner
            .store
            .fold_event(
                &call_id,
                SemanticStatus::Raw("no-answer".to_string()),
                "call was not answered (timeout)",
                EventExtras::default(),
            )
            .await;
        self.inner.tracking.write().await.remove(&call_id);
        self.inner.sweeper.schedule_deletion(call_id);
    }
}

impl Clone for CallTracker {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
