//! Deferred retirement of completed call records
//!
//! A terminal fold keeps its record queryable for the retention window so
//! late status lookups still succeed, then the record is deleted. Once
//! scheduled, deletion is unconditional: no further events are expected
//! after a terminal raw status, and if one does arrive the store's fold
//! upsert recreates a bare record.

use std::time::Duration;

use crate::store::CallRecordStore;
use crate::types::CallId;

pub const DEFAULT_RETENTION_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Schedules deferred deletion of completed call records.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    store: CallRecordStore,
    window: Duration,
}

impl RetentionSweeper {
    pub fn new(store: CallRecordStore, window: Duration) -> Self {
        Self { store, window }
    }

    /// Delete the record after the retention window elapses. Not cancelable.
    pub fn schedule_deletion(&self, call_id: CallId) {
        let store = self.store.clone();
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if store.delete(&call_id).await {
                tracing::debug!(call_id = %call_id, "retention window elapsed, record retired");
            }
        });
    }
}
