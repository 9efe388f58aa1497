//! No-answer timeout scheduling
//!
//! One pending expiry timer per in-flight call, held as a cancelable handle
//! keyed by call identifier. Arming returns immediately; the expiry callback
//! runs on its own spawned task, so a panic inside it cannot take the
//! process down. Disarm is the single cancellation path and is idempotent.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::types::CallId;

/// Schedules one no-answer expiry per in-flight call.
#[derive(Debug)]
pub struct TimeoutScheduler {
    timers: Arc<RwLock<HashMap<CallId, JoinHandle<()>>>>,
}

impl TimeoutScheduler {
    pub fn new() -> Self {
        Self {
            timers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Schedule `on_expire(call_id)` to run after `duration` unless the
    /// timer is disarmed first. Replaces (and cancels) any prior timer for
    /// the same call; normal operation never re-arms, but a replaced timer
    /// must not fire twice.
    pub async fn arm<F, Fut>(&self, call_id: CallId, duration: Duration, on_expire: F)
    where
        F: FnOnce(CallId) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let timers = Arc::clone(&self.timers);
        let id = call_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // Deregister before firing so a disarm that loses the race is a
            // clean no-op instead of an abort mid-callback.
            timers.write().await.remove(&id);
            tracing::debug!(call_id = %id, "call timeout expired");
            on_expire(id).await;
        });

        if let Some(previous) = self.timers.write().await.insert(call_id, handle) {
            previous.abort();
        }
    }

    /// Cancel the pending timer if present. Returns whether one was armed.
    pub async fn disarm(&self, call_id: &CallId) -> bool {
        match self.timers.write().await.remove(call_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub async fn armed_count(&self) -> usize {
        self.timers.read().await.len()
    }
}

impl Clone for TimeoutScheduler {
    fn clone(&self) -> Self {
        Self {
            timers: Arc::clone(&self.timers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn armed_timer_fires_once() {
        let scheduler = TimeoutScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        scheduler
            .arm(CallId::new("CA1"), Duration::from_secs(45), move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.armed_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_prevents_firing() {
        let scheduler = TimeoutScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        scheduler
            .arm(CallId::new("CA2"), Duration::from_secs(45), move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(scheduler.disarm(&CallId::new("CA2")).await);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Second disarm is a no-op.
        assert!(!scheduler.disarm(&CallId::new("CA2")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_previous_timer() {
        let scheduler = TimeoutScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&fired);
        scheduler
            .arm(CallId::new("CA3"), Duration::from_secs(10), move |_| async move {
                first.fetch_add(10, Ordering::SeqCst);
            })
            .await;

        let second = Arc::clone(&fired);
        scheduler
            .arm(CallId::new("CA3"), Duration::from_secs(30), move |_| async move {
                second.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(scheduler.armed_count().await, 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
