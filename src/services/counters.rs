// Sliding-window counter storage
// Injectable backing store for the IP throttle ledger and referral rate limiter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Backing store for sliding-window event counters.
///
/// The in-memory implementation below is the only one shipped: counters are
/// process-local and lost on restart, which is the accepted tradeoff for this
/// anti-abuse layer. A multi-instance deployment gets an independent view per
/// instance; a shared cache would plug in behind this trait.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Append an event timestamp under `key`.
    async fn record(&self, key: &str, at: DateTime<Utc>);

    /// Drop events at or before `cutoff` and return how many remain.
    async fn prune_and_count(&self, key: &str, cutoff: DateTime<Utc>) -> usize;
}

/// Map-backed counter store guarded by an async mutex
#[derive(Default)]
pub struct InMemoryCounterStore {
    entries: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys, post-GC
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn record(&self, key: &str, at: DateTime<Utc>) {
        let mut entries = self.entries.lock().await;
        entries.entry(key.to_string()).or_default().push(at);
    }

    async fn prune_and_count(&self, key: &str, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(events) => {
                events.retain(|at| *at > cutoff);
                let remaining = events.len();
                // Empty windows are garbage collected so abandoned keys
                // don't accumulate across the process lifetime.
                if remaining == 0 {
                    entries.remove(key);
                }
                remaining
            },
            None => 0,
        }
    }
}
