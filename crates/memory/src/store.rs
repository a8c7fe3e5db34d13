//! Keyed conversation store with idle eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::buffer::ConversationBuffer;

/// Identifies one conversation. Requests without a session share the
/// tenant-wide conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryKey {
    pub tenant_id: String,
    pub session_id: Option<String>,
}

impl MemoryKey {
    pub fn new(tenant_id: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            session_id: session_id.filter(|s| !s.trim().is_empty()),
        }
    }
}

struct Entry {
    buffer: ConversationBuffer,
    last_active: Instant,
}

/// All live conversations, guarded by one mutex. Critical sections never
/// await, so a std mutex is enough.
pub struct ConversationStore {
    entries: Mutex<HashMap<MemoryKey, Entry>>,
    capacity: usize,
    idle_timeout: Duration,
}

impl ConversationStore {
    pub fn new(capacity: usize, idle_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            idle_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MemoryKey, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Previous-conversation hint for `key`; empty for unknown keys.
    pub fn summary(&self, key: &MemoryKey) -> String {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.last_active = Instant::now();
                entry.buffer.summarize()
            }
            None => String::new(),
        }
    }

    /// Record a finalized answer, creating the conversation on first write.
    /// Returns whether the answer was eligible.
    pub fn record(&self, key: &MemoryKey, answer: &str) -> bool {
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
            buffer: ConversationBuffer::with_capacity(self.capacity),
            last_active: Instant::now(),
        });
        entry.last_active = Instant::now();
        entry.buffer.record_if_eligible(answer)
    }

    /// Drop conversations idle for longer than the timeout. Returns how many
    /// were removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.last_active) <= self.idle_timeout);
        before - entries.len()
    }

    /// Number of live conversations.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Turns held for `key`, oldest first.
    pub fn turns(&self, key: &MemoryKey) -> Vec<String> {
        self.lock()
            .get(key)
            .map(|e| e.buffer.turns().map(String::from).collect())
            .unwrap_or_default()
    }
}

/// Run [`ConversationStore::evict_idle`] every `every` until aborted.
pub fn spawn_reaper(store: Arc<ConversationStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(every_secs = every.as_secs(), "Conversation reaper started");

        loop {
            ticker.tick().await;
            let evicted = store.evict_idle(Instant::now());
            if evicted > 0 {
                debug!(evicted, live = store.len(), "Evicted idle conversations");
            }
        }
    })
}
