/// Core EventSystem storage
use crate::events::EventHandler;
use super::stats::EventSystemStats;
use compact_str::CompactString;
use dashmap::DashMap;
use std::sync::Arc;

/// Routes lifecycle events (`core:session_opened`, `core:room_loaded`, ...)
/// to every handler registered for the key.
///
/// Handlers live in a `DashMap` so registration and emission never contend on
/// a single lock.
pub struct EventSystem {
    pub(super) handlers: DashMap<CompactString, Vec<Arc<dyn EventHandler>>>,
    pub(super) stats: tokio::sync::RwLock<EventSystemStats>,
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("event_keys", &self.handlers.len())
            .finish()
    }
}

impl EventSystem {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            stats: tokio::sync::RwLock::new(EventSystemStats::default()),
        }
    }

    #[inline]
    pub async fn get_stats(&self) -> EventSystemStats {
        self.stats.read().await.clone()
    }

    /// Number of handlers registered under `core:<event_name>`.
    pub fn handler_count(&self, event_name: &str) -> usize {
        let key = CompactString::new_inline("core:") + event_name;
        self.handlers.get(&key).map_or(0, |entry| entry.len())
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}
