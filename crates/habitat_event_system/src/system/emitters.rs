/// Event emission methods
use crate::events::{Event, EventError};
use super::core::EventSystem;
use compact_str::CompactString;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{error, trace};

impl EventSystem {
    /// Emits a core lifecycle event to all registered handlers.
    #[inline]
    pub async fn emit_core<T>(&self, event_name: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let event_key = CompactString::new_inline("core:") + event_name;
        self.emit_event(&event_key, event).await
    }

    async fn emit_event<T>(&self, event_key: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let data: Arc<[u8]> = event.serialize()?.into();

        // Clone the handler list out so no DashMap guard is held across awaits.
        let event_handlers = self
            .handlers
            .get(event_key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let mut failures = 0u64;
        if !event_handlers.is_empty() {
            trace!("📤 Emitting {} to {} handlers", event_key, event_handlers.len());

            let mut futures = FuturesUnordered::new();
            for handler in event_handlers.iter() {
                let data = data.clone();
                let handler = handler.clone();
                futures.push(async move {
                    let result = handler.handle(&data).await;
                    if let Err(e) = &result {
                        error!("❌ Handler {} failed: {}", handler.handler_name(), e);
                    }
                    result.is_err()
                });
            }

            while let Some(failed) = futures.next().await {
                if failed {
                    failures += 1;
                }
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_emitted += 1;
        stats.handler_failures += failures;
        Ok(())
    }
}
