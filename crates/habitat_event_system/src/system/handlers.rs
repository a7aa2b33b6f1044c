/// Event handler registration methods
use crate::events::{Event, EventError, EventHandler, TypedEventHandler};
use super::core::EventSystem;
use compact_str::CompactString;
use std::sync::Arc;
use tracing::info;

impl EventSystem {
    /// Registers a handler for a core lifecycle event.
    pub async fn on_core<T, F>(&self, event_name: &str, handler: F) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let event_key = CompactString::new_inline("core:") + event_name;
        self.register_typed_handler(event_key, event_name, handler)
            .await
    }

    async fn register_typed_handler<T, F>(
        &self,
        event_key: CompactString,
        event_name: &str,
        handler: F,
    ) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let handler_name = format!("{event_key}::{}", T::type_name());
        let typed: Arc<dyn EventHandler> =
            Arc::new(TypedEventHandler::new(handler_name, handler));

        self.handlers
            .entry(event_key.clone())
            .or_default()
            .push(typed);

        let mut stats = self.stats.write().await;
        stats.total_handlers += 1;

        info!("📝 Registered handler for {} ({})", event_key, event_name);
        Ok(())
    }
}
