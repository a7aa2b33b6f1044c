//! # Utility Functions

use crate::dispatch::PacketDispatcher;
use crate::system::EventSystem;
use std::sync::Arc;

/// Current Unix timestamp in seconds. A clock set before the epoch reads as 0.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Creates the lifecycle event bus shared by the server components.
pub fn create_habitat_event_system() -> Arc<EventSystem> {
    Arc::new(EventSystem::new())
}

/// Creates an empty packet dispatcher.
pub fn create_packet_dispatcher() -> Arc<PacketDispatcher> {
    Arc::new(PacketDispatcher::new())
}
