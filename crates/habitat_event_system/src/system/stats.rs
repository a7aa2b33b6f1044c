/// Statistics tracking for the lifecycle event bus
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventSystemStats {
    /// Total number of registered handlers across all event keys
    pub total_handlers: usize,
    /// Events emitted since start, with or without listeners
    pub events_emitted: u64,
    /// Handler invocations that returned an error
    pub handler_failures: u64,
}
