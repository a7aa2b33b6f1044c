//! Lifecycle event bus, split the same way as the rest of the crate:
//! storage in `core`, registration in `handlers`, emission in `emitters`.
mod core;
mod emitters;
mod handlers;
mod stats;

pub use self::core::EventSystem;
pub use stats::EventSystemStats;
