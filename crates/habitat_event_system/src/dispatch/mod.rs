//! # Packet Dispatch
//!
//! Resolves a header id to its handler and wraps every invocation in a
//! cancellable [`PacketEvent`]:
//!
//! 1. the cursor is reset and the handler's `preview` pre-parses the fields
//!    observers care about
//! 2. per-header observers run, then global observers; any may cancel
//! 3. cancellation is checked once, before anything mutates
//! 4. the cursor is reset again and the handler body runs from byte zero
//!
//! Handler errors and panics stop at [`PacketDispatcher::dispatch`]. They are
//! logged and the packet is dropped, so the session's read loop never sees
//! them.

mod dispatcher;
mod event;
mod handler;

#[cfg(test)]
mod tests;

pub use dispatcher::{DispatchOutcome, DispatchStats, PacketDispatcher};
pub use event::{FieldValue, PacketEvent, PacketFields};
pub use handler::{DispatchError, PacketHandler};
