//! # Habitat Event System
//!
//! The seam between the network layer and the game: packets come in through
//! the [`PacketDispatcher`], lifecycle notifications go out through the
//! [`EventSystem`], and both carry a shared [`Session`] handle.
//!
//! ## Components
//!
//! - **Packet dispatch** ([`dispatch`]): header id to handler routing with
//!   cancellable [`PacketEvent`]s and per-packet fault isolation
//! - **Sessions** ([`session`]): identity, current room and the non-blocking
//!   outbound queue of one connection
//! - **Lifecycle events** ([`events`]): `core:` events such as
//!   `session_opened` and `room_loaded`, delivered to typed handlers
//! - **Shutdown** ([`shutdown`]): flags shared by every long-running task
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use habitat_event_system::*;
//!
//! # async fn demo() -> Result<(), EventError> {
//! let events = create_habitat_event_system();
//! events.on_core("session_opened", |event: SessionOpenedEvent| {
//!     println!("{} connected from {}", event.session_id, event.remote_addr);
//!     Ok(())
//! }).await?;
//!
//! let dispatcher = create_packet_dispatcher();
//! dispatcher.observe(52, |event: &PacketEvent| {
//!     if event.fields().text("message") == Some("spam") {
//!         event.cancel();
//!     }
//! });
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod events;
pub mod session;
pub mod shutdown;
pub mod system;
pub mod types;
pub mod utils;

pub use async_trait::async_trait;
pub use dispatch::{
    DispatchError, DispatchOutcome, DispatchStats, FieldValue, PacketDispatcher, PacketEvent,
    PacketFields, PacketHandler,
};
pub use events::{
    Event, EventError, EventHandler, RoomLoadedEvent, RoomUnloadedEvent, SessionClosedEvent,
    SessionOpenedEvent, TypedEventHandler, UserEnteredRoomEvent, UserLeftRoomEvent,
    UserLoggedInEvent,
};
pub use session::{Session, SessionRef};
pub use shutdown::ShutdownState;
pub use system::{EventSystem, EventSystemStats};
pub use types::{DisconnectReason, Identity, RoomId, SessionId, UserId, STAFF_RANK};
pub use utils::{create_habitat_event_system, create_packet_dispatcher, current_timestamp};
