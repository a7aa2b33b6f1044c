//! # Game Server
//!
//! The network side of the Habitat server: it accepts TCP clients, frames
//! their byte streams into packets, dispatches each packet to its handler
//! and drives the room tick scheduler.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Connection Manager** - session registry and the user to session map
//! * **Packet Dispatcher** - header to handler routing with cancellable events
//! * **Room Manager** - loaded rooms, shared with every packet handler
//! * **Security Manager** - bans, per-IP caps, frame size and rate limits
//!
//! ### Message Flow
//!
//! 1. The read task decodes one frame from the socket
//! 2. It waits for a worker pool permit and dispatches the frame
//! 3. The handler locks the room it acts on and mutates it
//! 4. Replies are queued on sessions without blocking and written by each
//!    session's write task
//!
//! A session's frames are handled strictly in arrival order; different
//! sessions progress concurrently up to `worker_pool_size` packets at once.
//!
//! ### Observing packets
//!
//! Business logic outside the engine hooks in through the dispatcher:
//!
//! ```rust
//! # use game_server::create_server;
//! # use room_engine::{MemoryStore, Repositories, WorldFixture};
//! # use std::sync::Arc;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let store = Arc::new(MemoryStore::new(WorldFixture::demo()?));
//! let server = create_server(Repositories::from_store(store)).await?;
//! server.dispatcher().observe(52, |event| {
//!     if event.fields().text("message") == Some("forbidden") {
//!         event.cancel();
//!     }
//! });
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The server uses structured error types ([`ServerError`]) to categorize failures:
//!
//! * **Network errors** - binding and socket failures
//! * **Internal errors** - event system and room engine failures
//!
//! Errors inside a packet handler never reach the connection; the
//! dispatcher logs them and drops the packet.

pub use config::{RoomConfig, SecurityConfig, ServerConfig};
pub use connection::ConnectionManager;
pub use error::ServerError;
pub use server::GameServer;
pub use utils::{create_server, create_server_with_config};

pub mod config;
pub mod connection;
pub mod error;
pub mod security;
pub mod server;
pub mod utils;

mod messaging;
