//! Error types for room loading and room-scoped operations.

use habitat_event_system::RoomId;

/// Reasons a room operation was aborted. Every variant means nothing was
/// mutated.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("Room {0} does not exist")]
    NotFound(RoomId),

    #[error("Room model '{0}' does not exist")]
    ModelNotFound(String),

    #[error("Room model '{model}' is invalid: {reason}")]
    InvalidModel { model: String, reason: String },

    #[error("Furniture for room {0} could not be loaded")]
    FurnitureUnavailable(RoomId),

    #[error("Item definitions could not be loaded")]
    CatalogUnavailable,

    #[error("Bots for room {0} could not be loaded")]
    BotsUnavailable(RoomId),

    #[error("Room {0} is full")]
    Full(RoomId),

    #[error("Room {0} was unloaded")]
    Disposed(RoomId),

    #[error("Session has no identity")]
    NotAuthenticated,

    #[error("Session was closed")]
    SessionClosed,

    #[error("Item {0} cannot be placed there")]
    InvalidPlacement(u32),
}

impl RoomError {
    /// Code carried by the `CANT_CONNECT` packet.
    pub fn client_code(&self) -> i32 {
        match self {
            RoomError::Full(_) => 1,
            RoomError::NotAuthenticated => 3,
            _ => 2,
        }
    }
}
