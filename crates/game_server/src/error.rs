//! Error types and handling for the game server.
//!
//! This module defines the error types that can occur during server operations,
//! providing clear categorization of different failure modes.

/// Enumeration of possible server errors.
///
/// Categorizes errors into network-related and internal server errors
/// to help with debugging and error handling.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or connection issues
    #[error("Network error: {0}")]
    Network(String),

    /// Internal server errors such as event system failures
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<habitat_protocol::ProtocolError> for ServerError {
    fn from(error: habitat_protocol::ProtocolError) -> Self {
        ServerError::Network(error.to_string())
    }
}

impl From<habitat_event_system::EventError> for ServerError {
    fn from(error: habitat_event_system::EventError) -> Self {
        ServerError::Internal(error.to_string())
    }
}

impl From<room_engine::RoomError> for ServerError {
    fn from(error: room_engine::RoomError) -> Self {
        ServerError::Internal(error.to_string())
    }
}
