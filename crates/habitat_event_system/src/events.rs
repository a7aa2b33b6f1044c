//! # Lifecycle Events
//!
//! Server infrastructure events emitted through [`EventSystem`](crate::EventSystem)
//! under the `core:` prefix. Packet traffic does not travel through here; it
//! goes through the [`PacketDispatcher`](crate::PacketDispatcher). These events
//! are what business-logic listeners subscribe to when they need to know that
//! a session opened, a user logged in, or a room was loaded.
//!
//! Any `Serialize + DeserializeOwned + Debug` type is an [`Event`] through the
//! blanket implementation, so new events only need the derives.

use crate::types::{DisconnectReason, RoomId, SessionId, UserId};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt::Debug;

/// Core trait that all lifecycle events implement.
pub trait Event: Send + Sync + Any + Debug {
    fn type_name() -> &'static str
    where
        Self: Sized;

    fn serialize(&self) -> Result<Vec<u8>, EventError>;

    fn deserialize(data: &[u8]) -> Result<Self, EventError>
    where
        Self: Sized;

    fn as_any(&self) -> &dyn Any;
}

impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(|e| {
            tracing::error!(
                "🔴 Event serialization failed for type '{}': {}",
                Self::type_name(),
                e
            );
            EventError::Serialization(e)
        })
    }

    fn deserialize(data: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(data).map_err(|e| {
            tracing::error!(
                "🔴 Event deserialization failed for type '{}': {} ({} bytes)",
                Self::type_name(),
                e,
                data.len()
            );
            EventError::Deserialization(e)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Type-erased handler stored by the event system.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static + Debug {
    async fn handle(&self, data: &[u8]) -> Result<(), EventError>;

    fn expected_type_id(&self) -> TypeId;

    fn handler_name(&self) -> &str;
}

/// Bridges a typed closure to [`EventHandler`].
pub struct TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    handler: F,
    name: String,
    _phantom: std::marker::PhantomData<T>,
}

impl<T, F> Debug for TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedEventHandler")
            .field("name", &self.name)
            .finish()
    }
}

impl<T, F> TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    pub fn new(name: String, handler: F) -> Self {
        Self {
            handler,
            name,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> EventHandler for TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
{
    async fn handle(&self, data: &[u8]) -> Result<(), EventError> {
        match T::deserialize(data) {
            Ok(event) => (self.handler)(event),
            Err(e) => {
                // A type mismatch skips this handler rather than failing the emit.
                tracing::warn!(
                    "🟡 Handler '{}' expects '{}' and could not decode the payload: {}",
                    self.name,
                    std::any::type_name::<T>(),
                    e
                );
                Ok(())
            }
        }
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// Emitted when a connection is accepted, before any packet is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOpenedEvent {
    pub session_id: SessionId,
    pub remote_addr: String,
    pub timestamp: u64,
}

/// Emitted once per session, after teardown released its room claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClosedEvent {
    pub session_id: SessionId,
    pub user_id: Option<UserId>,
    pub reason: DisconnectReason,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLoggedInEvent {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub username: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomLoadedEvent {
    pub room_id: RoomId,
    pub furniture_count: usize,
    pub bot_count: usize,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUnloadedEvent {
    pub room_id: RoomId,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnteredRoomEvent {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub virtual_id: u32,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLeftRoomEvent {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub timestamp: u64,
}

/// Errors raised while registering or emitting lifecycle events.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
}
