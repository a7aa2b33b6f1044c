use super::event::PacketFields;
use crate::session::SessionRef;
use async_trait::async_trait;
use habitat_protocol::InboundMessage;

/// Failure raised by a handler body. Logged at the dispatch boundary and
/// never surfaced to the client.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Session is not logged in")]
    NotAuthenticated,

    #[error("Session is not in a room")]
    NotInRoom,

    #[error("Resource unavailable: {0}")]
    Unavailable(String),

    #[error("Handler error: {0}")]
    Handler(String),
}

/// One packet type's behavior.
///
/// The handler's own wire reads in [`handle`](PacketHandler::handle) are the
/// protocol contract. [`preview`](PacketHandler::preview) only exposes a copy
/// of some of those fields to observers.
#[async_trait]
pub trait PacketHandler: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Pre-parses fields for observers. Starts at cursor zero; whatever it
    /// consumes is rewound before the body runs.
    fn preview(&self, _message: &mut InboundMessage) -> PacketFields {
        PacketFields::default()
    }

    async fn handle(
        &self,
        session: &SessionRef,
        message: &mut InboundMessage,
    ) -> Result<(), DispatchError>;
}
