use async_trait::async_trait;
use super::composers;
use habitat_event_system::{DispatchError, PacketHandler, SessionRef};
use habitat_protocol::InboundMessage;

#[derive(Debug)]
pub struct InitCrypto;

#[async_trait]
impl PacketHandler for InitCrypto {
    fn name(&self) -> &'static str {
        "INIT_CRYPTO"
    }

    async fn handle(&self, session: &SessionRef, _message: &mut InboundMessage) -> Result<(), DispatchError> {
        session.send(&composers::crypto_parameters());
        Ok(())
    }
}

#[derive(Debug)]
pub struct GenerateKey;

#[async_trait]
impl PacketHandler for GenerateKey {
    fn name(&self) -> &'static str {
        "GENERATE_KEY"
    }

    async fn handle(&self, session: &SessionRef, _message: &mut InboundMessage) -> Result<(), DispatchError> {
        session.send(&composers::session_parameters());
        Ok(())
    }
}

#[derive(Debug)]
pub struct Pong;

#[async_trait]
impl PacketHandler for Pong {
    fn name(&self) -> &'static str {
        "PONG"
    }

    async fn handle(&self, session: &SessionRef, _message: &mut InboundMessage) -> Result<(), DispatchError> {
        session.record_pong();
        Ok(())
    }
}
