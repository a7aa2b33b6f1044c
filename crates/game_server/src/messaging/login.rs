use async_trait::async_trait;
use super::{composers, HandlerContext};
use habitat_event_system::{
    current_timestamp, DispatchError, PacketFields, PacketHandler, SessionRef,
    UserLoggedInEvent,
};
use habitat_protocol::InboundMessage;
use room_engine::composers as room_composers;
use room_engine::UserData;
use tracing::{info, warn};

/// Binds `user` to the session, or reports a failed login.
async fn complete_login(
    context: &HandlerContext,
    session: &SessionRef,
    user: Option<UserData>,
) -> Result<(), DispatchError> {
    let Some(user) = user else {
        session.send(&room_composers::error("login incorrect"));
        return Ok(());
    };

    let identity = user.identity();
    session.set_identity(identity.clone());
    context.connections.bind_user(session, identity.user_id);
    session.send(&composers::login_ok());
    session.send(&composers::user_object(&identity));
    info!("🔑 {} logged in on {}", identity.username, session.id());

    let event = UserLoggedInEvent {
        session_id: session.id(),
        user_id: identity.user_id,
        username: identity.username.clone(),
        timestamp: current_timestamp(),
    };
    if let Err(e) = context.events.emit_core("user_logged_in", &event).await {
        warn!("⚠️ Failed to emit user_logged_in: {}", e);
    }
    Ok(())
}

/// Username and password login: two fixed strings.
#[derive(Debug)]
pub struct TryLogin(pub HandlerContext);

#[async_trait]
impl PacketHandler for TryLogin {
    fn name(&self) -> &'static str {
        "TRY_LOGIN"
    }

    fn preview(&self, message: &mut InboundMessage) -> PacketFields {
        PacketFields::default().with("username", message.read_fixed_string(self.0.charset))
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        if session.is_authenticated() {
            return Ok(());
        }
        let username = message.read_fixed_string(self.0.charset);
        let password = message.read_fixed_string(self.0.charset);
        let user = self
            .0
            .rooms
            .repositories()
            .users
            .by_credentials(&username, &password)
            .await;
        complete_login(&self.0, session, user).await
    }
}

/// Single sign-on ticket login.
#[derive(Debug)]
pub struct SsoLogin(pub HandlerContext);

#[async_trait]
impl PacketHandler for SsoLogin {
    fn name(&self) -> &'static str {
        "SSO"
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        if session.is_authenticated() {
            return Ok(());
        }
        let ticket = message.read_fixed_string(self.0.charset);
        let user = self.0.rooms.repositories().users.by_ticket(ticket.trim()).await;
        complete_login(&self.0, session, user).await
    }
}

/// Re-sends the user object.
#[derive(Debug)]
pub struct GetInfo;

#[async_trait]
impl PacketHandler for GetInfo {
    fn name(&self) -> &'static str {
        "GET_INFO"
    }

    async fn handle(&self, session: &SessionRef, _message: &mut InboundMessage) -> Result<(), DispatchError> {
        let identity = session.identity().ok_or(DispatchError::NotAuthenticated)?;
        session.send(&composers::user_object(&identity));
        Ok(())
    }
}
