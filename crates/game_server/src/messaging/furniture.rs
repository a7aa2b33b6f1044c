use async_trait::async_trait;
use super::{parse_id, parse_ints, HandlerContext};
use habitat_event_system::{DispatchError, PacketFields, PacketHandler, SessionRef};
use habitat_protocol::{Charset, InboundMessage};
use room_engine::{trigger, ItemId, RoomFurniture, Tile, TriggerContext, REQUEST_DEACTIVATE};
use tracing::{debug, warn};

/// Generic interaction: wired item id, then wired request value.
#[derive(Debug)]
pub struct UseFurniture(pub HandlerContext);

#[async_trait]
impl PacketHandler for UseFurniture {
    fn name(&self) -> &'static str {
        "USE_FURNITURE"
    }

    fn preview(&self, message: &mut InboundMessage) -> PacketFields {
        PacketFields::default().with("item_id", message.read_wired_int32().0)
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let (item, _) = message.read_wired_uint32();
        let (request, _) = message.read_wired_int32();
        let item = ItemId(item);
        self.0
            .with_avatar(session, move |state, avatar, identity| {
                let has_rights = state.has_rights(identity);
                trigger(state, item, TriggerContext { avatar, request, has_rights })
            })
            .await?;
        Ok(())
    }
}

/// Dice packets carry the item id as plain decimal text.
#[derive(Debug)]
pub struct Dice {
    context: HandlerContext,
    request: i32,
}

impl Dice {
    pub fn throw(context: HandlerContext) -> Self {
        Self { context, request: 0 }
    }

    pub fn switch_off(context: HandlerContext) -> Self {
        Self { context, request: REQUEST_DEACTIVATE }
    }
}

#[async_trait]
impl PacketHandler for Dice {
    fn name(&self) -> &'static str {
        if self.request == REQUEST_DEACTIVATE {
            "DICE_OFF"
        } else {
            "THROW_DICE"
        }
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let Some(item) = parse_id(&message.read_remaining_string(Charset::Latin1)) else {
            return Ok(());
        };
        let request = self.request;
        self.context
            .with_avatar(session, move |state, avatar, identity| {
                let has_rights = state.has_rights(identity);
                trigger(state, ItemId(item), TriggerContext { avatar, request, has_rights })
            })
            .await?;
        Ok(())
    }
}

/// Reads `"<id> <x> <y> <rotation>"`.
fn parse_placement(message: &mut InboundMessage) -> Option<(ItemId, Tile, u8)> {
    match parse_ints(&message.read_remaining_string(Charset::Latin1))[..] {
        [id, x, y, rotation, ..] if id > 0 => {
            let id = u32::try_from(id).ok()?;
            let rotation = u8::try_from(rotation.rem_euclid(8)).ok()?;
            Some((ItemId(id), Tile::new(x, y), rotation))
        }
        [id, x, y] if id > 0 => Some((ItemId(u32::try_from(id).ok()?), Tile::new(x, y), 0)),
        _ => None,
    }
}

/// Puts an item from the user's inventory into the current room.
#[derive(Debug)]
pub struct PlaceItem(pub HandlerContext);

#[async_trait]
impl PacketHandler for PlaceItem {
    fn name(&self) -> &'static str {
        "PLACE_ITEM"
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let Some((id, tile, rotation)) = parse_placement(message) else {
            return Ok(());
        };
        let user = session.user_id().ok_or(DispatchError::NotAuthenticated)?;
        let repositories = self.0.rooms.repositories();
        let Some(data) = repositories.furniture.furniture(id).await else {
            return Ok(());
        };
        if data.room_id.is_some() || data.owner_id != user {
            debug!("🚫 {} tried to place item {} it does not hold", session.id(), id);
            return Ok(());
        }
        let Some(definition) = self.0.rooms.catalog().get(data.definition_id) else {
            warn!("⚠️ Item {} has unknown definition {}", id, data.definition_id);
            return Ok(());
        };

        let placed = self
            .0
            .with_avatar(session, move |state, _, identity| {
                if !state.has_rights(identity) {
                    return None;
                }
                let z = state.placement_height(&definition, tile, rotation, None)?;
                let mut item = RoomFurniture::from_data(&data, definition);
                item.tile = tile;
                item.rotation = rotation;
                item.z = z;
                let stored = item.to_data(Some(state.id()));
                state.place_item(item);
                Some(stored)
            })
            .await?
            .flatten();

        if let Some(stored) = placed {
            if !repositories.furniture.save_furniture(&stored).await {
                warn!("⚠️ Failed to save placed item {}", stored.id);
            }
        }
        Ok(())
    }
}

/// Moves or rotates an item already in the room.
#[derive(Debug)]
pub struct MoveItem(pub HandlerContext);

#[async_trait]
impl PacketHandler for MoveItem {
    fn name(&self) -> &'static str {
        "MOVE_ITEM"
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let Some((id, tile, rotation)) = parse_placement(message) else {
            return Ok(());
        };
        self.0
            .with_avatar(session, move |state, _, identity| {
                state.has_rights(identity) && state.relocate_item(id, tile, rotation)
            })
            .await?;
        Ok(())
    }
}

/// Returns an item from the room to its owner's inventory.
#[derive(Debug)]
pub struct PickupItem(pub HandlerContext);

#[async_trait]
impl PacketHandler for PickupItem {
    fn name(&self) -> &'static str {
        "PICKUP_ITEM"
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let body = message.read_remaining_string(Charset::Latin1);
        let Some(id) = body.split_whitespace().last().and_then(parse_id) else {
            return Ok(());
        };
        let removed = self
            .0
            .with_avatar(session, move |state, _, identity| {
                if !state.has_rights(identity) {
                    return None;
                }
                state.remove_item(ItemId(id)).map(|item| item.to_data(None))
            })
            .await?
            .flatten();

        if let Some(stored) = removed {
            if !self.0.rooms.repositories().furniture.save_furniture(&stored).await {
                warn!("⚠️ Failed to save picked up item {}", stored.id);
            }
        }
        Ok(())
    }
}
