use super::*;
use crate::catalog::ItemDefinition;
use crate::geometry::Tile;
use crate::room::{Room, Spawn, STATUS_CARRY};
use crate::test_support::{
    add_user, definition, drain_headers, flat_model, identity, item, session, state, tick_until,
};
use habitat_event_system::UserId;
use habitat_protocol::headers::outgoing;
use std::sync::Arc;

fn ctx(avatar: VirtualId) -> TriggerContext {
    TriggerContext {
        avatar,
        request: 0,
        has_rights: false,
    }
}

fn with_rights(avatar: VirtualId) -> TriggerContext {
    TriggerContext {
        has_rights: true,
        ..ctx(avatar)
    }
}

fn extra(room: &RoomState, id: u32) -> String {
    room.item(ItemId(id)).unwrap().extra_data.clone()
}

fn teleport_definition() -> ItemDefinition {
    let mut teleport = definition(8, InteractionType::Teleport);
    teleport.stack_height = 0.0;
    teleport
}

fn linked(mut furniture: RoomFurniture, partner: u32) -> RoomFurniture {
    furniture.teleport_link = Some(ItemId(partner));
    furniture
}

#[test]
fn gate_cycles_through_its_modes() {
    let mut gate = definition(7, InteractionType::Gate);
    gate.modes = 3;
    let mut room = state(flat_model(6, 6), vec![item(50, gate, 3, 3, 0)]);
    let (keeper, _session, _rx) = add_user(&mut room, 1, "alice");

    let mut seen = Vec::new();
    for _ in 0..4 {
        assert!(trigger(&mut room, ItemId(50), with_rights(keeper)));
        seen.push(extra(&room, 50));
    }
    assert_eq!(seen, ["1", "2", "0", "1"]);
}

#[test]
fn gate_does_not_close_on_someone() {
    let mut gate = definition(7, InteractionType::Gate);
    gate.modes = 3;
    let mut open = item(50, gate, 3, 3, 0);
    open.extra_data = "2".into();
    let mut room = state(flat_model(6, 6), vec![open]);
    let (keeper, _session, _rx) = add_user(&mut room, 1, "alice");

    assert!(room.can_enter(Tile::new(3, 3), Some(keeper)));
    room.force_move(keeper, Tile::new(3, 3), None);

    assert!(!trigger(&mut room, ItemId(50), with_rights(keeper)));
    assert_eq!(extra(&room, 50), "2");

    room.force_move(keeper, Tile::new(0, 0), None);
    assert!(trigger(&mut room, ItemId(50), with_rights(keeper)));
    assert_eq!(extra(&room, 50), "0");
    assert!(!room.can_enter(Tile::new(3, 3), Some(keeper)));
}

#[test]
fn switches_ignore_users_without_rights() {
    let lamp = definition(6, InteractionType::Switch);
    let mut room = state(flat_model(4, 4), vec![item(60, lamp, 1, 0, 0)]);
    let (visitor, _session, mut rx) = add_user(&mut room, 2, "bob");
    drain_headers(&mut rx);

    assert!(!trigger(&mut room, ItemId(60), ctx(visitor)));
    assert_eq!(extra(&room, 60), "0");
    assert!(drain_headers(&mut rx).is_empty());

    assert!(trigger(&mut room, ItemId(60), with_rights(visitor)));
    assert_eq!(extra(&room, 60), "1");
    assert_eq!(drain_headers(&mut rx), vec![outgoing::STUFF_DATA_UPDATE]);
}

#[test]
fn dice_roll_lands_in_range_and_is_saved() {
    let dice = definition(3, InteractionType::Dice);
    let mut room = state(flat_model(5, 5), vec![item(70, dice, 1, 0, 0)]);
    let (player, _session, mut rx) = add_user(&mut room, 1, "alice");
    drain_headers(&mut rx);

    assert!(trigger(&mut room, ItemId(70), ctx(player)));
    assert_eq!(extra(&room, 70), "-1");
    assert!(!trigger(&mut room, ItemId(70), ctx(player)), "already rolling");

    let mut saved = Vec::new();
    for _ in 0..3 {
        saved.extend(room.tick().dirty);
    }

    let value: i32 = extra(&room, 70).parse().unwrap();
    assert!((1..=6).contains(&value));
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].extra_data, value.to_string());
    let headers = drain_headers(&mut rx);
    assert!(headers.contains(&outgoing::DICE_VALUE));
    assert!(headers.contains(&outgoing::STUFF_DATA_UPDATE));
}

#[test]
fn dice_can_be_switched_off_but_not_from_afar() {
    let dice = definition(3, InteractionType::Dice);
    let mut rolled = item(70, dice, 1, 0, 0);
    rolled.extra_data = "5".into();
    let mut room = state(flat_model(8, 8), vec![rolled]);
    let (player, _session, _rx) = add_user(&mut room, 1, "alice");

    let off = TriggerContext {
        request: REQUEST_DEACTIVATE,
        ..ctx(player)
    };
    assert!(trigger(&mut room, ItemId(70), off));
    assert_eq!(extra(&room, 70), "0");

    room.force_move(player, Tile::new(6, 6), None);
    assert!(!trigger(&mut room, ItemId(70), ctx(player)));
}

#[test]
fn wheels_need_rights() {
    let wheel = definition(5, InteractionType::Wheel);
    let mut room = state(flat_model(5, 5), vec![item(80, wheel, 4, 4, 0)]);
    let (player, _session, _rx) = add_user(&mut room, 1, "alice");

    assert!(!trigger(&mut room, ItemId(80), ctx(player)));
    assert!(trigger(&mut room, ItemId(80), with_rights(player)));
    assert_eq!(extra(&room, 80), "-1");
}

#[test]
fn vendor_hands_out_a_drink() {
    let mut fridge = definition(10, InteractionType::Vendor);
    fridge.vend_items = vec!["Water".into(), "Juice".into()];
    let mut room = state(flat_model(5, 5), vec![item(90, fridge, 1, 0, 4)]);
    let (customer, _session, _rx) = add_user(&mut room, 1, "alice");

    assert!(trigger(&mut room, ItemId(90), ctx(customer)));
    assert!(!room.avatar(customer).unwrap().can_walk);
    assert_eq!(extra(&room, 90), "1");

    tick_until(&mut room, 5, |room| room.item(ItemId(90)).unwrap().interacting.is_none());

    let avatar = room.avatar(customer).unwrap();
    let drink = &avatar.statuses.get(STATUS_CARRY).unwrap().value;
    assert!(drink == "Water" || drink == "Juice");
    assert!(avatar.can_walk);
    assert_eq!(extra(&room, 90), "0");
}

#[test]
fn one_way_gate_lets_avatars_through_from_the_front_only() {
    let gate = definition(9, InteractionType::OneWayGate);
    // facing south: enter from (2, 3), leave onto (2, 1)
    let mut room = state(flat_model(5, 5), vec![item(95, gate, 2, 2, 4)]);
    let (walker, _session, _rx) = add_user(&mut room, 1, "alice");

    room.force_move(walker, Tile::new(2, 1), None);
    assert!(!trigger(&mut room, ItemId(95), ctx(walker)));

    room.force_move(walker, Tile::new(2, 3), None);
    assert!(trigger(&mut room, ItemId(95), ctx(walker)));
    assert_eq!(room.avatar(walker).unwrap().tile, Tile::new(2, 2));
    assert_eq!(extra(&room, 95), "1");

    tick_until(&mut room, 5, |room| room.item(ItemId(95)).unwrap().interacting.is_none());
    let avatar = room.avatar(walker).unwrap();
    assert_eq!(avatar.tile, Tile::new(2, 1));
    assert!(avatar.can_walk);
    assert_eq!(extra(&room, 95), "0");
}

#[test]
fn one_way_gate_never_moves_onto_someone() {
    let gate = definition(9, InteractionType::OneWayGate);
    let mut room = state(flat_model(5, 5), vec![item(95, gate, 2, 2, 4)]);
    let (walker, _s1, _rx1) = add_user(&mut room, 1, "alice");
    let (stander, _s2, _rx2) = add_user(&mut room, 2, "bob");

    room.force_move(stander, Tile::new(2, 2), None);
    room.force_move(walker, Tile::new(2, 3), None);
    assert!(!trigger(&mut room, ItemId(95), ctx(walker)));
    assert_eq!(room.avatar(walker).unwrap().tile, Tile::new(2, 3));

    // far side taken: the walker backs out instead of stacking
    room.force_move(stander, Tile::new(2, 1), None);
    assert!(trigger(&mut room, ItemId(95), ctx(walker)));
    tick_until(&mut room, 5, |room| room.item(ItemId(95)).unwrap().interacting.is_none());

    assert_eq!(room.avatar(walker).unwrap().tile, Tile::new(2, 3));
    assert_eq!(room.avatar(stander).unwrap().tile, Tile::new(2, 1));
    assert!(room.avatar(walker).unwrap().can_walk);
}

#[test]
fn teleports_refuse_an_occupied_pad() {
    let mut room = state(
        flat_model(8, 8),
        vec![
            linked(item(1, teleport_definition(), 1, 1, 2), 2),
            linked(item(2, teleport_definition(), 5, 5, 6), 1),
        ],
    );
    let (traveller, _s1, _rx1) = add_user(&mut room, 1, "alice");
    let (stander, _s2, _rx2) = add_user(&mut room, 2, "bob");
    room.force_move(stander, Tile::new(1, 1), None);
    room.force_move(traveller, Tile::new(0, 1), None);

    assert!(!trigger(&mut room, ItemId(1), ctx(traveller)));
    assert_eq!(room.avatar(traveller).unwrap().tile, Tile::new(0, 1));
    assert_eq!(room.item(ItemId(1)).unwrap().interacting, None);
    assert_eq!(extra(&room, 1), "0");
}

#[test]
fn teleports_send_travellers_back_when_the_partner_pad_is_taken() {
    let mut room = state(
        flat_model(8, 8),
        vec![
            linked(item(1, teleport_definition(), 1, 1, 2), 2),
            linked(item(2, teleport_definition(), 5, 5, 6), 1),
        ],
    );
    let (traveller, _s1, _rx1) = add_user(&mut room, 1, "alice");
    let (stander, _s2, _rx2) = add_user(&mut room, 2, "bob");
    room.force_move(traveller, Tile::new(0, 1), None);
    assert!(trigger(&mut room, ItemId(1), ctx(traveller)));

    room.force_move(stander, Tile::new(5, 5), None);
    let released = tick_until(&mut room, 5, |room| {
        room.item(ItemId(1)).unwrap().interacting.is_none()
    });

    assert!(released);
    assert_ne!(room.avatar(traveller).unwrap().tile, Tile::new(5, 5));
    assert_eq!(room.avatar(stander).unwrap().tile, Tile::new(5, 5));
    assert_eq!(room.item(ItemId(2)).unwrap().interacting, None);
    assert_eq!(extra(&room, 1), "0");
    assert!(room.avatar(traveller).unwrap().can_walk);
}

#[test]
fn arrivals_onto_an_occupied_pad_start_at_the_door() {
    let mut room = state(
        flat_model(6, 6),
        vec![linked(item(2, teleport_definition(), 4, 4, 6), 500)],
    );
    let (stander, _s1, _rx1) = add_user(&mut room, 1, "alice");
    room.force_move(stander, Tile::new(4, 4), None);

    let (incoming, _rx2) = session();
    let arrival = room.add_user(incoming, &identity(2, "bob", 1), Spawn::Teleport(ItemId(2)));

    assert_eq!(room.avatar(arrival).unwrap().tile, room.model().door);
    assert!(room.avatar(arrival).unwrap().can_walk);
    assert_eq!(room.item(ItemId(2)).unwrap().interacting, None);
}

#[test]
fn local_teleports_carry_avatars_across_the_room() {
    let mut room = state(
        flat_model(8, 8),
        vec![
            linked(item(1, teleport_definition(), 1, 1, 2), 2),
            linked(item(2, teleport_definition(), 5, 5, 6), 1),
        ],
    );
    let (traveller, _session, _rx) = add_user(&mut room, 1, "alice");
    room.force_move(traveller, Tile::new(0, 1), None);

    assert!(trigger(&mut room, ItemId(1), ctx(traveller)));
    assert_eq!(room.avatar(traveller).unwrap().tile, Tile::new(1, 1));
    assert_eq!(extra(&room, 1), "1");

    let arrived = tick_until(&mut room, 5, |room| {
        room.avatar(traveller).unwrap().tile == Tile::new(5, 5)
    });
    assert!(arrived);
    assert_eq!(extra(&room, 1), "0");
    assert_eq!(extra(&room, 2), "2");
    assert_eq!(room.item(ItemId(2)).unwrap().interacting, Some(traveller));

    // steps out onto the tile the partner faces
    let stepped_out = tick_until(&mut room, 10, |room| {
        room.avatar(traveller).unwrap().tile == Tile::new(4, 5)
    });
    assert!(stepped_out);
    assert_eq!(extra(&room, 2), "0");
    assert!(room.avatar(traveller).unwrap().can_walk);
}

#[test]
fn teleport_to_another_room_hands_off_a_transfer() {
    let mut room = state(
        flat_model(4, 4),
        vec![linked(item(1, teleport_definition(), 1, 1, 2), 500)],
    );
    let (traveller, _session, _rx) = add_user(&mut room, 4, "dora");
    room.force_move(traveller, Tile::new(0, 1), None);
    assert!(trigger(&mut room, ItemId(1), ctx(traveller)));

    let mut transfers = Vec::new();
    for _ in 0..3 {
        transfers.extend(room.tick().transfers);
    }

    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].target_item, ItemId(500));
    assert_eq!(transfers[0].user_id, UserId(4));
    assert_eq!(room.item(ItemId(1)).unwrap().interacting, None);
}

#[test]
fn removing_a_busy_teleport_frees_the_traveller() {
    let mut room = state(
        flat_model(6, 6),
        vec![
            linked(item(1, teleport_definition(), 1, 1, 2), 2),
            linked(item(2, teleport_definition(), 4, 4, 6), 1),
        ],
    );
    let (traveller, _session, _rx) = add_user(&mut room, 1, "alice");
    room.force_move(traveller, Tile::new(0, 1), None);
    assert!(trigger(&mut room, ItemId(1), ctx(traveller)));

    room.remove_item(ItemId(1));

    let avatar = room.avatar(traveller).unwrap();
    assert!(avatar.can_walk);
    assert_eq!(avatar.interacting_item, None);
}

#[test]
fn stored_state_is_normalized_per_type() {
    let mut busy = linked(item(1, teleport_definition(), 1, 1, 2), 2);
    busy.extra_data = "1".into();
    let mut dice = item(2, definition(3, InteractionType::Dice), 3, 3, 0);
    dice.extra_data = "9".into();

    assert_eq!(interactor_for(InteractionType::Teleport).normalize_extra_data(&busy), "0");
    assert_eq!(interactor_for(InteractionType::Dice).normalize_extra_data(&dice), "0");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_teleport_requests_yield_one_claim() {
    let mut initial = state(
        flat_model(6, 6),
        vec![
            linked(item(1, teleport_definition(), 2, 2, 2), 2),
            linked(item(2, teleport_definition(), 5, 5, 6), 1),
        ],
    );
    let (first, _s1, _rx1) = add_user(&mut initial, 1, "alice");
    let (second, _s2, _rx2) = add_user(&mut initial, 2, "bob");
    initial.force_move(first, Tile::new(1, 2), None);
    initial.force_move(second, Tile::new(2, 1), None);
    let room = Arc::new(Room::new(initial));

    let attempts: Vec<_> = [first, second]
        .into_iter()
        .map(|avatar| {
            let room = room.clone();
            tokio::spawn(async move {
                let mut state = room.lock().await;
                trigger(&mut state, ItemId(1), ctx(avatar))
            })
        })
        .collect();

    let mut winners = 0;
    for attempt in attempts {
        if attempt.await.unwrap() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    let state = room.lock().await;
    let holder = state.item(ItemId(1)).unwrap().interacting.unwrap();
    assert_eq!(state.avatar(holder).unwrap().tile, Tile::new(2, 2));
    let other = if holder == first { second } else { first };
    assert!(state.avatar(other).unwrap().can_walk);
}
