use super::*;
use crate::catalog::{InteractionType, ItemFlags};
use crate::interactors::{claim, trigger, TriggerContext};
use crate::test_support::{
    add_user, definition, drain_headers, flat_model, item, model_from, state, tick_until,
    with_flags,
};
use habitat_protocol::headers::outgoing;

fn chair_flags() -> ItemFlags {
    ItemFlags {
        can_sit_on: true,
        ..ItemFlags::default()
    }
}

#[test]
fn walking_converges_on_the_goal() {
    let mut room = state(flat_model(10, 10), Vec::new());
    let (walker, _session, _rx) = add_user(&mut room, 1, "alice");

    assert!(room.walk_to(walker, Tile::new(5, 5)));
    let arrived = tick_until(&mut room, 20, |room| {
        room.avatar(walker).map(|a| a.tile) == Some(Tile::new(5, 5))
    });

    assert!(arrived);
    let avatar = room.avatar(walker).unwrap();
    assert!(!avatar.is_walking());
    assert_eq!(avatar.goal, None);
}

#[test]
fn blocked_goal_ends_next_to_it() {
    let table = definition(1, InteractionType::Default);
    let mut room = state(flat_model(10, 10), vec![item(10, table, 5, 5, 0)]);
    let (walker, _session, _rx) = add_user(&mut room, 1, "alice");

    assert!(room.walk_to(walker, Tile::new(5, 5)));
    tick_until(&mut room, 20, |room| !room.avatar(walker).unwrap().is_walking());

    let tile = room.avatar(walker).unwrap().tile;
    assert_ne!(tile, Tile::new(5, 5));
    assert_eq!(tile.distance(Tile::new(5, 5)), 1.0);
}

#[test]
fn claimed_walkers_stop_where_they_are() {
    let fridge = definition(1, InteractionType::Vendor);
    let mut room = state(flat_model(10, 10), vec![item(30, fridge, 9, 9, 0)]);
    let (walker, _session, _rx) = add_user(&mut room, 1, "alice");

    assert!(room.walk_to(walker, Tile::new(6, 6)));
    room.tick();
    let held_at = room.avatar(walker).unwrap().tile;
    assert_ne!(held_at, room.model().door);
    assert!(room.avatar(walker).unwrap().has_status(STATUS_MOVE));

    assert!(claim(&mut room, ItemId(30), walker));
    room.tick();
    room.tick();

    let avatar = room.avatar(walker).unwrap();
    assert_eq!(avatar.tile, held_at);
    assert!(!avatar.is_walking());
    assert!(!avatar.has_status(STATUS_MOVE));
    assert!(!room.walk_to(walker, Tile::new(6, 6)));
}

#[test]
fn held_walkers_drop_a_queued_path() {
    let mut room = state(flat_model(10, 10), Vec::new());
    let (walker, _session, _rx) = add_user(&mut room, 1, "alice");

    assert!(room.walk_to(walker, Tile::new(6, 6)));
    room.tick();
    let held_at = room.avatar(walker).unwrap().tile;
    room.avatar_mut(walker).unwrap().can_walk = false;
    room.tick();

    let avatar = room.avatar(walker).unwrap();
    assert_eq!(avatar.tile, held_at);
    assert!(!avatar.is_walking());
    assert_eq!(avatar.goal, None);
    assert!(!avatar.has_status(STATUS_MOVE));
}

#[test]
fn walkers_route_around_someone_stepping_into_the_way() {
    let mut room = state(flat_model(10, 10), Vec::new());
    let (walker, _s1, _rx1) = add_user(&mut room, 1, "alice");
    let (blocker, _s2, _rx2) = add_user(&mut room, 2, "bob");
    room.force_move(blocker, Tile::new(9, 0), None);

    assert!(room.walk_to(walker, Tile::new(6, 6)));
    room.tick();
    let next = *room.avatar(walker).unwrap().path.front().unwrap();
    room.force_move(blocker, next, None);
    room.tick();

    let avatar = room.avatar(walker).unwrap();
    assert_ne!(avatar.tile, next);
    assert!(avatar.has_status(STATUS_MOVE));
    let arrived = tick_until(&mut room, 20, |room| {
        room.avatar(walker).map(|a| a.tile) == Some(Tile::new(6, 6))
    });
    assert!(arrived);
    assert_eq!(room.avatar(blocker).unwrap().tile, next);
}

#[test]
fn walkers_halt_when_the_only_way_is_taken() {
    let mut room = state(flat_model(8, 1), Vec::new());
    let (walker, _s1, _rx1) = add_user(&mut room, 1, "alice");
    let (blocker, _s2, _rx2) = add_user(&mut room, 2, "bob");
    room.force_move(blocker, Tile::new(7, 0), None);

    assert!(room.walk_to(walker, Tile::new(6, 0)));
    room.tick();
    assert_eq!(room.avatar(walker).unwrap().tile, Tile::new(1, 0));
    room.force_move(blocker, Tile::new(2, 0), None);
    room.tick();

    let avatar = room.avatar(walker).unwrap();
    assert_eq!(avatar.tile, Tile::new(1, 0));
    assert!(!avatar.is_walking());
    assert_eq!(avatar.goal, None);
    assert!(!avatar.has_status(STATUS_MOVE));
}

#[test]
fn status_updates_carry_only_changed_avatars() {
    let mut room = state(flat_model(6, 6), Vec::new());
    let (turner, _s1, mut rx) = add_user(&mut room, 1, "alice");
    let (_idle, _s2, _rx2) = add_user(&mut room, 2, "bob");
    room.tick();
    assert!(room.avatars().all(|avatar| !avatar.needs_update));
    drain_headers(&mut rx);

    room.tick();
    assert!(!drain_headers(&mut rx).contains(&outgoing::STATUS));

    room.look_to(turner, Tile::new(3, 3));
    assert!(room.avatar(turner).unwrap().needs_update);
    room.tick();

    assert_eq!(drain_headers(&mut rx), vec![outgoing::STATUS]);
    assert!(room.avatars().all(|avatar| !avatar.needs_update));
}

#[test]
fn walking_onto_a_chair_sits_down() {
    let chair = with_flags(definition(1, InteractionType::Default), chair_flags());
    let mut room = state(flat_model(6, 6), vec![item(10, chair, 3, 3, 4)]);
    let (walker, _session, _rx) = add_user(&mut room, 1, "alice");

    assert!(room.walk_to(walker, Tile::new(3, 3)));
    let seated = tick_until(&mut room, 20, |room| {
        room.avatar(walker).unwrap().has_status(STATUS_SIT)
    });

    assert!(seated);
    let avatar = room.avatar(walker).unwrap();
    assert_eq!(avatar.tile, Tile::new(3, 3));
    assert_eq!(avatar.body_rotation, 4);
    assert!(!avatar.has_status(STATUS_MOVE));
}

#[test]
fn seats_are_not_walked_through() {
    let chair = with_flags(definition(1, InteractionType::Default), chair_flags());
    let room = state(flat_model(4, 4), vec![item(10, chair, 1, 1, 0)]);

    assert!(room.can_step(Tile::new(0, 1), Tile::new(1, 1), None, true));
    assert!(!room.can_step(Tile::new(0, 1), Tile::new(1, 1), None, false));
}

#[test]
fn diagonal_steps_need_an_open_corner() {
    let block = definition(1, InteractionType::Default);
    let room = state(
        flat_model(3, 3),
        vec![item(10, block.clone(), 1, 0, 0), item(11, block, 0, 1, 0)],
    );

    assert!(!room.can_step(Tile::new(0, 0), Tile::new(1, 1), None, true));
    assert!(room.can_step(Tile::new(2, 0), Tile::new(1, 1), None, true));
}

#[test]
fn step_height_limits_apply() {
    let room = state(model_from("03\n00", 0, 0), Vec::new());

    assert!(!room.can_step(Tile::new(0, 0), Tile::new(1, 0), None, true));
    assert!(room.can_step(Tile::new(1, 0), Tile::new(0, 0), None, true));
}

#[test]
fn only_other_users_hear_about_a_newcomer() {
    let mut room = state(flat_model(5, 5), Vec::new());
    let (_first, _s1, mut first_rx) = add_user(&mut room, 1, "alice");
    drain_headers(&mut first_rx);

    let (_second, _s2, mut second_rx) = add_user(&mut room, 2, "bob");

    assert!(drain_headers(&mut first_rx).contains(&outgoing::USERS));
    assert!(!drain_headers(&mut second_rx).contains(&outgoing::USERS));
}

#[test]
fn timed_statuses_expire() {
    let mut room = state(flat_model(5, 5), Vec::new());
    let (waver, _session, _rx) = add_user(&mut room, 1, "alice");
    let expires = room.tick_count() + WAVE_TICKS;
    room.avatar_mut(waver)
        .unwrap()
        .set_status(STATUS_WAVE, "", Some(expires));

    for _ in 0..WAVE_TICKS - 1 {
        room.tick();
    }
    assert!(room.avatar(waver).unwrap().has_status(STATUS_WAVE));
    room.tick();
    assert!(!room.avatar(waver).unwrap().has_status(STATUS_WAVE));
}

#[test]
fn furniture_can_be_placed_moved_and_removed() {
    let mut room = state(flat_model(6, 6), Vec::new());
    let (_watcher, _session, mut rx) = add_user(&mut room, 1, "alice");
    drain_headers(&mut rx);
    let block = definition(1, InteractionType::Default);

    room.place_item(item(20, block, 2, 2, 0));
    assert_eq!(room.map().state(Tile::new(2, 2)), TileState::Blocked);

    assert!(room.relocate_item(ItemId(20), Tile::new(4, 4), 2));
    assert_eq!(room.map().state(Tile::new(2, 2)), TileState::Open);
    assert_eq!(room.map().state(Tile::new(4, 4)), TileState::Blocked);
    assert_eq!(room.item(ItemId(20)).unwrap().rotation, 2);

    assert!(room.remove_item(ItemId(20)).is_some());
    assert!(room.item(ItemId(20)).is_none());
    assert_eq!(room.map().state(Tile::new(4, 4)), TileState::Open);

    assert_eq!(
        drain_headers(&mut rx),
        vec![
            outgoing::ACTIVE_OBJECT_ADD,
            outgoing::ACTIVE_OBJECT_UPDATE,
            outgoing::ACTIVE_OBJECT_REMOVE
        ]
    );
}

#[test]
fn solid_furniture_is_not_moved_onto_someone() {
    let block = definition(1, InteractionType::Default);
    let mut room = state(flat_model(6, 6), vec![item(20, block, 3, 3, 0)]);
    let (standing, _session, _rx) = add_user(&mut room, 1, "alice");
    room.force_move(standing, Tile::new(1, 1), None);

    assert!(!room.relocate_item(ItemId(20), Tile::new(1, 1), 0));
    assert_eq!(room.item(ItemId(20)).unwrap().tile, Tile::new(3, 3));
}

#[test]
fn leaving_releases_held_furniture() {
    let mut fridge = definition(1, InteractionType::Vendor);
    fridge.vend_items = vec!["Water".into()];
    let mut room = state(flat_model(6, 6), vec![item(30, fridge, 1, 0, 4)]);
    let (customer, _session, _rx) = add_user(&mut room, 1, "alice");

    let ctx = TriggerContext {
        avatar: customer,
        request: 0,
        has_rights: false,
    };
    assert!(trigger(&mut room, ItemId(30), ctx));
    assert_eq!(room.item(ItemId(30)).unwrap().interacting, Some(customer));

    assert!(room.remove_avatar(customer).is_some());
    assert_eq!(room.item(ItemId(30)).unwrap().interacting, None);
    assert_eq!(room.user_count(), 0);
    assert!(room.empty_for().is_some());
}

#[test]
fn events_end_when_the_host_leaves() {
    let mut room = state(flat_model(5, 5), Vec::new());
    let (host, _s1, _rx1) = add_user(&mut room, 7, "host");
    let (guest, _s2, _rx2) = add_user(&mut room, 8, "guest");
    assert!(room.start_event(UserId(7), "Party", "Bring snacks"));
    assert!(!room.start_event(UserId(8), "Other", ""));

    room.remove_avatar(guest);
    assert!(room.event().is_some());

    room.remove_avatar(host);
    assert!(room.event().is_none());
}

#[test]
fn whispers_reach_only_the_two_parties() {
    let mut room = state(flat_model(5, 5), Vec::new());
    let (speaker, _s1, mut speaker_rx) = add_user(&mut room, 1, "alice");
    let (_target, _s2, mut target_rx) = add_user(&mut room, 2, "bob");
    let (_other, _s3, mut other_rx) = add_user(&mut room, 3, "carol");
    for rx in [&mut speaker_rx, &mut target_rx, &mut other_rx] {
        drain_headers(rx);
    }

    assert!(room.whisper(speaker, "BOB", "psst"));
    assert!(!room.whisper(speaker, "nobody", "hello?"));

    assert_eq!(drain_headers(&mut speaker_rx), vec![outgoing::WHISPER]);
    assert_eq!(drain_headers(&mut target_rx), vec![outgoing::WHISPER]);
    assert!(drain_headers(&mut other_rx).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn room_lock_serializes_handlers_and_ticks() {
    let mut initial = state(flat_model(10, 10), Vec::new());
    let (walker, _session, _rx) = add_user(&mut initial, 1, "alice");
    let room = Arc::new(Room::new(initial));

    let writer = {
        let room = room.clone();
        tokio::spawn(async move {
            for step in 0..200 {
                let mut state = room.lock().await;
                let coordinate = step % 10;
                state.avatar_mut(walker).unwrap().tile.x = coordinate;
                tokio::task::yield_now().await;
                state.avatar_mut(walker).unwrap().tile.y = coordinate;
            }
        })
    };
    let ticker = {
        let room = room.clone();
        tokio::spawn(async move {
            for _ in 0..100 {
                room.lock().await.tick();
                tokio::task::yield_now().await;
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let room = room.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..200 {
                let state = room.lock().await;
                let tile = state.avatar(walker).unwrap().tile;
                assert_eq!(tile.x, tile.y, "observed a half-applied move");
                drop(state);
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.unwrap();
    ticker.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(room.lock().await.tick_count(), 100);
}
