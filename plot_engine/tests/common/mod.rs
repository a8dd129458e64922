#![allow(dead_code)]

use mystery_world::{EntityId, WorldState};

/// The railroad-station cast used across integration tests.
pub struct Cast {
    pub world: WorldState,
    pub alice: EntityId,
    pub bob: EntityId,
    pub carol: EntityId,
    pub dave: EntityId,
    pub station: EntityId,
    pub platform: EntityId,
    pub office: EntityId,
    pub gun: EntityId,
}

/// Alice runs the station and resents Bob; Dave is the detective.
pub fn railroad() -> Cast {
    let mut world = WorldState::new();
    let alice = world.add_character("Alice").unwrap();
    let bob = world.add_character("Bob").unwrap();
    let carol = world.add_character("Carol").unwrap();
    let dave = world.add_character("Dave").unwrap();
    let station = world.add_location("Station").unwrap();
    let platform = world.add_location("Platform").unwrap();
    let office = world.add_location("Office").unwrap();
    let gun = world.add_prop("Gun").unwrap();

    for who in [alice, bob, carol, dave] {
        world.state("_ is alive", &[who]).unwrap();
    }
    world.state("_ is at _", &[alice, station]).unwrap();
    world.state("_ is at _", &[bob, station]).unwrap();
    world.state("_ is at _", &[carol, platform]).unwrap();
    world.state("_ is at _", &[dave, office]).unwrap();
    world.state("_ is at _", &[gun, station]).unwrap();
    world.state("_ is a detective", &[dave]).unwrap();
    world.state("_ is the boss of _", &[alice, bob]).unwrap();
    world.state("_ is upset at _", &[alice, bob]).unwrap();

    Cast {
        world,
        alice,
        bob,
        carol,
        dave,
        station,
        platform,
        office,
        gun,
    }
}
