/// Door / switch / pressure engine.
///
/// - Special doors open once every required key is inserted and every
///   linked switch is in its wanted state. Opening is permanent. Plain
///   doors vanish when they open; teleport doors stay and carry players.
/// - Switches toggle when stepped on and bounce the player back.
/// - Pressure buttons clear their target cells while occupied and restore
///   them once nobody stands on the button and the target cell is empty
///   with no player on it. Lit bombs are never cleared.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::entity::{Dir, DoorId, Item, PlayerId, Pos};
use crate::domain::room::step_within;
use crate::domain::rules;
use crate::domain::tile::Tile;

use super::event::GameEvent;
use super::world::WorldState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecialDoor {
    pub id: DoorId,
    pub pos: Pos,
    pub required: BTreeSet<char>,
    pub inserted: BTreeSet<char>,
    /// (switch cell, wanted state)
    pub switches: Vec<(Pos, bool)>,
    pub teleport: Option<Pos>,
    pub open: bool,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum KeyRejected {
    #[error("door does not take key {0}")]
    NotRequired(char),
    #[error("key {0} already inserted")]
    AlreadyInserted(char),
    #[error("door is already open")]
    AlreadyOpen,
}

impl SpecialDoor {
    pub fn new(id: DoorId, pos: Pos) -> Self {
        SpecialDoor {
            id,
            pos,
            required: BTreeSet::new(),
            inserted: BTreeSet::new(),
            switches: vec![],
            teleport: None,
            open: false,
        }
    }

    /// Insert one key. Rejections leave the door untouched.
    pub fn insert_key(&mut self, key: char) -> Result<(), KeyRejected> {
        if self.open {
            return Err(KeyRejected::AlreadyOpen);
        }
        if !self.required.contains(&key) {
            return Err(KeyRejected::NotRequired(key));
        }
        if !self.inserted.insert(key) {
            return Err(KeyRejected::AlreadyInserted(key));
        }
        Ok(())
    }

    pub fn wants_key(&self, key: char) -> bool {
        !self.open && self.required.contains(&key) && !self.inserted.contains(&key)
    }
}

fn switches_match(world: &WorldState, door: &SpecialDoor) -> bool {
    door.switches.iter().all(|&(pos, wanted)| match world.terrain_at(pos) {
        Tile::Switch { on } => on == wanted,
        _ => false,
    })
}

// ── Special doors ──

/// Try the carried key on door `id`. Consumes the key on success.
pub fn try_insert(world: &mut WorldState, pid: PlayerId, id: DoorId, events: &mut Vec<GameEvent>) -> bool {
    let key = match world.players[pid].item {
        Some(Item::Key(k)) => k,
        _ => return false,
    };
    match world.doors[id].insert_key(key) {
        Ok(()) => {
            world.players[pid].item = None;
            debug!(player = pid, door = id, key = %key, "key inserted");
            events.push(GameEvent::KeyInserted { player: pid, door: id, key });
            true
        }
        Err(e) => {
            debug!(player = pid, door = id, "key rejected: {e}");
            false
        }
    }
}

/// Insert the carried key into any adjacent closed door that wants it.
pub fn auto_insert(world: &mut WorldState, pid: PlayerId, events: &mut Vec<GameEvent>) {
    let here = world.players[pid].pos;
    for dir in Dir::CARDINALS {
        let Some(key) = (match world.players[pid].item {
            Some(Item::Key(k)) => Some(k),
            _ => None,
        }) else {
            return;
        };
        let Some(n) = step_within(here, dir) else { continue };
        if let Some(id) = world.door_at(n) {
            if world.doors[id].wants_key(key) {
                try_insert(world, pid, id, events);
            }
        }
    }
}

/// Re-evaluate every closed door. Newly opened plain doors leave the grid.
pub fn evaluate(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for id in 0..world.doors.len() {
        let door = &world.doors[id];
        if door.open {
            continue;
        }
        if !rules::door_opens(&door.required, &door.inserted, switches_match(world, door)) {
            continue;
        }
        let pos = door.pos;
        let teleports = door.teleport.is_some();
        world.doors[id].open = true;
        if !teleports {
            world.set_tile(pos, Tile::Empty);
            if let Some(room) = world.rooms.get_mut(pos.room) {
                room.door_index.remove(&(pos.x, pos.y));
            }
        }
        info!(door = id, room = pos.room, x = pos.x, y = pos.y, teleports, "door opened");
        events.push(GameEvent::DoorOpened { door: id, pos });
    }
}

/// Carry a player standing on an open teleport door to its target, if the
/// target is free.
pub fn teleport(world: &mut WorldState, pid: PlayerId, events: &mut Vec<GameEvent>) {
    let here = world.players[pid].pos;
    let Some(id) = world.door_at(here) else { return };
    let door = &world.doors[id];
    let Some(target) = door.teleport.filter(|_| door.open) else { return };
    if world.player_at(target).is_some() || !world.terrain_at(target).is_walkable() {
        debug!(player = pid, door = id, "teleport target blocked");
        return;
    }
    world.players[pid].pos = target;
    world.players[pid].dir = Dir::Stay;
    world.request_redraw();
    events.push(GameEvent::Teleported { player: pid, from: here, to: target });
}

// ── Switches ──

/// Flip the switch at `pos` and bounce the player one cell back along its
/// path when that cell is free.
pub fn toggle_switch(world: &mut WorldState, pid: PlayerId, pos: Pos, dir: Dir, events: &mut Vec<GameEvent>) {
    let on = match world.terrain_at(pos) {
        Tile::Switch { on } => !on,
        _ => return,
    };
    world.set_tile(pos, Tile::Switch { on });
    events.push(GameEvent::SwitchToggled { player: pid, pos, on });

    let here = world.players[pid].pos;
    if let Some(back) = step_within(here, dir.opposite()) {
        if world.terrain_at(back).is_walkable()
            && world.player_at(back).is_none()
            && world.spring_at(back).is_none()
            && world.door_at(back).is_none()
        {
            world.players[pid].pos = back;
        }
    }
    world.players[pid].dir = Dir::Stay;
}

// ── Pressure buttons ──

/// Recompute pressure overrides for every room.
pub fn update_pressure(world: &mut WorldState) -> bool {
    let mut obstacle_touched = false;
    for room_id in 0..world.rooms.len() {
        let mut active: BTreeSet<(usize, usize)> = BTreeSet::new();
        for b in &world.rooms[room_id].buttons {
            if world.player_at(Pos::new(room_id, b.x, b.y)).is_some() {
                active.extend(b.targets.iter().copied());
            }
        }

        for &(x, y) in &active {
            if world.rooms[room_id].overrides.contains_key(&(x, y)) {
                continue;
            }
            let pos = Pos::new(room_id, x, y);
            let original = world.terrain_at(pos);
            // A fused bomb is not terrain; its own countdown owns the cell
            if original == Tile::LitBomb {
                continue;
            }
            obstacle_touched |= original == Tile::Obstacle;
            world.rooms[room_id].overrides.insert((x, y), original);
            world.set_tile(pos, Tile::Empty);
        }

        let released: BTreeMap<(usize, usize), Tile> = world.rooms[room_id]
            .overrides
            .iter()
            .filter(|(cell, _)| !active.contains(*cell))
            .map(|(c, t)| (*c, *t))
            .collect();
        for ((x, y), original) in released {
            let pos = Pos::new(room_id, x, y);
            if world.player_at(pos).is_some() || world.terrain_at(pos) != Tile::Empty {
                continue;
            }
            world.set_tile(pos, original);
            world.rooms[room_id].overrides.remove(&(x, y));
            obstacle_touched |= original == Tile::Obstacle;
        }
    }
    obstacle_touched
}
