/// Spring engine.
///
/// A spring is a straight run of `~` cells anchored on a wall at one end.
/// `cells[0]` is the free end; `compress_dir` points from the free end
/// toward the anchoring wall.
///
/// ## Player ↔ spring state machine
///
/// ┌──────────────┬────────────────────────────────┬──────────────────────────┐
/// │ State         │ Input / event                   │ Effect                   │
/// ├──────────────┼────────────────────────────────┼──────────────────────────┤
/// │ free          │ step onto cells[0] in compress  │ engage, hide cells[0]    │
/// │ free          │ step onto any other spring cell │ blocked                  │
/// │ engaged(k)    │ heading == compress, k < len    │ step, hide cells[k], k+1 │
/// │ engaged(len)  │ heading == compress             │ blocked, heading = Stay  │
/// │ engaged(k)    │ any other heading, or Stay      │ release → boost(k, k²)   │
/// │ engaged(k)    │ another player engages          │ release → boost(k, k²)   │
/// │ engaged(k)    │ hit by a boosted player         │ release, no launch       │
/// └──────────────┴────────────────────────────────┴──────────────────────────┘
///
/// Releasing restores the hidden cells.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::domain::entity::{Boost, Dir, PlayerId, Pos, RoomId, SpringContact, SpringId};
use crate::domain::room::{shift, Room, ROOM_H, ROOM_W};
use crate::domain::rules;
use crate::domain::tile::Tile;

use super::event::GameEvent;
use super::world::WorldState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spring {
    pub id: SpringId,
    /// Free end first, wall end last.
    pub cells: Vec<Pos>,
    pub compress_dir: Dir,
}

impl Spring {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ══════════════════════════════════════════════════════════════
// Discovery (load time)
// ══════════════════════════════════════════════════════════════

/// Find every spring in `room`. Horizontal runs of two or more cells are
/// taken first, then vertical runs from what is left; a run is anchored at
/// whichever end touches a wall. Unanchored cells are reported and left as
/// inert spring tiles.
pub fn discover(room: &Room, room_id: RoomId, first_id: SpringId) -> Vec<Spring> {
    let is_spring = |x: usize, y: usize| room.tile_at(x, y) == Tile::Spring;
    let is_wall = |x: Option<usize>, y: Option<usize>| match (x, y) {
        (Some(x), Some(y)) if x < ROOM_W && y < ROOM_H => room.tile_at(x, y).is_wall(),
        _ => false,
    };
    let mut taken: BTreeSet<(usize, usize)> = BTreeSet::new();
    let mut springs = Vec::new();

    // Horizontal runs
    for y in 0..ROOM_H {
        let mut x = 0;
        while x < ROOM_W {
            if !is_spring(x, y) {
                x += 1;
                continue;
            }
            let start = x;
            while x < ROOM_W && is_spring(x, y) {
                x += 1;
            }
            let end = x - 1;
            if end == start {
                continue;
            }
            let dir = if is_wall(Some(end + 1), Some(y)) {
                Dir::Right
            } else if is_wall(start.checked_sub(1), Some(y)) {
                Dir::Left
            } else {
                continue;
            };
            let mut cells: Vec<Pos> = (start..=end).map(|cx| Pos::new(room_id, cx, y)).collect();
            if dir == Dir::Left {
                cells.reverse();
            }
            taken.extend(cells.iter().map(|c| (c.x, c.y)));
            springs.push(Spring { id: first_id + springs.len(), cells, compress_dir: dir });
        }
    }

    // Vertical runs (including single cells)
    for x in 0..ROOM_W {
        let mut y = 0;
        while y < ROOM_H {
            if !is_spring(x, y) || taken.contains(&(x, y)) {
                y += 1;
                continue;
            }
            let start = y;
            while y < ROOM_H && is_spring(x, y) && !taken.contains(&(x, y)) {
                y += 1;
            }
            let end = y - 1;
            let dir = if is_wall(Some(x), Some(end + 1)) {
                Dir::Down
            } else if is_wall(Some(x), start.checked_sub(1)) {
                Dir::Up
            } else if start == end && is_wall(Some(x + 1), Some(y - 1)) {
                Dir::Right
            } else if start == end && is_wall(x.checked_sub(1), Some(y - 1)) {
                Dir::Left
            } else {
                warn!(room = %room.name, x, y = start, "spring without an anchoring wall, ignored");
                continue;
            };
            let mut cells: Vec<Pos> = (start..=end).map(|cy| Pos::new(room_id, x, cy)).collect();
            if dir == Dir::Up {
                cells.reverse();
            }
            taken.extend(cells.iter().map(|c| (c.x, c.y)));
            springs.push(Spring { id: first_id + springs.len(), cells, compress_dir: dir });
        }
    }

    springs
}

// ══════════════════════════════════════════════════════════════
// Runtime
// ══════════════════════════════════════════════════════════════

/// Player `pid` steps onto the free end of spring `sid`. Anyone already on
/// the spring is released (and launched) first.
pub fn engage(world: &mut WorldState, pid: PlayerId, sid: SpringId, events: &mut Vec<GameEvent>) {
    let holder = world
        .players
        .iter()
        .find(|p| p.id != pid && p.spring.map(|c| c.spring) == Some(sid))
        .map(|p| p.id);
    if let Some(other) = holder {
        release(world, other, events);
    }
    let entry = world.springs[sid].cells[0];
    world.players[pid].pos = entry;
    world.players[pid].spring = Some(SpringContact { spring: sid, compressed: 1 });
    world.players[pid].boost = None;
    world.set_tile(entry, Tile::Empty);
    debug!(player = pid, spring = sid, "spring engaged");
}

/// One step deeper into the engaged spring. Returns false when fully
/// compressed or the next cell is taken.
pub fn compress(world: &mut WorldState, pid: PlayerId) -> bool {
    let contact = match world.players[pid].spring {
        Some(c) => c,
        None => return false,
    };
    let spring = &world.springs[contact.spring];
    if contact.compressed >= spring.len() {
        return false;
    }
    let next = spring.cells[contact.compressed];
    let here = world.players[pid].pos;
    if shift(&world.graph, here, spring.compress_dir, 0) != Some(next) || world.player_at(next).is_some() {
        return false;
    }
    world.players[pid].pos = next;
    world.players[pid].spring = Some(SpringContact { spring: contact.spring, compressed: contact.compressed + 1 });
    world.set_tile(next, Tile::Empty);
    true
}

/// Let go of the spring: restore hidden cells and launch outward with
/// speed `k` for `k²` ticks.
pub fn release(world: &mut WorldState, pid: PlayerId, events: &mut Vec<GameEvent>) {
    let contact = match restore(world, pid) {
        Some(c) => c,
        None => return,
    };
    let (speed, ticks) = rules::launch(contact.compressed);
    let dir = world.springs[contact.spring].compress_dir.opposite();
    let player = &mut world.players[pid];
    player.boost = Some(Boost { speed, remaining: ticks, dir, origin: Some(contact.spring) });
    player.dir = Dir::Stay;
    debug!(player = pid, speed, ticks, "spring released");
    events.push(GameEvent::SpringReleased { player: pid, speed, ticks });
}

/// Drop the spring contact without launching.
pub fn release_without_launch(world: &mut WorldState, pid: PlayerId) {
    restore(world, pid);
}

fn restore(world: &mut WorldState, pid: PlayerId) -> Option<SpringContact> {
    let contact = world.players[pid].spring.take()?;
    let cells: Vec<Pos> = world.springs[contact.spring].cells.iter().take(contact.compressed).copied().collect();
    for c in cells {
        world.set_tile(c, Tile::Spring);
    }
    Some(contact)
}
