/// Rooms and the room graph.
///
/// A room is one fixed 80×25 screen. Rooms own their mutable grid plus
/// per-room spatial indexes keyed by `(x, y)`; the entities those indexes
/// point at (obstacles, springs, special doors) live in world-level arenas.
///
/// ## Edge crossing
///
/// A step past the grid edge continues in the room linked in that direction,
/// entering `inset` cells from the opposite edge:
///
/// ┌────────────┬───────┬──────────────────────────────┐
/// │ Mover       │ inset │ leaving x=79 to the right     │
/// ├────────────┼───────┼──────────────────────────────┤
/// │ Player      │ 0     │ arrives at x=0                │
/// │ Obstacle    │ 3     │ arrives at x=3                │
/// │ (no link)   │ -     │ out of bounds, blocked        │
/// └────────────┴───────┴──────────────────────────────┘

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::entity::{Dir, DoorId, ObstacleId, Pos, RoomId, SpringId};
use super::tile::Tile;

pub const ROOM_W: usize = 80;
pub const ROOM_H: usize = 25;

/// Obstacle cells pushed across an edge re-enter this far from it.
pub const OBSTACLE_ENTRY_INSET: usize = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Rect {
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }
}

/// Clears its target cells while any player stands on `(x, y)`.
#[derive(Clone, Debug)]
pub struct PressureButton {
    pub x: usize,
    pub y: usize,
    pub targets: Vec<(usize, usize)>,
}

#[derive(Clone, Debug)]
pub struct Room {
    pub name: String,
    tiles: Vec<Tile>,
    pub dark_zones: Vec<Rect>,
    pub buttons: Vec<PressureButton>,
    pub obstacle_index: HashMap<(usize, usize), ObstacleId>,
    pub spring_index: HashMap<(usize, usize), SpringId>,
    pub door_index: HashMap<(usize, usize), DoorId>,
    /// Cells currently cleared by a pressure button, with the tile to restore.
    pub overrides: BTreeMap<(usize, usize), Tile>,
}

impl Room {
    /// `tiles` must hold exactly `ROOM_W * ROOM_H` cells, row-major.
    pub fn new(name: impl Into<String>, tiles: Vec<Tile>) -> Self {
        debug_assert_eq!(tiles.len(), ROOM_W * ROOM_H);
        Room {
            name: name.into(),
            tiles,
            dark_zones: vec![],
            buttons: vec![],
            obstacle_index: HashMap::new(),
            spring_index: HashMap::new(),
            door_index: HashMap::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Out of bounds reads as wall.
    #[inline]
    pub fn tile_at(&self, x: usize, y: usize) -> Tile {
        if x < ROOM_W && y < ROOM_H {
            self.tiles[y * ROOM_W + x]
        } else {
            Tile::Wall
        }
    }

    #[inline]
    pub fn set_tile(&mut self, x: usize, y: usize, tile: Tile) {
        if x < ROOM_W && y < ROOM_H {
            self.tiles[y * ROOM_W + x] = tile;
        }
    }

    pub fn in_dark_zone(&self, x: usize, y: usize) -> bool {
        self.dark_zones.iter().any(|r| r.contains(x, y))
    }

    /// All `(x, y)` holding `tile`, row-major.
    pub fn cells_of(&self, tile: Tile) -> Vec<(usize, usize)> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == tile)
            .map(|(i, _)| (i % ROOM_W, i / ROOM_W))
            .collect()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("room {room} already has an exit to the {dir:?}")]
    DuplicateEdge { room: RoomId, dir: Dir },
    #[error("rooms cannot link through Stay")]
    NotCardinal,
}

/// Directed `(room, direction) → room` adjacency. Built once, read-only after.
#[derive(Clone, Debug, Default)]
pub struct RoomGraph {
    edges: HashMap<(RoomId, Dir), RoomId>,
    /// `(to, dir)` → every `from` whose `dir` exit leads to `to`.
    incoming: HashMap<(RoomId, Dir), Vec<RoomId>>,
}

impl RoomGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&mut self, from: RoomId, dir: Dir, to: RoomId) -> Result<(), GraphError> {
        if dir == Dir::Stay {
            return Err(GraphError::NotCardinal);
        }
        if self.edges.contains_key(&(from, dir)) {
            return Err(GraphError::DuplicateEdge { room: from, dir });
        }
        self.edges.insert((from, dir), to);
        let sources = self.incoming.entry((to, dir)).or_default();
        sources.push(from);
        sources.sort_unstable();
        Ok(())
    }

    pub fn neighbor(&self, room: RoomId, dir: Dir) -> Option<RoomId> {
        self.edges.get(&(room, dir)).copied()
    }

    /// Rooms whose `dir` exit leads into `room`, ascending.
    pub fn sources(&self, room: RoomId, dir: Dir) -> &[RoomId] {
        self.incoming.get(&(room, dir)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

// ── Geometry ──

/// One step from `pos` in `dir`. Crossing an edge lands `inset` cells from
/// the opposite edge of the linked room; no link means out of bounds.
pub fn shift(graph: &RoomGraph, pos: Pos, dir: Dir, inset: usize) -> Option<Pos> {
    let (dx, dy) = dir.delta();
    let nx = pos.x as i64 + dx as i64;
    let ny = pos.y as i64 + dy as i64;
    if nx >= 0 && ny >= 0 && (nx as usize) < ROOM_W && (ny as usize) < ROOM_H {
        return Some(Pos::new(pos.room, nx as usize, ny as usize));
    }
    let room = graph.neighbor(pos.room, dir)?;
    let p = match dir {
        Dir::Right => Pos::new(room, inset, pos.y),
        Dir::Left => Pos::new(room, ROOM_W - 1 - inset, pos.y),
        Dir::Down => Pos::new(room, pos.x, inset),
        Dir::Up => Pos::new(room, pos.x, ROOM_H - 1 - inset),
        Dir::Stay => return None,
    };
    Some(p)
}

/// In-room step only; `None` at the grid edge.
pub fn step_within(pos: Pos, dir: Dir) -> Option<Pos> {
    let (dx, dy) = dir.delta();
    let nx = pos.x.checked_add_signed(dx as isize)?;
    let ny = pos.y.checked_add_signed(dy as isize)?;
    (nx < ROOM_W && ny < ROOM_H).then(|| Pos::new(pos.room, nx, ny))
}

/// 4-neighbourhood of `pos` including wrap edges, in both directions:
/// the forward edge crossing from `pos`, and the exit-edge cells of every
/// room whose crossing lands on `pos`. Sorted and deduplicated.
pub fn wrap_neighbors(graph: &RoomGraph, pos: Pos, inset: usize) -> Vec<Pos> {
    let mut out = Vec::with_capacity(6);
    for dir in Dir::CARDINALS {
        if let Some(n) = shift(graph, pos, dir, inset) {
            out.push(n);
        }
        let entered = match dir {
            Dir::Right => pos.x == inset,
            Dir::Left => pos.x == ROOM_W - 1 - inset,
            Dir::Down => pos.y == inset,
            Dir::Up => pos.y == ROOM_H - 1 - inset,
            Dir::Stay => false,
        };
        if !entered {
            continue;
        }
        for &src in graph.sources(pos.room, dir) {
            let exit = match dir {
                Dir::Right => Pos::new(src, ROOM_W - 1, pos.y),
                Dir::Left => Pos::new(src, 0, pos.y),
                Dir::Down => Pos::new(src, pos.x, ROOM_H - 1),
                Dir::Up => Pos::new(src, pos.x, 0),
                Dir::Stay => continue,
            };
            out.push(exit);
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}
