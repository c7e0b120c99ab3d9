/// WorldState: the complete snapshot of a running session.
///
/// ## Ownership
///
/// Rooms own their grids and per-room `(x, y)` indexes. Obstacles, springs
/// and special doors live in world-level arenas indexed by id, so a push or a
/// door opening mutates one record that every involved room sees.
///
/// All tile mutations go through `set_tile()`, which also records the cell
/// as dirty for the renderer. `terrain_at()` reads the live grid.
///
/// There is no global state: everything the engines touch is reachable from
/// the `WorldState` created by `level::build_world`.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::RulesConfig;
use crate::domain::darkness;
use crate::domain::entity::{Bomb, Dir, DoorId, ObstacleId, Player, PlayerId, Pos, RoomId, SpringId};
use crate::domain::room::{Room, RoomGraph};
use crate::domain::rules::{DoorView, TargetView};
use crate::domain::tile::Tile;

use super::door::SpecialDoor;
use super::obstacle::Obstacle;
use super::spring::Spring;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    Won,
    Lost,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Riddle {
    pub question: String,
    pub answer: String,
}

#[derive(Debug)]
pub struct WorldState {
    pub level_name: String,

    // ── Map ──
    pub rooms: Vec<Room>,
    pub graph: RoomGraph,
    pub final_room: RoomId,

    // ── Entities / arenas ──
    pub players: Vec<Player>,
    pub obstacles: Vec<Obstacle>,
    pub springs: Vec<Spring>,
    pub doors: Vec<SpecialDoor>,
    pub riddles: BTreeMap<Pos, Riddle>,
    pub bombs: Vec<Bomb>,

    // ── Game tracking ──
    pub hearts: u32,
    pub score: u32,
    pub tick: u64,
    pub phase: Phase,
    pub rules: RulesConfig,

    // ── Render hints, drained once per tick ──
    dirty: BTreeSet<Pos>,
    redraw: bool,
}

// ── Construction ──

impl WorldState {
    pub fn new(level_name: impl Into<String>, rules: RulesConfig) -> Self {
        WorldState {
            level_name: level_name.into(),
            rooms: vec![],
            graph: RoomGraph::new(),
            final_room: 0,
            players: vec![],
            obstacles: vec![],
            springs: vec![],
            doors: vec![],
            riddles: BTreeMap::new(),
            bombs: vec![],
            hearts: rules.hearts,
            score: 0,
            tick: 0,
            phase: Phase::Playing,
            rules,
            dirty: BTreeSet::new(),
            redraw: true,
        }
    }
}

// ── Tile query / mutation API ──

impl WorldState {
    /// Effective terrain at `pos`. Unknown rooms read as wall.
    #[inline]
    pub fn terrain_at(&self, pos: Pos) -> Tile {
        self.rooms
            .get(pos.room)
            .map(|r| r.tile_at(pos.x, pos.y))
            .unwrap_or(Tile::Wall)
    }

    #[inline]
    pub fn set_tile(&mut self, pos: Pos, tile: Tile) {
        if let Some(room) = self.rooms.get_mut(pos.room) {
            if room.tile_at(pos.x, pos.y) != tile {
                room.set_tile(pos.x, pos.y, tile);
                self.dirty.insert(pos);
            }
        }
    }

    pub fn mark_dirty(&mut self, pos: Pos) {
        self.dirty.insert(pos);
    }

    pub fn request_redraw(&mut self) {
        self.redraw = true;
    }

    /// Drain the cells changed since the last call, plus the redraw flag.
    pub fn take_render_hints(&mut self) -> (Vec<Pos>, bool) {
        let dirty = std::mem::take(&mut self.dirty).into_iter().collect();
        let redraw = std::mem::replace(&mut self.redraw, false);
        (dirty, redraw)
    }
}

// ── Spatial lookups ──

impl WorldState {
    pub fn player_at(&self, pos: Pos) -> Option<PlayerId> {
        self.players.iter().find(|p| p.pos == pos).map(|p| p.id)
    }

    pub fn obstacle_at(&self, pos: Pos) -> Option<ObstacleId> {
        self.rooms.get(pos.room)?.obstacle_index.get(&(pos.x, pos.y)).copied()
    }

    pub fn spring_at(&self, pos: Pos) -> Option<SpringId> {
        self.rooms.get(pos.room)?.spring_index.get(&(pos.x, pos.y)).copied()
    }

    pub fn door_at(&self, pos: Pos) -> Option<DoorId> {
        self.rooms.get(pos.room)?.door_index.get(&(pos.x, pos.y)).copied()
    }

    pub fn light_sources(&self, room: RoomId) -> Vec<(usize, usize)> {
        match self.rooms.get(room) {
            Some(r) => darkness::light_sources(r, room, &self.players),
            None => vec![],
        }
    }

    /// Darkness shade of a cell, 0 (lit) to 4.
    pub fn shade_at(&self, pos: Pos) -> u8 {
        match self.rooms.get(pos.room) {
            Some(r) => darkness::shade_at(r, pos.x, pos.y, &self.light_sources(pos.room)),
            None => darkness::PITCH_BLACK,
        }
    }

    /// Resolver snapshot of `pos` as seen by `mover`. Cells of `passable`
    /// (a boosted player's launching spring) are reported as plain floor.
    pub fn target_view(&self, mover: PlayerId, pos: Pos, passable: Option<SpringId>) -> TargetView {
        let has_torch = self.players.get(mover).map(Player::has_torch).unwrap_or(false);
        let light_ok = match self.rooms.get(pos.room) {
            Some(r) => darkness::can_enter(r, pos.x, pos.y, &self.light_sources(pos.room), has_torch),
            None => false,
        };
        let spring = self.spring_at(pos).filter(|s| Some(*s) != passable);
        let mut tile = self.terrain_at(pos);
        if spring.is_none() && tile == Tile::Spring && self.spring_at(pos).is_some() {
            tile = Tile::Empty;
        }
        let door = self.door_at(pos).and_then(|id| {
            self.doors.get(id).map(|d| DoorView { id, open: d.open, teleports: d.teleport.is_some() })
        });
        TargetView {
            tile,
            light_ok,
            occupant: self.player_at(pos).filter(|&p| p != mover),
            spring,
            door,
            obstacle: self.obstacle_at(pos),
            riddle: self.riddles.contains_key(&pos),
        }
    }

    /// Heading of every player, indexed by id.
    pub fn headings(&self) -> Vec<Dir> {
        self.players.iter().map(Player::heading).collect()
    }

    pub fn all_in_final_room(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.pos.room == self.final_room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::room::{Rect, ROOM_H, ROOM_W};

    fn one_room_world() -> WorldState {
        let mut w = WorldState::new("t", RulesConfig::default());
        w.rooms.push(Room::new("a", vec![Tile::Empty; ROOM_W * ROOM_H]));
        w.players.push(Player::new(0, Pos::new(0, 1, 1)));
        w
    }

    #[test]
    fn set_tile_records_dirty_only_on_change() {
        let mut w = one_room_world();
        w.take_render_hints();
        w.set_tile(Pos::new(0, 3, 3), Tile::Empty);
        w.set_tile(Pos::new(0, 4, 3), Tile::Wall);
        let (dirty, redraw) = w.take_render_hints();
        assert_eq!(dirty, vec![Pos::new(0, 4, 3)]);
        assert!(!redraw);
    }

    #[test]
    fn unknown_room_reads_as_wall() {
        let w = one_room_world();
        assert_eq!(w.terrain_at(Pos::new(9, 0, 0)), Tile::Wall);
    }

    #[test]
    fn target_view_reports_darkness_and_occupant() {
        let mut w = one_room_world();
        w.players.push(Player::new(1, Pos::new(0, 2, 1)));
        w.rooms[0].dark_zones.push(Rect { x: 10, y: 0, w: 10, h: 10 });
        let v = w.target_view(0, Pos::new(0, 2, 1), None);
        assert_eq!(v.occupant, Some(1));
        assert!(v.light_ok);
        let v = w.target_view(0, Pos::new(0, 15, 5), None);
        assert!(!v.light_ok);
    }
}
