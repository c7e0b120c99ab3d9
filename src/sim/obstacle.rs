/// Obstacle engine: component discovery and rigid pushes.
///
/// An obstacle is a 4-connected component of `Tile::Obstacle` cells, where
/// adjacency includes room-wrap edges (see `room::wrap_neighbors`). The
/// canonical component set is rebuilt from the grid by `rescan` after every
/// structural change, so ids are only stable between mutations.

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::domain::entity::{Dir, ObstacleId, Pos};
use crate::domain::room::{shift, wrap_neighbors, OBSTACLE_ENTRY_INSET};
use crate::domain::tile::Tile;

use super::world::WorldState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Obstacle {
    pub id: ObstacleId,
    /// Member cells, sorted.
    pub cells: Vec<Pos>,
}

impl Obstacle {
    pub fn size(&self) -> usize {
        self.cells.len()
    }
}

/// Rebuild every obstacle and every room's obstacle index from the grid.
/// Scan order is rooms ascending, then row-major, so ids are deterministic.
pub fn rescan(world: &mut WorldState) {
    for room in world.rooms.iter_mut() {
        room.obstacle_index.clear();
    }
    world.obstacles.clear();

    for room_id in 0..world.rooms.len() {
        let seeds = world.rooms[room_id].cells_of(Tile::Obstacle);
        for (x, y) in seeds {
            if world.rooms[room_id].obstacle_index.contains_key(&(x, y)) {
                continue;
            }
            let id = world.obstacles.len();
            let cells = flood(world, Pos::new(room_id, x, y));
            for c in &cells {
                world.rooms[c.room].obstacle_index.insert((c.x, c.y), id);
            }
            world.obstacles.push(Obstacle { id, cells });
        }
    }
}

fn flood(world: &WorldState, start: Pos) -> Vec<Pos> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);
    while let Some(c) = queue.pop_front() {
        for n in wrap_neighbors(&world.graph, c, OBSTACLE_ENTRY_INSET) {
            if world.terrain_at(n) == Tile::Obstacle && seen.insert(n) {
                queue.push_back(n);
            }
        }
    }
    seen.into_iter().collect()
}

/// Cells the obstacle would occupy after `speed` single steps in `dir`,
/// or `None` if any member cell is stopped along the way.
///
/// Every intermediate and final cell must be empty floor (or a cell of this
/// same obstacle) with no player, spring or special door on it.
pub fn push_destination(world: &WorldState, id: ObstacleId, dir: Dir, speed: usize) -> Option<Vec<Pos>> {
    let obstacle = world.obstacles.get(id)?;
    let mut cells = obstacle.cells.clone();
    for _ in 0..speed.max(1) {
        let mut next = Vec::with_capacity(cells.len());
        for &c in &cells {
            let n = shift(&world.graph, c, dir, OBSTACLE_ENTRY_INSET)?;
            let own = world.obstacle_at(n) == Some(id);
            let free = world.terrain_at(n) == Tile::Empty
                && world.spring_at(n).is_none()
                && world.door_at(n).is_none();
            if !(own || free) || world.player_at(n).is_some() {
                return None;
            }
            next.push(n);
        }
        cells = next;
    }
    Some(cells)
}

/// Translate obstacle `id` rigidly by `speed` cells in `dir`, all or
/// nothing. Returns whether it moved. Rescans on success.
pub fn push(world: &mut WorldState, id: ObstacleId, dir: Dir, speed: usize) -> bool {
    let dest = match push_destination(world, id, dir, speed) {
        Some(d) => d,
        None => {
            debug!(obstacle = id, ?dir, "push blocked");
            return false;
        }
    };
    let old = world.obstacles[id].cells.clone();
    for c in old {
        world.set_tile(c, Tile::Empty);
    }
    for c in dest {
        world.set_tile(c, Tile::Obstacle);
    }
    rescan(world);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::domain::entity::{Player, RoomId};
    use crate::domain::room::{Room, ROOM_H, ROOM_W};

    fn world_with(rooms: &[&[&str]]) -> WorldState {
        let mut w = WorldState::new("t", RulesConfig::default());
        for (i, rows) in rooms.iter().enumerate() {
            let mut tiles = vec![Tile::Empty; ROOM_W * ROOM_H];
            for (y, row) in rows.iter().enumerate() {
                for (x, ch) in row.chars().enumerate() {
                    tiles[y * ROOM_W + x] = Tile::from_glyph(ch).unwrap_or(Tile::Empty);
                }
            }
            w.rooms.push(Room::new(format!("r{i}"), tiles));
        }
        rescan(&mut w);
        w
    }

    fn claimed_once(w: &WorldState) -> bool {
        let mut all: Vec<Pos> = w.obstacles.iter().flat_map(|o| o.cells.clone()).collect();
        let n = all.len();
        all.sort();
        all.dedup();
        all.len() == n
    }

    #[test]
    fn components_are_four_connected() {
        let w = world_with(&[&[
            "**  *",
            " *  *",
            "  *  ",
        ]]);
        assert_eq!(w.obstacles.len(), 3);
        assert_eq!(w.obstacles[0].size(), 3);
        assert_eq!(w.obstacles[1].size(), 2);
        assert_eq!(w.obstacles[2].size(), 1);
        assert!(claimed_once(&w));
    }

    #[test]
    fn push_moves_rigidly() {
        let mut w = world_with(&[&[
            "     ",
            " **  ",
        ]]);
        assert!(push(&mut w, 0, Dir::Right, 1));
        assert_eq!(w.terrain_at(Pos::new(0, 1, 1)), Tile::Empty);
        assert_eq!(w.obstacles[0].cells, vec![Pos::new(0, 2, 1), Pos::new(0, 3, 1)]);
    }

    #[test]
    fn push_is_atomic_when_any_cell_blocked() {
        let mut w = world_with(&[&[
            " *# ",
            " *  ",
        ]]);
        assert!(!push(&mut w, 0, Dir::Right, 1));
        assert_eq!(w.obstacles[0].cells, vec![Pos::new(0, 1, 0), Pos::new(0, 1, 1)]);
    }

    #[test]
    fn player_in_path_blocks() {
        let mut w = world_with(&[&[" *  "]]);
        w.players.push(Player::new(0, Pos::new(0, 3, 0)));
        assert!(!push(&mut w, 0, Dir::Right, 3));
        assert!(push(&mut w, 0, Dir::Right, 1));
    }

    #[test]
    fn boosted_push_checks_intermediate_cells() {
        let mut w = world_with(&[&[" * #  "]]);
        assert!(!push(&mut w, 0, Dir::Right, 3));
        assert!(push(&mut w, 0, Dir::Right, 1));
        assert_eq!(w.obstacles[0].cells, vec![Pos::new(0, 2, 0)]);
    }

    #[test]
    fn push_across_room_edge_lands_inset_and_stays_one_component() {
        let right_edge = format!("{}**", " ".repeat(ROOM_W - 2));
        let mut w = world_with(&[&[right_edge.as_str()], &[""]]);
        w.graph.link(0, Dir::Right, 1 as RoomId).unwrap();
        rescan(&mut w);
        assert!(push(&mut w, 0, Dir::Right, 1));
        assert_eq!(w.obstacles.len(), 1);
        assert_eq!(
            w.obstacles[0].cells,
            vec![Pos::new(0, ROOM_W - 1, 0), Pos::new(1, OBSTACLE_ENTRY_INSET, 0)]
        );
        assert!(push(&mut w, 0, Dir::Right, 1));
        assert_eq!(
            w.obstacles[0].cells,
            vec![Pos::new(1, OBSTACLE_ENTRY_INSET, 0), Pos::new(1, OBSTACLE_ENTRY_INSET + 1, 0)]
        );
        assert!(claimed_once(&w));
    }

    #[test]
    fn push_into_unlinked_edge_fails() {
        let right_edge = format!("{}*", " ".repeat(ROOM_W - 1));
        let mut w = world_with(&[&[right_edge.as_str()]]);
        assert!(!push(&mut w, 0, Dir::Right, 1));
    }

    #[test]
    fn push_merges_with_neighbour() {
        let mut w = world_with(&[&["*  *"]]);
        assert_eq!(w.obstacles.len(), 2);
        assert!(push(&mut w, 0, Dir::Right, 2));
        assert_eq!(w.obstacles.len(), 1);
        assert_eq!(w.obstacles[0].size(), 2);
        assert!(claimed_once(&w));
    }
}
