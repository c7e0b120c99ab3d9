/// Movement, push and door rules as truth tables.
///
/// Pure functions over snapshots of world state, with no side effects.
/// These encode "what happens" without performing the action; `sim::step`
/// applies the outcome.
///
/// ## Target Resolution Table
///
/// Evaluated top to bottom against the cell a player is about to enter.
/// The first matching row wins.
///
/// ┌────┬──────────────────────────────────────┬──────────────────┐
/// │ #  │ Condition                             │ Resolution       │
/// ├────┼──────────────────────────────────────┼──────────────────┤
/// │ 1  │ target out of bounds (no link)        │ Blocked          │
/// │ 2  │ dark zone, not lit, mover has no torch│ Blocked          │
/// │ 3  │ another player on target              │ Bump(player)     │
/// │ 4  │ switch                                │ ToggleSwitch     │
/// │ 5  │ spring cell (even if hidden)          │ Spring           │
/// │ 6a │ special door, open, teleports         │ EnterDoor        │
/// │ 6b │ special door, closed                  │ InsertKey        │
/// │ 7  │ obstacle cell                         │ Push             │
/// │ 8  │ door, carried key does not match      │ Blocked          │
/// │ 9  │ door, carried key matches             │ Unlock           │
/// │ 10 │ key/bomb/torch, carry slot empty      │ PickUp           │
/// │ 10'│ key/bomb/torch, carry slot full       │ Walk             │
/// │ 11 │ riddle with metadata                  │ Riddle           │
/// │ 11'│ empty / pressure button / riddle      │ Walk             │
/// │ -  │ anything else solid                   │ Blocked          │
/// └────┴──────────────────────────────────────┴──────────────────┘
///
/// ## Cooperative Force
///
/// force(p, dir) = base(p) + Σ base(q) for every other player q with
///   - q in the same room at Manhattan distance exactly 1 from p
///   - q's tick-start heading == dir
/// base(x) = boost speed while launched, else 1. One hop only: a third
/// player adjacent to q but not to p contributes nothing.
///
/// A push moves an obstacle only if force ≥ obstacle size (cell count).
///
/// ## Special Door
///
/// open ⇔ inserted == required ∧ every (switch, wanted) has state == wanted.
/// Once open, a door never closes.

use std::collections::BTreeSet;

use super::entity::{Dir, DoorId, Item, ObstacleId, Player, PlayerId, SpringId};
use super::tile::Tile;

/// What the resolver sees of a special door.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DoorView {
    pub id: DoorId,
    pub open: bool,
    pub teleports: bool,
}

/// Snapshot of a target cell for resolution.
#[derive(Clone, Copy, Debug)]
pub struct TargetView {
    pub tile: Tile,
    /// Darkness allows this mover in (lit, or mover carries a torch).
    pub light_ok: bool,
    pub occupant: Option<PlayerId>,
    pub spring: Option<SpringId>,
    pub door: Option<DoorView>,
    pub obstacle: Option<ObstacleId>,
    pub riddle: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Resolution {
    Blocked,
    Bump(PlayerId),
    ToggleSwitch,
    Spring(SpringId),
    EnterDoor(DoorId),
    InsertKey(DoorId),
    Push(ObstacleId),
    Unlock,
    PickUp(Item),
    Riddle,
    Walk,
}

/// Resolve a step onto `target` (`None` = out of bounds). See table above.
pub fn resolve_target(target: Option<&TargetView>, carried: Option<Item>) -> Resolution {
    let t = match target {
        Some(t) => t,
        None => return Resolution::Blocked,
    };
    if !t.light_ok {
        return Resolution::Blocked;
    }
    if let Some(other) = t.occupant {
        return Resolution::Bump(other);
    }
    if let Tile::Switch { .. } = t.tile {
        return Resolution::ToggleSwitch;
    }
    if let Some(s) = t.spring {
        return Resolution::Spring(s);
    }
    if let Some(door) = t.door {
        return match (door.open, door.teleports) {
            (true, true) => Resolution::EnterDoor(door.id),
            (true, false) => Resolution::Walk,
            (false, _) => Resolution::InsertKey(door.id),
        };
    }
    if let Some(o) = t.obstacle {
        return Resolution::Push(o);
    }
    match t.tile {
        Tile::Door(letter) => {
            if carried == Some(Item::Key(letter)) {
                Resolution::Unlock
            } else {
                Resolution::Blocked
            }
        }
        tile if tile.item().is_some() => match (carried, tile.item()) {
            (None, Some(item)) => Resolution::PickUp(item),
            _ => Resolution::Walk,
        },
        Tile::Riddle if t.riddle => Resolution::Riddle,
        tile if tile.is_walkable() => Resolution::Walk,
        _ => Resolution::Blocked,
    }
}

/// Aggregate push force of `pusher` moving `dir`. `headings[i]` is player
/// i's heading snapshotted at tick start.
pub fn cooperative_force(pusher: PlayerId, dir: Dir, players: &[Player], headings: &[Dir]) -> usize {
    let p = &players[pusher];
    let helpers: usize = players
        .iter()
        .filter(|q| q.id != pusher)
        .filter(|q| q.pos.manhattan(p.pos) == Some(1))
        .filter(|q| headings.get(q.id) == Some(&dir))
        .map(Player::base_force)
        .sum();
    p.base_force() + helpers
}

#[inline]
pub fn push_succeeds(force: usize, size: usize) -> bool {
    force >= size
}

/// Launch speed and boosted duration for a release after `compressed` cells.
#[inline]
pub fn launch(compressed: usize) -> (usize, usize) {
    (compressed, compressed * compressed)
}

pub fn door_opens(required: &BTreeSet<char>, inserted: &BTreeSet<char>, switches_ok: bool) -> bool {
    inserted == required && switches_ok
}

/// Order in which adjacent cells are tried when dropping an item:
/// behind the player first, then the cardinals.
pub fn drop_order(facing: Dir) -> Vec<Dir> {
    let mut order = Vec::with_capacity(5);
    let behind = facing.opposite();
    if behind != Dir::Stay {
        order.push(behind);
    }
    for d in Dir::CARDINALS {
        if !order.contains(&d) {
            order.push(d);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{Boost, Pos};

    fn view(tile: Tile) -> TargetView {
        TargetView {
            tile,
            light_ok: true,
            occupant: None,
            spring: None,
            door: None,
            obstacle: None,
            riddle: false,
        }
    }

    fn players_at(cells: &[(usize, usize)]) -> Vec<Player> {
        cells
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Player::new(i, Pos::new(0, x, y)))
            .collect()
    }

    // ── Target resolution ──

    #[test]
    fn out_of_bounds_blocks() {
        assert_eq!(resolve_target(None, None), Resolution::Blocked);
    }

    #[test]
    fn darkness_beats_everything_else() {
        let mut v = view(Tile::Empty);
        v.light_ok = false;
        v.occupant = Some(1);
        assert_eq!(resolve_target(Some(&v), None), Resolution::Blocked);
    }

    #[test]
    fn occupant_beats_switch() {
        let mut v = view(Tile::Switch { on: false });
        v.occupant = Some(2);
        assert_eq!(resolve_target(Some(&v), None), Resolution::Bump(2));
        v.occupant = None;
        assert_eq!(resolve_target(Some(&v), None), Resolution::ToggleSwitch);
    }

    #[test]
    fn hidden_spring_cell_still_resolves_as_spring() {
        let mut v = view(Tile::Empty);
        v.spring = Some(4);
        assert_eq!(resolve_target(Some(&v), None), Resolution::Spring(4));
    }

    #[test]
    fn special_door_states() {
        let mut v = view(Tile::SpecialDoor);
        v.door = Some(DoorView { id: 0, open: false, teleports: true });
        assert_eq!(resolve_target(Some(&v), Some(Item::Key('a'))), Resolution::InsertKey(0));
        v.door = Some(DoorView { id: 0, open: true, teleports: true });
        assert_eq!(resolve_target(Some(&v), None), Resolution::EnterDoor(0));
    }

    #[test]
    fn obstacle_resolves_to_push() {
        let mut v = view(Tile::Obstacle);
        v.obstacle = Some(7);
        assert_eq!(resolve_target(Some(&v), None), Resolution::Push(7));
    }

    #[test]
    fn letter_door_needs_matching_key() {
        let v = view(Tile::Door('b'));
        assert_eq!(resolve_target(Some(&v), None), Resolution::Blocked);
        assert_eq!(resolve_target(Some(&v), Some(Item::Key('a'))), Resolution::Blocked);
        assert_eq!(resolve_target(Some(&v), Some(Item::Key('b'))), Resolution::Unlock);
    }

    #[test]
    fn items_picked_up_only_with_free_slot() {
        let v = view(Tile::Torch);
        assert_eq!(resolve_target(Some(&v), None), Resolution::PickUp(Item::Torch));
        assert_eq!(resolve_target(Some(&v), Some(Item::Bomb)), Resolution::Walk);
    }

    #[test]
    fn riddle_without_metadata_is_floor() {
        let mut v = view(Tile::Riddle);
        assert_eq!(resolve_target(Some(&v), None), Resolution::Walk);
        v.riddle = true;
        assert_eq!(resolve_target(Some(&v), None), Resolution::Riddle);
    }

    #[test]
    fn walls_block() {
        assert_eq!(resolve_target(Some(&view(Tile::Wall)), None), Resolution::Blocked);
        assert_eq!(resolve_target(Some(&view(Tile::LitBomb)), None), Resolution::Blocked);
        assert_eq!(resolve_target(Some(&view(Tile::PressureButton)), None), Resolution::Walk);
    }

    // ── Cooperative force ──

    #[test]
    fn lone_pusher_has_force_one() {
        let ps = players_at(&[(5, 5)]);
        assert_eq!(cooperative_force(0, Dir::Right, &ps, &[Dir::Right]), 1);
    }

    #[test]
    fn adjacent_co_mover_adds_force() {
        let ps = players_at(&[(5, 5), (5, 6)]);
        assert_eq!(cooperative_force(0, Dir::Right, &ps, &[Dir::Right, Dir::Right]), 2);
        // Different heading does not help
        assert_eq!(cooperative_force(0, Dir::Right, &ps, &[Dir::Right, Dir::Up]), 1);
    }

    #[test]
    fn diagonal_neighbour_does_not_help() {
        let ps = players_at(&[(5, 5), (6, 6)]);
        assert_eq!(cooperative_force(0, Dir::Right, &ps, &[Dir::Right, Dir::Right]), 1);
    }

    #[test]
    fn force_is_one_hop_only() {
        // 0 - 1 - 2 in a column; 2 is not adjacent to 0
        let ps = players_at(&[(5, 5), (5, 6), (5, 7)]);
        let h = [Dir::Right; 3];
        assert_eq!(cooperative_force(0, Dir::Right, &ps, &h), 2);
        assert!(!push_succeeds(cooperative_force(0, Dir::Right, &ps, &h), 3));
    }

    #[test]
    fn boosted_helper_adds_speed() {
        let mut ps = players_at(&[(5, 5), (4, 5)]);
        ps[1].boost = Some(Boost { speed: 3, remaining: 4, dir: Dir::Right, origin: None });
        assert_eq!(cooperative_force(0, Dir::Right, &ps, &[Dir::Right, Dir::Right]), 4);
    }

    #[test]
    fn three_cell_obstacle_needs_three() {
        assert!(!push_succeeds(2, 3));
        assert!(push_succeeds(3, 3));
    }

    // ── Spring / doors / drop ──

    #[test]
    fn launch_is_speed_c_duration_c_squared() {
        for c in 1..6 {
            assert_eq!(launch(c), (c, c * c));
        }
    }

    #[test]
    fn door_predicate() {
        let req: BTreeSet<char> = ['a', 'b'].into_iter().collect();
        let mut ins = BTreeSet::new();
        ins.insert('a');
        assert!(!door_opens(&req, &ins, true));
        ins.insert('b');
        assert!(door_opens(&req, &ins, true));
        assert!(!door_opens(&req, &ins, false));
    }

    #[test]
    fn drop_tries_behind_first() {
        assert_eq!(drop_order(Dir::Right), vec![Dir::Left, Dir::Up, Dir::Right, Dir::Down]);
        assert_eq!(drop_order(Dir::Stay), Dir::CARDINALS.to_vec());
    }
}
