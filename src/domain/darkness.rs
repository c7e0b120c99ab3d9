/// Darkness engine: distance-based shading inside dark zones.
///
/// Pure functions, no side effects.
///
/// Distance from a cell to a light source is `max(0.75·|dx|, |dy|)`, kept in
/// integers as `max(3·|dx|, 4·|dy|)` (four times the real distance).
///
/// ┌────────────────────┬────────────┬────────┐
/// │ distance d          │ scaled     │ shade  │
/// ├────────────────────┼────────────┼────────┤
/// │ d ≤ 2               │ ≤ 8        │ 0 lit  │
/// │ 2 < d ≤ 3           │ ≤ 12       │ 1      │
/// │ 3 < d ≤ 4           │ ≤ 16       │ 2      │
/// │ 4 < d ≤ 5           │ ≤ 20       │ 3      │
/// │ d > 5, or no source │ > 20       │ 4      │
/// └────────────────────┴────────────┴────────┘
///
/// Cells outside every dark zone are always shade 0. Light sources are
/// torch-carrying players in the room and torch tiles lying in the room.

use super::entity::{Player, RoomId};
use super::room::Room;
use super::tile::Tile;

pub const LIT: u8 = 0;
pub const PITCH_BLACK: u8 = 4;

const BAND_LIMITS: [usize; 4] = [8, 12, 16, 20];

#[inline]
pub fn scaled_distance(a: (usize, usize), b: (usize, usize)) -> usize {
    (3 * a.0.abs_diff(b.0)).max(4 * a.1.abs_diff(b.1))
}

/// Shade band for a scaled distance.
pub fn band(scaled: usize) -> u8 {
    BAND_LIMITS
        .iter()
        .position(|&limit| scaled <= limit)
        .map(|i| i as u8)
        .unwrap_or(PITCH_BLACK)
}

/// Every active light source in `room_id`.
pub fn light_sources(room: &Room, room_id: RoomId, players: &[Player]) -> Vec<(usize, usize)> {
    let mut sources: Vec<(usize, usize)> = players
        .iter()
        .filter(|p| p.pos.room == room_id && p.has_torch())
        .map(|p| (p.pos.x, p.pos.y))
        .collect();
    sources.extend(room.cells_of(Tile::Torch));
    sources
}

/// Shade of `(x, y)` given precomputed light sources.
pub fn shade_at(room: &Room, x: usize, y: usize, sources: &[(usize, usize)]) -> u8 {
    if !room.in_dark_zone(x, y) {
        return LIT;
    }
    sources
        .iter()
        .map(|&s| band(scaled_distance((x, y), s)))
        .min()
        .unwrap_or(PITCH_BLACK)
}

/// May a mover step onto `(x, y)`? Torch carriers always may; anyone else
/// only onto fully lit cells.
pub fn can_enter(room: &Room, x: usize, y: usize, sources: &[(usize, usize)], has_torch: bool) -> bool {
    has_torch || shade_at(room, x, y, sources) == LIT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{Item, Pos};
    use crate::domain::room::{Rect, ROOM_H, ROOM_W};

    fn dark_room() -> Room {
        let mut room = Room::new("cave", vec![Tile::Empty; ROOM_W * ROOM_H]);
        room.dark_zones.push(Rect { x: 0, y: 0, w: 40, h: 20 });
        room
    }

    #[test]
    fn bands_follow_table() {
        assert_eq!(band(0), 0);
        assert_eq!(band(8), 0);
        assert_eq!(band(9), 1);
        assert_eq!(band(12), 1);
        assert_eq!(band(16), 2);
        assert_eq!(band(20), 3);
        assert_eq!(band(21), 4);
    }

    #[test]
    fn horizontal_distance_is_compressed() {
        // 2 columns away = 1.5 real distance, lit
        assert_eq!(scaled_distance((10, 5), (12, 5)), 6);
        // 3 rows away = 3 real distance
        assert_eq!(scaled_distance((10, 5), (10, 8)), 12);
    }

    #[test]
    fn shade_non_decreasing_with_distance() {
        let mut room = dark_room();
        room.set_tile(5, 5, Tile::Torch);
        let sources = light_sources(&room, 0, &[]);
        let mut last = 0;
        for x in 5..30 {
            let s = shade_at(&room, x, 5, &sources);
            assert!(s >= last, "shade fell at x={x}");
            last = s;
        }
        for dy in 0..=2 {
            assert_eq!(shade_at(&room, 5, 5 + dy, &sources), LIT);
        }
        assert_eq!(last, PITCH_BLACK);
    }

    #[test]
    fn outside_zone_always_lit() {
        let room = dark_room();
        assert_eq!(shade_at(&room, 60, 22, &[]), LIT);
        assert_eq!(shade_at(&room, 10, 10, &[]), PITCH_BLACK);
    }

    #[test]
    fn distance_six_blocks_torchless_mover() {
        let mut room = dark_room();
        room.set_tile(10, 2, Tile::Torch);
        let sources = light_sources(&room, 0, &[]);
        assert!(!can_enter(&room, 10, 8, &sources, false));
        assert!(can_enter(&room, 10, 8, &sources, true));
        assert!(can_enter(&room, 10, 4, &sources, false));
    }

    #[test]
    fn torch_carrier_lights_own_room_only() {
        let room = dark_room();
        let mut carrier = Player::new(0, Pos::new(1, 3, 3));
        carrier.item = Some(Item::Torch);
        assert!(light_sources(&room, 0, &[carrier.clone()]).is_empty());
        assert_eq!(light_sources(&room, 1, &[carrier]), vec![(3, 3)]);
    }
}
