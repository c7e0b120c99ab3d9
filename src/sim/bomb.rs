/// Bomb engine: fused area-effect entities.
///
/// A bomb dropped on tick T counts down from T+1 and detonates when the fuse
/// reaches zero (T + fuse). Detonation happens exactly once:
///   - the bomb's own cell is cleared
///   - every bombable wall within Chebyshev radius 3 in the same room is cleared
///   - every player within that radius costs the shared pool one heart
/// Obstacles and plain walls are unaffected.

use tracing::info;

use crate::domain::entity::{Bomb, Pos};
use crate::domain::room::{ROOM_H, ROOM_W};
use crate::domain::tile::Tile;

use super::event::GameEvent;
use super::world::WorldState;

pub const BLAST_RADIUS: usize = 3;

pub fn place(world: &mut WorldState, pos: Pos) {
    world.set_tile(pos, Tile::LitBomb);
    world.bombs.push(Bomb { pos, fuse: world.rules.bomb_fuse_ticks, placed_tick: world.tick });
}

/// Run every fuse one tick and detonate the ones that reach zero,
/// in placement order.
pub fn tick_bombs(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let tick = world.tick;
    let mut expired = Vec::new();
    world.bombs.retain_mut(|b| {
        if b.placed_tick == tick {
            return true;
        }
        b.fuse = b.fuse.saturating_sub(1);
        if b.fuse == 0 {
            expired.push(*b);
            false
        } else {
            true
        }
    });
    for bomb in expired {
        detonate(world, bomb, events);
    }
}

fn detonate(world: &mut WorldState, bomb: Bomb, events: &mut Vec<GameEvent>) {
    let c = bomb.pos;
    world.set_tile(c, Tile::Empty);

    let x0 = c.x.saturating_sub(BLAST_RADIUS);
    let y0 = c.y.saturating_sub(BLAST_RADIUS);
    let x1 = (c.x + BLAST_RADIUS).min(ROOM_W - 1);
    let y1 = (c.y + BLAST_RADIUS).min(ROOM_H - 1);
    let mut walls_cleared = 0;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let p = Pos::new(c.room, x, y);
            if world.terrain_at(p) == Tile::BombableWall {
                world.set_tile(p, Tile::Empty);
                walls_cleared += 1;
            }
        }
    }

    let hit: Vec<usize> = world
        .players
        .iter()
        .filter(|p| p.pos.chebyshev(c).is_some_and(|d| d <= BLAST_RADIUS))
        .map(|p| p.id)
        .collect();

    info!(room = c.room, x = c.x, y = c.y, walls_cleared, players_hit = hit.len(), "bomb exploded");
    events.push(GameEvent::BombExploded { pos: c, walls_cleared });
    for pid in hit {
        world.hearts = world.hearts.saturating_sub(1);
        events.push(GameEvent::LifeLost { player: pid, hearts: world.hearts });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::domain::entity::Player;
    use crate::domain::room::Room;

    fn world() -> WorldState {
        let mut w = WorldState::new("t", RulesConfig::default());
        w.rooms.push(Room::new("r", vec![Tile::Empty; ROOM_W * ROOM_H]));
        w
    }

    #[test]
    fn fuse_skips_placement_tick() {
        let mut w = world();
        w.tick = 10;
        place(&mut w, Pos::new(0, 5, 5));
        let mut ev = vec![];
        for t in 10..15 {
            w.tick = t;
            tick_bombs(&mut w, &mut ev);
            assert!(ev.is_empty(), "exploded early at {t}");
        }
        w.tick = 15;
        tick_bombs(&mut w, &mut ev);
        assert!(matches!(ev[0], GameEvent::BombExploded { .. }));
        assert!(w.bombs.is_empty());
    }

    #[test]
    fn blast_radius_is_chebyshev_three() {
        let mut w = world();
        let c = Pos::new(0, 10, 10);
        w.set_tile(Pos::new(0, 13, 13), Tile::BombableWall);
        w.set_tile(Pos::new(0, 14, 10), Tile::BombableWall);
        w.set_tile(Pos::new(0, 12, 10), Tile::Wall);
        w.set_tile(Pos::new(0, 11, 10), Tile::Obstacle);
        w.players.push(Player::new(0, Pos::new(0, 7, 7)));
        w.players.push(Player::new(1, Pos::new(0, 10, 14)));
        let hearts = w.hearts;
        let mut ev = vec![];
        detonate(&mut w, Bomb { pos: c, fuse: 0, placed_tick: 0 }, &mut ev);
        assert_eq!(w.terrain_at(Pos::new(0, 13, 13)), Tile::Empty);
        assert_eq!(w.terrain_at(Pos::new(0, 14, 10)), Tile::BombableWall);
        assert_eq!(w.terrain_at(Pos::new(0, 12, 10)), Tile::Wall);
        assert_eq!(w.terrain_at(Pos::new(0, 11, 10)), Tile::Obstacle);
        assert_eq!(w.hearts, hearts - 1);
        assert!(ev.contains(&GameEvent::LifeLost { player: 0, hearts: hearts - 1 }));
    }
}
