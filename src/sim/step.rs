/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Intents (one per player, movement persists until blocked)
///   2. Heading snapshot for cooperative force
///   3. Per player, ascending id:
///        a. boost / spring / plain movement; a player who walks into a
///           teammate heading the same way waits until that teammate moves
///        b. action (drop or pick up)
///        c. adjacent special doors take a matching key
///        d. open teleport door underfoot
///        e. room change → screen transition
///   4. Bomb fuses and detonations
///   5. Pressure buttons
///   6. Special door evaluation
///   7. Win / lose check
///
/// Any obstacle push rescans components before the next player moves, so
/// nothing later in the tick sees a stale obstacle.

use tracing::{debug, info};

use crate::domain::entity::{Dir, Intent, Item, PlayerId, Pos, SpringId};
use crate::domain::room::{shift, step_within};
use crate::domain::rules::{self, Resolution};
use crate::domain::tile::Tile;

use super::bomb;
use super::door;
use super::event::{GameEvent, TickReport};
use super::obstacle;
use super::spring;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

/// `intents[i]` is player i's input for this tick; missing entries mean
/// no new input.
pub fn step(world: &mut WorldState, intents: &[Option<Intent>]) -> TickReport {
    if world.phase != Phase::Playing {
        return TickReport { tick: world.tick, ..TickReport::default() };
    }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    let actions = apply_intents(world, intents);
    let headings = world.headings();

    let mut queued: Vec<(PlayerId, Pos)> = Vec::new();
    for pid in 0..world.players.len() {
        let start = world.players[pid].pos;
        if let Some(front) = resolve_movement(world, pid, &headings, &mut events) {
            if front > pid || queued.iter().any(|&(q, _)| q == front) {
                queued.push((pid, start));
                continue;
            }
            world.players[pid].dir = Dir::Stay;
        }
        finish_turn(world, pid, start, actions[pid], &mut events);
    }
    resolve_queue(world, queued, &headings, &actions, &mut events);

    bomb::tick_bombs(world, &mut events);
    if door::update_pressure(world) {
        obstacle::rescan(world);
    }
    door::evaluate(world, &mut events);
    resolve_end(world, &mut events);

    let (dirty, redraw) = world.take_render_hints();
    TickReport { tick: world.tick, events, dirty, redraw }
}

/// Answer the riddle player `pid` is waiting on. Case-insensitive. A right
/// answer clears the riddle and scores; a wrong one costs a heart. The
/// report carries the tick the answer landed on.
pub fn answer_riddle(world: &mut WorldState, pid: PlayerId, answer: &str) -> TickReport {
    let mut events = Vec::new();
    if world.phase == Phase::Playing {
        judge_answer(world, pid, answer, &mut events);
    }
    let (dirty, redraw) = world.take_render_hints();
    TickReport { tick: world.tick, events, dirty, redraw }
}

fn judge_answer(world: &mut WorldState, pid: PlayerId, answer: &str, events: &mut Vec<GameEvent>) {
    let Some(pos) = world.players.get_mut(pid).and_then(|p| p.pending_riddle.take()) else {
        return;
    };
    let Some(riddle) = world.riddles.get(&pos).cloned() else {
        return;
    };

    let correct = answer.trim().to_lowercase() == riddle.answer.trim().to_lowercase();
    info!(player = pid, correct, "riddle answered");
    events.push(GameEvent::RiddleAnswered {
        player: pid,
        question: riddle.question,
        answer: answer.trim().to_string(),
        correct,
    });
    if correct {
        world.riddles.remove(&pos);
        world.set_tile(pos, Tile::Empty);
        world.score += world.rules.riddle_points;
    } else {
        world.hearts = world.hearts.saturating_sub(1);
        events.push(GameEvent::LifeLost { player: pid, hearts: world.hearts });
    }
    resolve_end(world, events);
}

// ══════════════════════════════════════════════════════════════
// Intents
// ══════════════════════════════════════════════════════════════

fn apply_intents(world: &mut WorldState, intents: &[Option<Intent>]) -> Vec<bool> {
    let mut actions = vec![false; world.players.len()];
    for (pid, player) in world.players.iter_mut().enumerate() {
        if player.pending_riddle.is_some() {
            continue;
        }
        match intents.get(pid).copied().flatten() {
            Some(Intent::Move(d)) => {
                player.dir = d;
                if d != Dir::Stay {
                    player.facing = d;
                }
            }
            Some(Intent::Action) => actions[pid] = true,
            None => {}
        }
    }
    actions
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

/// How a single step ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Outcome {
    Moved,
    Blocked,
    Bumped(PlayerId),
    /// Resolved without further motion this tick (switch, riddle).
    Halted,
}

/// Returns the teammate `pid` walked into when that teammate is heading the
/// same way. The mover keeps its intent; the caller decides whether it
/// waits for the teammate or stops.
fn resolve_movement(
    world: &mut WorldState,
    pid: PlayerId,
    headings: &[Dir],
    events: &mut Vec<GameEvent>,
) -> Option<PlayerId> {
    let player = &world.players[pid];
    if player.pending_riddle.is_some() {
        return None;
    }
    if player.boost.is_some() {
        resolve_boost(world, pid, headings, events);
        return None;
    }
    if let Some(contact) = player.spring {
        let compress_dir = world.springs[contact.spring].compress_dir;
        if player.dir == compress_dir {
            if !spring::compress(world, pid) {
                world.players[pid].dir = Dir::Stay;
            }
        } else {
            spring::release(world, pid, events);
        }
        return None;
    }
    let dir = player.dir;
    if dir == Dir::Stay {
        return None;
    }
    match step_once(world, pid, dir, 1, None, headings, events) {
        Outcome::Bumped(other) if headings.get(other) == Some(&dir) => return Some(other),
        Outcome::Blocked | Outcome::Bumped(_) => world.players[pid].dir = Dir::Stay,
        Outcome::Moved | Outcome::Halted => {}
    }
    None
}

/// Players queued behind a teammate retry in passes until the line stops
/// moving. Whoever is still blocked after a pass that freed nobody stops.
fn resolve_queue(
    world: &mut WorldState,
    mut queued: Vec<(PlayerId, Pos)>,
    headings: &[Dir],
    actions: &[bool],
    events: &mut Vec<GameEvent>,
) {
    while !queued.is_empty() {
        let before = queued.len();
        let mut i = 0;
        while i < queued.len() {
            let (pid, start) = queued[i];
            match resolve_movement(world, pid, headings, events) {
                Some(front) if queued.iter().any(|&(q, _)| q == front) => {
                    i += 1;
                    continue;
                }
                Some(_) => world.players[pid].dir = Dir::Stay,
                None => {}
            }
            queued.remove(i);
            finish_turn(world, pid, start, actions[pid], events);
        }
        if queued.len() == before {
            for (pid, start) in queued.drain(..) {
                world.players[pid].dir = Dir::Stay;
                finish_turn(world, pid, start, actions[pid], events);
            }
        }
    }
}

/// Everything after movement in a player's turn.
fn finish_turn(world: &mut WorldState, pid: PlayerId, start: Pos, action: bool, events: &mut Vec<GameEvent>) {
    if action {
        resolve_action(world, pid, events);
    }
    door::auto_insert(world, pid, events);
    door::teleport(world, pid, events);
    resolve_transition(world, pid, start, events);
}

/// Boosted movement: up to `speed` cells along the boost, then one lateral
/// step if the held direction is perpendicular, then one tick of duration.
fn resolve_boost(world: &mut WorldState, pid: PlayerId, headings: &[Dir], events: &mut Vec<GameEvent>) {
    let Some(boost) = world.players[pid].boost else { return };

    for _ in 0..boost.speed {
        match step_once(world, pid, boost.dir, boost.speed, boost.origin, headings, events) {
            Outcome::Moved => {}
            Outcome::Bumped(other) => {
                transfer_boost(world, pid, other, events);
                return;
            }
            Outcome::Blocked => {
                debug!(player = pid, "boost cancelled");
                world.players[pid].boost = None;
                world.players[pid].dir = Dir::Stay;
                return;
            }
            Outcome::Halted => {
                world.players[pid].boost = None;
                return;
            }
        }
    }

    let lateral = world.players[pid].dir;
    if lateral.is_perpendicular(boost.dir) {
        match step_once(world, pid, lateral, 1, boost.origin, headings, events) {
            Outcome::Blocked | Outcome::Bumped(_) => world.players[pid].dir = Dir::Stay,
            Outcome::Halted => {
                world.players[pid].boost = None;
                return;
            }
            Outcome::Moved => {}
        }
    }

    if let Some(b) = world.players[pid].boost.as_mut() {
        b.remaining = b.remaining.saturating_sub(1);
        if b.remaining == 0 {
            world.players[pid].boost = None;
        }
    }
}

/// A boosted player ran into `to`: `to` takes over the remaining boost and
/// lets go of any spring without launching; `from` stops.
fn transfer_boost(world: &mut WorldState, from: PlayerId, to: PlayerId, events: &mut Vec<GameEvent>) {
    let Some(boost) = world.players[from].boost.take() else { return };
    spring::release_without_launch(world, to);
    world.players[to].boost = Some(boost);
    world.players[from].dir = Dir::Stay;
    debug!(from, to, remaining = boost.remaining, "boost transferred");
    events.push(GameEvent::BoostTransferred { from, to });
}

/// Resolve one single-cell step of `pid` in `dir`. `speed` is how far a
/// pushed obstacle travels; `passable` is a spring the mover ignores.
fn step_once(
    world: &mut WorldState,
    pid: PlayerId,
    dir: Dir,
    speed: usize,
    passable: Option<SpringId>,
    headings: &[Dir],
    events: &mut Vec<GameEvent>,
) -> Outcome {
    let from = world.players[pid].pos;
    let target = shift(&world.graph, from, dir, 0);
    let view = target.map(|t| world.target_view(pid, t, passable));
    let carried = world.players[pid].item;
    let resolution = rules::resolve_target(view.as_ref(), carried);
    let Some(to) = target else { return Outcome::Blocked };

    match resolution {
        Resolution::Blocked => Outcome::Blocked,
        Resolution::Bump(other) => Outcome::Bumped(other),
        Resolution::ToggleSwitch => {
            door::toggle_switch(world, pid, to, dir, events);
            Outcome::Halted
        }
        Resolution::Spring(sid) => {
            let s = &world.springs[sid];
            let free_end = s.cells.first() == Some(&to) && s.compress_dir == dir;
            if free_end && world.players[pid].boost.is_none() {
                spring::engage(world, pid, sid, events);
                world.mark_dirty(from);
                Outcome::Moved
            } else {
                Outcome::Blocked
            }
        }
        Resolution::EnterDoor(_) => {
            move_to(world, pid, to);
            Outcome::Moved
        }
        Resolution::InsertKey(id) => {
            door::try_insert(world, pid, id, events);
            Outcome::Blocked
        }
        Resolution::Push(oid) => {
            let force = rules::cooperative_force(pid, dir, &world.players, headings);
            let size = world.obstacles[oid].size();
            if !rules::push_succeeds(force, size) {
                debug!(player = pid, force, size, "push too weak");
                return Outcome::Blocked;
            }
            if !obstacle::push(world, oid, dir, speed) {
                return Outcome::Blocked;
            }
            events.push(GameEvent::ObstaclePushed { player: pid, size, dir });
            move_to(world, pid, to);
            Outcome::Moved
        }
        Resolution::Unlock => {
            world.players[pid].item = None;
            world.set_tile(to, Tile::Empty);
            events.push(GameEvent::DoorUnlocked { player: pid, pos: to });
            move_to(world, pid, to);
            Outcome::Moved
        }
        Resolution::PickUp(item) => {
            world.players[pid].item = Some(item);
            world.set_tile(to, Tile::Empty);
            events.push(GameEvent::ItemPicked { player: pid, item });
            move_to(world, pid, to);
            Outcome::Moved
        }
        Resolution::Riddle => {
            move_to(world, pid, to);
            let question = world.riddles.get(&to).map(|r| r.question.clone()).unwrap_or_default();
            let player = &mut world.players[pid];
            player.pending_riddle = Some(to);
            player.dir = Dir::Stay;
            info!(player = pid, room = to.room, "riddle encountered");
            events.push(GameEvent::RiddleEncountered { player: pid, question });
            Outcome::Halted
        }
        Resolution::Walk => {
            move_to(world, pid, to);
            Outcome::Moved
        }
    }
}

fn move_to(world: &mut WorldState, pid: PlayerId, to: Pos) {
    let from = world.players[pid].pos;
    world.mark_dirty(from);
    world.mark_dirty(to);
    world.players[pid].pos = to;
}

// ══════════════════════════════════════════════════════════════
// Action: drop or pick up
// ══════════════════════════════════════════════════════════════

fn resolve_action(world: &mut WorldState, pid: PlayerId, events: &mut Vec<GameEvent>) {
    let here = world.players[pid].pos;
    let Some(item) = world.players[pid].item else {
        if let Some(item) = world.terrain_at(here).item() {
            world.players[pid].item = Some(item);
            world.set_tile(here, Tile::Empty);
            events.push(GameEvent::ItemPicked { player: pid, item });
        }
        return;
    };

    let facing = world.players[pid].facing;
    let spot = rules::drop_order(facing)
        .into_iter()
        .filter_map(|d| step_within(here, d))
        .find(|&c| can_drop_at(world, c));
    let Some(spot) = spot else {
        debug!(player = pid, "no free cell to drop into");
        return;
    };

    world.players[pid].item = None;
    match item {
        Item::Bomb => {
            bomb::place(world, spot);
            events.push(GameEvent::BombPlaced { player: pid, pos: spot });
        }
        Item::Key(k) => world.set_tile(spot, Tile::Key(k)),
        Item::Torch => world.set_tile(spot, Tile::Torch),
    }
    events.push(GameEvent::ItemDropped { player: pid, item, pos: spot });
}

fn can_drop_at(world: &WorldState, pos: Pos) -> bool {
    world.terrain_at(pos) == Tile::Empty
        && world.player_at(pos).is_none()
        && world.spring_at(pos).is_none()
        && world.door_at(pos).is_none()
        && !world.riddles.contains_key(&pos)
}

// ══════════════════════════════════════════════════════════════
// Room transitions and end of game
// ══════════════════════════════════════════════════════════════

fn resolve_transition(world: &mut WorldState, pid: PlayerId, start: Pos, events: &mut Vec<GameEvent>) {
    let room = world.players[pid].pos.room;
    if room != start.room {
        info!(player = pid, from = start.room, to = room, "screen transition");
        world.request_redraw();
        events.push(GameEvent::ScreenTransition { player: pid, room });
    }
}

fn resolve_end(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.phase != Phase::Playing {
        return;
    }
    let won = if world.hearts == 0 {
        false
    } else if world.all_in_final_room() {
        true
    } else {
        return;
    };
    world.phase = if won { Phase::Won } else { Phase::Lost };
    info!(won, score = world.score, tick = world.tick, "game over");
    events.push(GameEvent::GameEnd { won, score: world.score });
}
