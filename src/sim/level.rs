/// Level loader.
///
/// ## Sources (priority order):
///   1. `level_file` from `config.toml`
///   2. Built-in embedded level (`levels/tutorial.toml`)
///
/// ## Level format (TOML):
///   ```toml
///   name = "Tutorial"
///   final_room = "exit"        # optional, defaults to the last room
///
///   [[rooms]]
///   name = "hall"
///   grid = '''
///   ####################
///   #1  a   *    ~~~#
///   '''
///   dark = [{ x = 10, y = 2, w = 8, h = 4 }]
///   links = { right = "cave" }
///
///   [[rooms.buttons]]
///   at = [3, 4]
///   targets = [[10, 6], [10, 7]]
///
///   [[rooms.doors]]
///   at = [30, 5]
///   keys = "ab"
///   switches = [{ at = [5, 5], on = true }]
///   teleport = { room = "exit", at = [2, 2] }
///
///   [[rooms.riddles]]
///   at = [12, 3]
///   question = "What has keys but opens no locks?"
///   answer = "piano"
///   ```
///
/// Grids are 80×25; short or missing rows are floor, overflow is cut with a
/// warning.
///
/// ## Tile legend:
///   '#' = Wall                   '=' = Bombable wall
///   'a'-'z' = Key                'A'-'Z' = Door for that key
///   '@' = Bomb                   '!' = Torch
///   '*' = Obstacle               '~' = Spring
///   '\' / '/' = Switch off / on  '_' = Pressure button
///   '+' = Special door           '?' = Riddle
///   '1'-'9' = Player spawn       ' ' or '.' = Empty
///
/// Missing or inconsistent required data (rooms, grids, links, spawns) is a
/// `LevelError`. Malformed optional metadata (dark zones, buttons, doors,
/// riddles) is logged and skipped.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RulesConfig;
use crate::domain::entity::{Dir, Player, Pos, RoomId};
use crate::domain::room::{GraphError, PressureButton, Rect, Room, ROOM_H, ROOM_W};
use crate::domain::tile::Tile;

use super::door::SpecialDoor;
use super::obstacle;
use super::spring;
use super::world::{Riddle, WorldState};

const EMBEDDED_LEVEL: &str = include_str!("../../levels/tutorial.toml");

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("cannot read level file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid level file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("level has no rooms")]
    NoRooms,
    #[error("room `{0}` has an empty grid")]
    EmptyRoom(String),
    #[error("room `{0}` is defined twice")]
    DuplicateRoom(String),
    #[error("room `{from}` links to unknown room `{to}`")]
    UnknownRoom { from: String, to: String },
    #[error("final room `{0}` does not exist")]
    UnknownFinalRoom(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("no player spawn (digits 1-9) in any room")]
    NoSpawn,
}

// ══════════════════════════════════════════════════════════════
// TOML schema
// ══════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct LevelFile {
    #[serde(default = "default_level_name")]
    name: String,
    #[serde(default)]
    final_room: Option<String>,
    #[serde(default)]
    rooms: Vec<RoomFile>,
}

#[derive(Deserialize, Debug)]
struct RoomFile {
    name: String,
    #[serde(default)]
    grid: String,
    #[serde(default)]
    links: Links,
    // Optional metadata stays untyped until validated entry by entry.
    #[serde(default)]
    dark: Vec<toml::Value>,
    #[serde(default)]
    buttons: Vec<toml::Value>,
    #[serde(default)]
    doors: Vec<toml::Value>,
    #[serde(default)]
    riddles: Vec<toml::Value>,
}

#[derive(Deserialize, Debug, Default)]
struct Links {
    up: Option<String>,
    right: Option<String>,
    down: Option<String>,
    left: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RectDef {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

#[derive(Deserialize, Debug)]
struct ButtonDef {
    at: (usize, usize),
    targets: Vec<(usize, usize)>,
}

#[derive(Deserialize, Debug)]
struct DoorDef {
    at: (usize, usize),
    #[serde(default)]
    keys: String,
    #[serde(default)]
    switches: Vec<SwitchReq>,
    teleport: Option<TeleportDef>,
}

#[derive(Deserialize, Debug)]
struct SwitchReq {
    at: (usize, usize),
    on: bool,
}

#[derive(Deserialize, Debug)]
struct TeleportDef {
    room: String,
    at: (usize, usize),
}

#[derive(Deserialize, Debug)]
struct RiddleDef {
    at: (usize, usize),
    question: String,
    answer: String,
}

fn default_level_name() -> String {
    "Untitled".into()
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load the configured level file, or the embedded level when none is set.
pub fn load_level(path: Option<&Path>, rules: RulesConfig) -> Result<WorldState, LevelError> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|source| LevelError::Read { path: p.to_path_buf(), source })?;
            info!(path = %p.display(), "loading level file");
            build_world(&text, rules)
        }
        None => {
            info!("loading embedded level");
            build_world(EMBEDDED_LEVEL, rules)
        }
    }
}

/// Parse level TOML and build a ready-to-play world.
pub fn build_world(text: &str, rules: RulesConfig) -> Result<WorldState, LevelError> {
    let file: LevelFile = toml::from_str(text)?;
    if file.rooms.is_empty() {
        return Err(LevelError::NoRooms);
    }

    let mut ids: HashMap<String, RoomId> = HashMap::new();
    for (i, r) in file.rooms.iter().enumerate() {
        if ids.insert(r.name.clone(), i).is_some() {
            return Err(LevelError::DuplicateRoom(r.name.clone()));
        }
    }

    let mut world = WorldState::new(file.name.clone(), rules);
    let mut spawns: BTreeMap<char, Pos> = BTreeMap::new();

    // Grids
    for (room_id, rf) in file.rooms.iter().enumerate() {
        if rf.grid.trim().is_empty() {
            return Err(LevelError::EmptyRoom(rf.name.clone()));
        }
        let lines: Vec<&str> = rf.grid.lines().collect();
        let (tiles, room_spawns) = parse_grid(&rf.name, &lines);
        for (digit, (x, y)) in room_spawns {
            if spawns.contains_key(&digit) {
                warn!(room = %rf.name, spawn = %digit, "duplicate player spawn ignored");
                continue;
            }
            spawns.insert(digit, Pos::new(room_id, x, y));
        }
        world.rooms.push(Room::new(rf.name.clone(), tiles));
    }

    // Room graph
    for (room_id, rf) in file.rooms.iter().enumerate() {
        let links = [
            (Dir::Up, &rf.links.up),
            (Dir::Right, &rf.links.right),
            (Dir::Down, &rf.links.down),
            (Dir::Left, &rf.links.left),
        ];
        for (dir, target) in links {
            let Some(target) = target else { continue };
            let to = *ids.get(target).ok_or_else(|| LevelError::UnknownRoom {
                from: rf.name.clone(),
                to: target.clone(),
            })?;
            world.graph.link(room_id, dir, to)?;
        }
    }

    world.final_room = match &file.final_room {
        Some(name) => *ids.get(name).ok_or_else(|| LevelError::UnknownFinalRoom(name.clone()))?,
        None => file.rooms.len() - 1,
    };

    // Optional metadata
    for (room_id, rf) in file.rooms.iter().enumerate() {
        load_dark_zones(&mut world, room_id, rf);
        load_buttons(&mut world, room_id, rf);
        load_doors(&mut world, room_id, rf, &ids);
        load_riddles(&mut world, room_id, rf);
    }

    finish(&mut world, spawns)?;
    info!(
        level = %world.level_name,
        rooms = world.rooms.len(),
        players = world.players.len(),
        obstacles = world.obstacles.len(),
        springs = world.springs.len(),
        doors = world.doors.len(),
        "level ready"
    );
    Ok(world)
}

// ══════════════════════════════════════════════════════════════
// Internals
// ══════════════════════════════════════════════════════════════

/// Translate grid text into tiles plus `(digit, (x, y))` spawns.
fn parse_grid(room: &str, lines: &[&str]) -> (Vec<Tile>, Vec<(char, (usize, usize))>) {
    let mut tiles = vec![Tile::Empty; ROOM_W * ROOM_H];
    let mut spawns = vec![];
    if lines.len() > ROOM_H {
        warn!(room, rows = lines.len(), "grid taller than {ROOM_H} rows, truncated");
    }
    for (y, line) in lines.iter().take(ROOM_H).enumerate() {
        if line.chars().count() > ROOM_W {
            warn!(room, row = y, "grid row wider than {ROOM_W} columns, truncated");
        }
        for (x, ch) in line.chars().take(ROOM_W).enumerate() {
            let tile = match ch {
                '1'..='9' => {
                    spawns.push((ch, (x, y)));
                    Tile::Empty
                }
                _ => Tile::from_glyph(ch).unwrap_or_else(|| {
                    warn!(room, x, y, glyph = %ch, "unknown glyph, treated as floor");
                    Tile::Empty
                }),
            };
            tiles[y * ROOM_W + x] = tile;
        }
    }
    (tiles, spawns)
}

fn in_room(at: (usize, usize)) -> bool {
    at.0 < ROOM_W && at.1 < ROOM_H
}

/// Decode one optional metadata entry; bad entries are logged and dropped.
fn decode<T: for<'de> Deserialize<'de>>(room: &str, kind: &str, value: &toml::Value) -> Option<T> {
    match value.clone().try_into::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(room, kind, "malformed entry skipped: {e}");
            None
        }
    }
}

fn load_dark_zones(world: &mut WorldState, room_id: RoomId, rf: &RoomFile) {
    for v in &rf.dark {
        let Some(r) = decode::<RectDef>(&rf.name, "dark", v) else { continue };
        if r.w == 0 || r.h == 0 || !in_room((r.x, r.y)) {
            warn!(room = %rf.name, x = r.x, y = r.y, "dark zone outside the room, skipped");
            continue;
        }
        world.rooms[room_id].dark_zones.push(Rect { x: r.x, y: r.y, w: r.w, h: r.h });
    }
}

fn load_buttons(world: &mut WorldState, room_id: RoomId, rf: &RoomFile) {
    for v in &rf.buttons {
        let Some(b) = decode::<ButtonDef>(&rf.name, "button", v) else { continue };
        if !in_room(b.at) || world.rooms[room_id].tile_at(b.at.0, b.at.1) != Tile::PressureButton {
            warn!(room = %rf.name, x = b.at.0, y = b.at.1, "button entry not on a '_' cell, skipped");
            continue;
        }
        let targets: Vec<(usize, usize)> = b.targets.into_iter().filter(|&t| in_room(t)).collect();
        world.rooms[room_id].buttons.push(PressureButton { x: b.at.0, y: b.at.1, targets });
    }
}

fn load_doors(world: &mut WorldState, room_id: RoomId, rf: &RoomFile, ids: &HashMap<String, RoomId>) {
    let mut configured: BTreeMap<(usize, usize), DoorDef> = BTreeMap::new();
    for v in &rf.doors {
        let Some(d) = decode::<DoorDef>(&rf.name, "door", v) else { continue };
        if !in_room(d.at) || world.rooms[room_id].tile_at(d.at.0, d.at.1) != Tile::SpecialDoor {
            warn!(room = %rf.name, x = d.at.0, y = d.at.1, "door entry not on a '+' cell, skipped");
            continue;
        }
        configured.insert(d.at, d);
    }

    for (x, y) in world.rooms[room_id].cells_of(Tile::SpecialDoor) {
        let id = world.doors.len();
        let mut door = SpecialDoor::new(id, Pos::new(room_id, x, y));
        match configured.remove(&(x, y)) {
            Some(def) => {
                for k in def.keys.chars() {
                    if k.is_ascii_lowercase() {
                        door.required.insert(k);
                    } else {
                        warn!(room = %rf.name, x, y, key = %k, "door key must be a-z, ignored");
                    }
                }
                for s in def.switches {
                    let is_switch = in_room(s.at)
                        && matches!(world.rooms[room_id].tile_at(s.at.0, s.at.1), Tile::Switch { .. });
                    if is_switch {
                        door.switches.push((Pos::new(room_id, s.at.0, s.at.1), s.on));
                    } else {
                        warn!(room = %rf.name, x, y, "door switch requirement not on a switch, ignored");
                    }
                }
                door.teleport = def.teleport.and_then(|t| match ids.get(&t.room) {
                    Some(&room) if in_room(t.at) => Some(Pos::new(room, t.at.0, t.at.1)),
                    _ => {
                        warn!(room = %rf.name, x, y, target = %t.room, "bad teleport target, door will not teleport");
                        None
                    }
                });
            }
            None => warn!(room = %rf.name, x, y, "special door without configuration opens freely"),
        }
        world.rooms[room_id].door_index.insert((x, y), id);
        world.doors.push(door);
    }
}

fn load_riddles(world: &mut WorldState, room_id: RoomId, rf: &RoomFile) {
    for v in &rf.riddles {
        let Some(r) = decode::<RiddleDef>(&rf.name, "riddle", v) else { continue };
        if !in_room(r.at) || world.rooms[room_id].tile_at(r.at.0, r.at.1) != Tile::Riddle {
            warn!(room = %rf.name, x = r.at.0, y = r.at.1, "riddle entry not on a '?' cell, skipped");
            continue;
        }
        if r.question.trim().is_empty() || r.answer.trim().is_empty() {
            warn!(room = %rf.name, x = r.at.0, y = r.at.1, "riddle without question or answer, skipped");
            continue;
        }
        world.riddles.insert(
            Pos::new(room_id, r.at.0, r.at.1),
            Riddle { question: r.question, answer: r.answer },
        );
    }
    for (x, y) in world.rooms[room_id].cells_of(Tile::Riddle) {
        if !world.riddles.contains_key(&Pos::new(room_id, x, y)) {
            warn!(room = %rf.name, x, y, "riddle cell without a riddle, acts as floor");
        }
    }
}

/// Springs, obstacles and players: everything derived from the grids.
fn finish(world: &mut WorldState, spawns: BTreeMap<char, Pos>) -> Result<(), LevelError> {
    for room_id in 0..world.rooms.len() {
        let found = spring::discover(&world.rooms[room_id], room_id, world.springs.len());
        for s in found {
            for c in &s.cells {
                world.rooms[room_id].spring_index.insert((c.x, c.y), s.id);
            }
            world.springs.push(s);
        }
    }
    obstacle::rescan(world);

    if spawns.is_empty() {
        return Err(LevelError::NoSpawn);
    }
    world.players = spawns
        .into_values()
        .enumerate()
        .map(|(id, pos)| Player::new(id, pos))
        .collect();
    Ok(())
}

/// One playable room from a diagram, plus an unreachable goal room so the
/// game does not end on the first tick.
#[cfg(test)]
pub(crate) fn single_room(rows: &[&str]) -> WorldState {
    let mut world = WorldState::new("test", RulesConfig::default());
    let (tiles, spawns) = parse_grid("test", rows);
    world.rooms.push(Room::new("test", tiles));
    world.rooms.push(Room::new("goal", vec![Tile::Empty; ROOM_W * ROOM_H]));
    world.final_room = 1;
    let spawns = spawns.into_iter().map(|(d, (x, y))| (d, Pos::new(0, x, y))).collect();
    if let Err(e) = finish(&mut world, spawns) {
        panic!("bad test room: {e}");
    }
    world
}
