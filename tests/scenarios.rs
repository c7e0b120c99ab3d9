//! End-to-end scenarios driven through the public API: levels are built from
//! TOML text and advanced with `step`, exactly as the frontend does.

use duskrooms::config::RulesConfig;
use duskrooms::domain::entity::{Dir, Intent, Item, Pos};
use duskrooms::domain::tile::Tile;
use duskrooms::sim::event::GameEvent;
use duskrooms::sim::level::build_world;
use duskrooms::sim::step::{answer_riddle, step};
use duskrooms::sim::world::{Phase, WorldState};

fn world(level: &str) -> WorldState {
    match build_world(level, RulesConfig::default()) {
        Ok(w) => w,
        Err(e) => panic!("level failed to build: {e}"),
    }
}

fn go(d: Dir) -> Option<Intent> {
    Some(Intent::Move(d))
}

/// Step `n` ticks without input, collecting every event.
fn idle(w: &mut WorldState, n: usize) -> Vec<GameEvent> {
    (0..n).flat_map(|_| step(w, &[]).events).collect()
}

/// A final room nobody is in, so games do not end by accident.
const GOAL: &str = r#"
[[rooms]]
name = "goal"
grid = '#'
"#;

fn with_goal(rooms: &str) -> String {
    format!("name = \"scenario\"\nfinal_room = \"goal\"\n{rooms}\n{GOAL}")
}

// ── Obstacles ──

#[test]
fn two_players_push_a_two_cell_obstacle() {
    let mut w = world(&with_goal(r#"
[[rooms]]
name = "yard"
grid = '''
 1*
 2*
'''
"#));
    let report = step(&mut w, &[go(Dir::Right), go(Dir::Right)]);
    assert_eq!(w.terrain_at(Pos::new(0, 3, 0)), Tile::Obstacle);
    assert_eq!(w.terrain_at(Pos::new(0, 3, 1)), Tile::Obstacle);
    assert_eq!(w.terrain_at(Pos::new(0, 2, 0)), Tile::Empty);
    assert_eq!(w.players[0].pos, Pos::new(0, 2, 0));
    assert_eq!(w.players[1].pos, Pos::new(0, 2, 1));
    assert!(report.events.contains(&GameEvent::ObstaclePushed { player: 0, size: 2, dir: Dir::Right }));
}

#[test]
fn players_in_single_file_push_together_whatever_their_numbers() {
    for (lane, front) in [("12**", 1), ("21**", 0)] {
        let mut w = world(&with_goal(&format!("[[rooms]]\nname = \"lane\"\ngrid = '{lane}'\n")));
        let rear = 1 - front;
        step(&mut w, &[go(Dir::Right), go(Dir::Right)]);
        step(&mut w, &[]);
        assert_eq!(w.obstacles[0].cells, vec![Pos::new(0, 4, 0), Pos::new(0, 5, 0)], "{lane}");
        assert_eq!(w.players[front].pos, Pos::new(0, 3, 0), "{lane}");
        assert_eq!(w.players[rear].pos, Pos::new(0, 2, 0), "{lane}");
    }
}

#[test]
fn three_cell_obstacle_resists_two_players() {
    let mut w = world(&with_goal(r#"
[[rooms]]
name = "yard"
grid = '''
 1*
 2*
  *
'''
"#));
    step(&mut w, &[go(Dir::Right), go(Dir::Right)]);
    assert_eq!(w.obstacles.len(), 1);
    assert_eq!(w.obstacles[0].cells, vec![Pos::new(0, 2, 0), Pos::new(0, 2, 1), Pos::new(0, 2, 2)]);
    assert_eq!(w.players[0].pos, Pos::new(0, 1, 0));
    assert_eq!(w.players[1].pos, Pos::new(0, 1, 1));
    assert_eq!(w.players[0].dir, Dir::Stay);
}

#[test]
fn obstacle_pushed_to_the_edge_joins_across_rooms() {
    let mut w = world(&with_goal(r#"
[[rooms]]
name = "west"
links = { right = "east" }
grid = '''




                                                                             1*
'''

[[rooms]]
name = "east"
links = { left = "west" }
grid = '''




   *
'''
"#));
    assert_eq!(w.obstacles.len(), 2);

    step(&mut w, &[go(Dir::Right)]);
    assert_eq!(w.players[0].pos, Pos::new(0, 78, 4));
    // (west 79,4) and (east 3,4) are neighbours through the inset edge
    assert_eq!(w.obstacles.len(), 1);
    assert_eq!(w.obstacles[0].cells, vec![Pos::new(0, 79, 4), Pos::new(1, 3, 4)]);

    step(&mut w, &[go(Dir::Right)]);
    assert_eq!(w.players[0].pos, Pos::new(0, 78, 4));

    let mut claimed: Vec<Pos> = w.obstacles.iter().flat_map(|o| o.cells.clone()).collect();
    let total = claimed.len();
    claimed.sort();
    claimed.dedup();
    assert_eq!(claimed.len(), total);
}

// ── Springs and boost ──

const SPRING_ROW: &str = r#"
[[rooms]]
name = "track"
grid = '''
#~~~   1    2
'''
"#;

/// Walk into the spring, compress it fully and let go.
fn launch_player_one(w: &mut WorldState) -> Vec<GameEvent> {
    let mut events = step(w, &[go(Dir::Left)]).events;
    events.extend(idle(w, 5));
    assert_eq!(w.players[0].pos, Pos::new(0, 1, 0));
    events.extend(step(w, &[go(Dir::Right)]).events);
    events
}

#[test]
fn spring_compressed_three_launches_at_three_for_nine_ticks() {
    let mut w = world(&with_goal(&SPRING_ROW.replace("    2", "")));
    let events = launch_player_one(&mut w);
    assert!(events.contains(&GameEvent::SpringReleased { player: 0, speed: 3, ticks: 9 }));
    assert_eq!(w.terrain_at(Pos::new(0, 2, 0)), Tile::Spring);

    for i in 1..=9 {
        step(&mut w, &[]);
        assert_eq!(w.players[0].pos, Pos::new(0, 1 + 3 * i, 0), "boost tick {i}");
    }
    assert!(w.players[0].boost.is_none());
    step(&mut w, &[]);
    assert_eq!(w.players[0].pos, Pos::new(0, 28, 0));
}

#[test]
fn boost_passes_to_the_player_it_hits() {
    let mut w = world(&with_goal(SPRING_ROW));
    launch_player_one(&mut w);
    idle(&mut w, 3);
    assert_eq!(w.players[0].pos, Pos::new(0, 10, 0));

    let report = step(&mut w, &[]);
    assert!(report.events.contains(&GameEvent::BoostTransferred { from: 0, to: 1 }));
    assert_eq!(w.players[0].pos, Pos::new(0, 11, 0));
    assert!(w.players[0].boost.is_none());
    // The receiver moves later in the same tick
    assert_eq!(w.players[1].pos, Pos::new(0, 15, 0));
    assert_eq!(w.players[1].boost.map(|b| b.remaining), Some(5));
}

// ── Bombs ──

#[test]
fn bomb_detonates_five_ticks_after_placement() {
    let mut w = world(&with_goal(r#"
[[rooms]]
name = "quarry"
grid = '''
##########
#1@#==   #
##########
'''
"#));
    let hearts = w.hearts;
    step(&mut w, &[go(Dir::Right)]);
    assert_eq!(w.players[0].item, Some(Item::Bomb));

    let placed = step(&mut w, &[Some(Intent::Action)]);
    let at = Pos::new(0, 1, 1);
    assert!(placed.events.contains(&GameEvent::BombPlaced { player: 0, pos: at }));
    assert_eq!(w.terrain_at(at), Tile::LitBomb);
    let t = placed.tick;

    let early = idle(&mut w, 4);
    assert!(!early.iter().any(|e| matches!(e, GameEvent::BombExploded { .. })));

    let blast = step(&mut w, &[]);
    assert_eq!(blast.tick, t + 5);
    assert!(blast.events.contains(&GameEvent::BombExploded { pos: at, walls_cleared: 1 }));
    assert!(blast.events.contains(&GameEvent::LifeLost { player: 0, hearts: hearts - 1 }));
    assert_eq!(w.terrain_at(at), Tile::Empty);
    assert_eq!(w.terrain_at(Pos::new(0, 4, 1)), Tile::Empty);
    assert_eq!(w.terrain_at(Pos::new(0, 5, 1)), Tile::BombableWall);
    assert_eq!(w.terrain_at(Pos::new(0, 3, 1)), Tile::Wall);
}

// ── Darkness ──

#[test]
fn dark_cell_six_away_from_a_torch_blocks() {
    let mut w = world(&with_goal(r#"
[[rooms]]
name = "cellar"
dark = [{ x = 0, y = 0, w = 40, h = 5 }]
grid = '''
          !      1
'''
"#));
    step(&mut w, &[go(Dir::Left)]);
    assert_eq!(w.players[0].pos, Pos::new(0, 17, 0));
    assert_eq!(w.players[0].dir, Dir::Stay);
    assert_eq!(w.shade_at(Pos::new(0, 16, 0)), 3);
}

#[test]
fn torch_bearer_lights_only_their_surroundings() {
    let mut w = world(&with_goal(r#"
[[rooms]]
name = "cellar"
dark = [{ x = 10, y = 0, w = 30, h = 10 }]
grid = '''
     1!





     2
'''
"#));
    step(&mut w, &[go(Dir::Right), go(Dir::Right)]);
    assert_eq!(w.players[0].item, Some(Item::Torch));
    idle(&mut w, 9);
    assert_eq!(w.players[0].pos, Pos::new(0, 15, 0));
    assert_eq!(w.players[1].pos, Pos::new(0, 9, 6));
    assert_eq!(w.players[1].dir, Dir::Stay);
}

// ── Doors, switches, pressure ──

const DOOR_ROOM: &str = r#"
[[rooms]]
name = "vault"
grid = '''
##########
#1a+     #
##########
#2\      #
##########
'''

[[rooms.doors]]
at = [3, 1]
keys = "a"
switches = [{ at = [2, 3], on = true }]
"#;

#[test]
fn door_waits_for_key_and_switch() {
    let mut w = world(&with_goal(DOOR_ROOM));
    let r1 = step(&mut w, &[go(Dir::Right)]);
    assert!(r1.events.contains(&GameEvent::KeyInserted { player: 0, door: 0, key: 'a' }));
    assert!(!w.doors[0].open);
    assert_eq!(w.players[0].item, None);

    let r2 = step(&mut w, &[None, go(Dir::Right)]);
    assert!(r2.events.iter().any(|e| matches!(e, GameEvent::SwitchToggled { on: true, .. })));
    assert!(r2.events.contains(&GameEvent::DoorOpened { door: 0, pos: Pos::new(0, 3, 1) }));
    assert_eq!(w.players[1].pos, Pos::new(0, 1, 3));
    assert_eq!(w.terrain_at(Pos::new(0, 3, 1)), Tile::Empty);

    step(&mut w, &[go(Dir::Right)]);
    assert_eq!(w.players[0].pos, Pos::new(0, 3, 1));
}

#[test]
fn door_refuses_a_foreign_key() {
    let mut w = world(&with_goal(&DOOR_ROOM.replace("#1a+", "#1c+")));
    let report = step(&mut w, &[go(Dir::Right)]);
    assert!(!report.events.iter().any(|e| matches!(e, GameEvent::KeyInserted { .. })));
    step(&mut w, &[]);
    assert_eq!(w.players[0].item, Some(Item::Key('c')));
    assert!(w.doors[0].inserted.is_empty());
    assert_eq!(w.players[0].pos, Pos::new(0, 2, 1));
}

#[test]
fn pressure_target_restores_only_once_vacated() {
    let mut w = world(&with_goal(r#"
[[rooms]]
name = "gate"
grid = '''
#1   #  #
#2_
'''

[[rooms.buttons]]
at = [2, 1]
targets = [[5, 0]]
"#));
    let gate = Pos::new(0, 5, 0);
    step(&mut w, &[go(Dir::Right), go(Dir::Right)]);
    assert_eq!(w.terrain_at(gate), Tile::Empty);
    step(&mut w, &[None, go(Dir::Stay)]);
    idle(&mut w, 2);
    assert_eq!(w.players[0].pos, gate);

    step(&mut w, &[go(Dir::Stay), go(Dir::Left)]);
    assert_eq!(w.players[1].pos, Pos::new(0, 1, 1));
    assert_eq!(w.terrain_at(gate), Tile::Empty, "restore deferred while occupied");

    step(&mut w, &[go(Dir::Right)]);
    assert_eq!(w.players[0].pos, Pos::new(0, 6, 0));
    assert_eq!(w.terrain_at(gate), Tile::Wall);
}

// ── Teleport, transitions, end of game ──

#[test]
fn teleport_door_carries_player_to_another_room() {
    let mut w = world(&with_goal(r#"
[[rooms]]
name = "lab"
grid = '''
#####
#1 +#
#####
#2  #
'''

[[rooms.doors]]
at = [3, 1]
teleport = { room = "annex", at = [2, 2] }

[[rooms]]
name = "annex"
grid = '#'
"#));
    let r1 = step(&mut w, &[go(Dir::Right)]);
    assert!(r1.events.iter().any(|e| matches!(e, GameEvent::DoorOpened { door: 0, .. })));

    let r2 = step(&mut w, &[]);
    assert!(r2.events.contains(&GameEvent::Teleported {
        player: 0,
        from: Pos::new(0, 3, 1),
        to: Pos::new(1, 2, 2),
    }));
    assert!(r2.events.contains(&GameEvent::ScreenTransition { player: 0, room: 1 }));
    assert!(r2.redraw);
    assert_eq!(w.players[0].dir, Dir::Stay);
    assert_eq!(w.phase, Phase::Playing);
}

#[test]
fn everyone_in_the_final_room_wins() {
    let mut w = world(r#"
name = "walk"
final_room = "out"

[[rooms]]
name = "in"
links = { right = "out" }
grid = '''
                                                                               1
'''

[[rooms]]
name = "out"
links = { left = "in" }
grid = "  #"
"#);
    let r1 = step(&mut w, &[go(Dir::Right)]);
    assert!(r1.events.contains(&GameEvent::ScreenTransition { player: 0, room: 1 }));
    assert!(r1.events.contains(&GameEvent::GameEnd { won: true, score: 0 }));
    assert_eq!(w.players[0].pos, Pos::new(1, 0, 0));
    assert_eq!(w.phase, Phase::Won);

    let after = step(&mut w, &[go(Dir::Right)]);
    assert!(after.events.is_empty());
    assert_eq!(w.players[0].pos, Pos::new(1, 0, 0));
}

#[test]
fn riddle_suspends_until_answered() {
    let mut w = world(&with_goal(r#"
[[rooms]]
name = "sphinx"
grid = '''
#1?
'''

[[rooms.riddles]]
at = [2, 0]
question = "What has keys but opens no locks?"
answer = "Piano"
"#));
    let hearts = w.hearts;
    let r = step(&mut w, &[go(Dir::Right)]);
    assert!(r.events.contains(&GameEvent::RiddleEncountered {
        player: 0,
        question: "What has keys but opens no locks?".into(),
    }));
    step(&mut w, &[go(Dir::Left)]);
    assert_eq!(w.players[0].pos, Pos::new(0, 2, 0), "suspended player ignores input");

    let wrong = answer_riddle(&mut w, 0, "organ");
    assert_eq!(wrong.tick, w.tick);
    assert!(wrong.events.contains(&GameEvent::LifeLost { player: 0, hearts: hearts - 1 }));
    assert_eq!(w.terrain_at(Pos::new(0, 2, 0)), Tile::Riddle);

    step(&mut w, &[go(Dir::Left)]);
    step(&mut w, &[go(Dir::Right)]);
    let right = answer_riddle(&mut w, 0, "  PIANO ");
    assert!(right.events.iter().any(|e| matches!(e, GameEvent::RiddleAnswered { correct: true, .. })));
    assert_eq!(w.score, w.rules.riddle_points);
    assert_eq!(w.terrain_at(Pos::new(0, 2, 0)), Tile::Empty);
    assert!(w.players[0].pending_riddle.is_none());
}
