/// Entry point and game loop.

mod ui;

use std::collections::VecDeque;
use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use duskrooms::config::GameConfig;
use duskrooms::domain::entity::{Intent, PlayerId};
use duskrooms::sim::event::GameEvent;
use duskrooms::sim::level::load_level;
use duskrooms::sim::step;
use duskrooms::sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{InputState, TextEdit};
use ui::renderer::{Hud, Renderer, RiddlePrompt};
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_tracing(&config);

    let mut world = match load_level(config.level_file.as_deref(), config.rules) {
        Ok(w) => w,
        Err(e) => {
            error!("level load failed: {e}");
            eprintln!("duskrooms: {e}");
            std::process::exit(1);
        }
    };
    info!(level = %world.level_name, rooms = world.rooms.len(), players = world.players.len(), "level loaded");

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        error!("game loop aborted: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    match world.phase {
        Phase::Won => println!("Escaped from {} with {} points.", world.level_name, world.score),
        Phase::Lost => println!("Lost in {} with {} points.", world.level_name, world.score),
        Phase::Playing => println!("Left {} after {} ticks.", world.level_name, world.tick),
    }
}

/// Log to the configured file. `RUST_LOG` overrides the configured filter.
fn init_tracing(config: &GameConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let Ok(file) = File::create(&config.log_file) else {
        // The terminal is ours while playing, so no stderr fallback.
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new(&config.gamepad);
    let tick_rate = Duration::from_millis(config.rules.tick_rate_ms);
    let mut last_tick = Instant::now();

    let mut hud = Hud::default();
    let mut riddles: VecDeque<(PlayerId, String)> = VecDeque::new();
    // Latest intent per player since the last tick
    let mut pending: Vec<Option<Intent>> = vec![None; world.players.len()];

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        if kb.was_pressed(KeyCode::Tab) || gp.camera_pressed() {
            hud.camera = (hud.camera + 1) % world.players.len().max(1);
        }

        if let Some(prompt) = hud.prompt.as_mut() {
            // Letters belong to the answer while the prompt is open
            for edit in kb.text_edits() {
                match edit {
                    TextEdit::Insert(c) => prompt.typed.push(c),
                    TextEdit::Backspace => { prompt.typed.pop(); }
                    TextEdit::Cancel => prompt.typed.clear(),
                    TextEdit::Submit => {
                        let report = step::answer_riddle(world, prompt.player, &prompt.typed);
                        handle_events(&report.events, &mut hud.message, &mut riddles, sound);
                        hud.prompt = None;
                        break;
                    }
                }
            }
        } else {
            if kb.was_pressed(KeyCode::Esc) {
                break;
            }
            for (pid, intent) in kb.keyboard_intents().into_iter().enumerate() {
                if let (Some(i), Some(slot)) = (intent, pending.get_mut(pid)) {
                    *slot = Some(i);
                }
            }
        }
        for (pid, slot) in pending.iter_mut().enumerate() {
            if let Some(i) = gp.intent(pid) {
                *slot = Some(i);
            }
        }

        if hud.prompt.is_none() {
            if let Some((player, question)) = riddles.pop_front() {
                hud.prompt = Some(RiddlePrompt { player, question, typed: String::new() });
            }
        }

        // The world holds still while someone is answering
        if world.phase == Phase::Playing && hud.prompt.is_none() && last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            let report = step::step(world, &pending);
            pending.iter_mut().for_each(|s| *s = None);
            if report.redraw {
                renderer.invalidate();
            }
            handle_events(&report.events, &mut hud.message, &mut riddles, sound);
        }

        renderer.render(world, &hud)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Sound cues, the message line and the riddle queue for one batch of events.
fn handle_events(
    events: &[GameEvent],
    message: &mut String,
    riddles: &mut VecDeque<(PlayerId, String)>,
    sound: Option<&SoundEngine>,
) {
    if let Some(sfx) = sound {
        sfx.play_events(events);
    }
    for ev in events {
        if let GameEvent::RiddleEncountered { player, question } = ev {
            riddles.push_back((*player, question.clone()));
        }
        if let Some(text) = describe(ev) {
            *message = text;
        }
    }
}

/// Message line text for an event.
fn describe(ev: &GameEvent) -> Option<String> {
    let text = match ev {
        GameEvent::ItemPicked { player, item } => format!("P{} picked up the {}", player + 1, item.label()),
        GameEvent::ItemDropped { player, item, .. } => format!("P{} dropped the {}", player + 1, item.label()),
        GameEvent::BombPlaced { player, .. } => format!("P{} lit a bomb!", player + 1),
        GameEvent::BombExploded { walls_cleared, .. } => format!("Boom! {walls_cleared} walls crumble"),
        GameEvent::LifeLost { player, hearts } => format!("P{} lost a heart ({hearts} left)", player + 1),
        GameEvent::DoorUnlocked { player, .. } => format!("P{} unlocked a door", player + 1),
        GameEvent::KeyInserted { player, key, .. } => format!("P{} inserted key {key}", player + 1),
        GameEvent::DoorOpened { .. } => "A heavy door grinds open".into(),
        GameEvent::SwitchToggled { on, .. } => format!("Click. The switch is now {}", if *on { "on" } else { "off" }),
        GameEvent::SpringReleased { player, speed, .. } => format!("P{} is launched at speed {speed}", player + 1),
        GameEvent::BoostTransferred { from, to } => format!("P{} knocks P{} flying", from + 1, to + 1),
        GameEvent::Teleported { player, .. } => format!("P{} steps through the portal", player + 1),
        GameEvent::RiddleAnswered { correct: true, .. } => "Correct!".into(),
        GameEvent::RiddleAnswered { correct: false, answer, .. } => format!("\"{answer}\" is not the answer"),
        GameEvent::GameEnd { won: true, score } => format!("Victory! Final score {score}"),
        GameEvent::GameEnd { won: false, score } => format!("Game over. Final score {score}"),
        GameEvent::RiddleEncountered { .. }
        | GameEvent::ScreenTransition { .. }
        | GameEvent::ObstaclePushed { .. } => return None,
    };
    Some(text)
}
