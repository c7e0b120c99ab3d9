/// Gamepad input via gilrs.
///
/// Pads are assigned to players in the order they are first seen, so the
/// first pad drives player 1 and the second drives player 2. Button roles
/// come from the `[gamepad]` section of config.toml:
///   D-pad / Left Stick   →  Move (edge-triggered)
///   action (A / X)       →  Action
///   stay   (B / Y)       →  Stay
///   camera (Select)      →  Cycle camera

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};
#[cfg(feature = "gamepad")]
use tracing::info;

use duskrooms::config::GamepadConfig;
use duskrooms::domain::entity::{Dir, Intent};

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.4;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,
    B,
    X,
    Y,
    L1,
    R1,
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER" => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

struct RoleMap {
    action: Vec<Btn>,
    stay: Vec<Btn>,
    camera: Vec<Btn>,
}

impl RoleMap {
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse(names: &[String], fallback: &[Btn]) -> Vec<Btn> {
            let v: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if v.is_empty() { fallback.to_vec() } else { v }
        }
        RoleMap {
            action: parse(&cfg.action, &[Btn::A, Btn::X]),
            stay: parse(&cfg.stay, &[Btn::B, Btn::Y]),
            camera: parse(&cfg.camera, &[Btn::Select]),
        }
    }
}

/// Edge state of one pad, cleared every frame.
#[derive(Clone, Debug, Default)]
struct PadFrame {
    pressed: Vec<Btn>,
    /// Last fresh direction from d-pad or stick.
    dir: Option<Dir>,
    stick: (f32, f32),
    stick_dir: Option<Dir>,
}

impl PadFrame {
    fn clear(&mut self) {
        self.pressed.clear();
        self.dir = None;
    }

    fn intent(&self, roles: &RoleMap) -> Option<Intent> {
        let hit = |set: &[Btn]| self.pressed.iter().any(|b| set.contains(b));
        if hit(&roles.action) {
            Some(Intent::Action)
        } else if hit(&roles.stay) {
            Some(Intent::Move(Dir::Stay))
        } else {
            self.dir.map(Intent::Move)
        }
    }

    /// Stick crossing the deadzone counts as a fresh direction once.
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn update_stick(&mut self) {
        let (x, y) = self.stick;
        let now = if x.abs() < STICK_DEADZONE && y.abs() < STICK_DEADZONE {
            None
        } else if x.abs() >= y.abs() {
            Some(if x > 0.0 { Dir::Right } else { Dir::Left })
        } else {
            Some(if y > 0.0 { Dir::Up } else { Dir::Down })
        };
        if now.is_some() && now != self.stick_dir {
            self.dir = now;
        }
        self.stick_dir = now;
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,
    #[cfg(feature = "gamepad")]
    ids: Vec<GamepadId>,
    pads: Vec<PadFrame>,
    roles: RoleMap,
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: match Gilrs::new() {
                Ok(g) => Some(g),
                Err(e) => {
                    tracing::warn!("gamepad support unavailable: {e}");
                    None
                }
            },
            #[cfg(feature = "gamepad")]
            ids: Vec::new(),
            pads: Vec::new(),
            roles: RoleMap::from_config(cfg),
        }
    }

    pub fn update(&mut self) {
        for p in &mut self.pads {
            p.clear();
        }
        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let Some(gilrs) = &mut self.gilrs else { return };
        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for ev in events {
            let slot = match self.ids.iter().position(|&id| id == ev.id) {
                Some(i) => i,
                None => {
                    self.ids.push(ev.id);
                    self.pads.push(PadFrame::default());
                    info!(pad = self.ids.len() - 1, "gamepad attached");
                    self.ids.len() - 1
                }
            };
            let pad = &mut self.pads[slot];
            match ev.event {
                EventType::ButtonPressed(btn, _) => match btn {
                    Button::DPadUp => pad.dir = Some(Dir::Up),
                    Button::DPadDown => pad.dir = Some(Dir::Down),
                    Button::DPadLeft => pad.dir = Some(Dir::Left),
                    Button::DPadRight => pad.dir = Some(Dir::Right),
                    other => {
                        if let Some(b) = Btn::from_gilrs(other) {
                            pad.pressed.push(b);
                        }
                    }
                },
                EventType::AxisChanged(Axis::LeftStickX, v, _) => pad.stick.0 = v,
                EventType::AxisChanged(Axis::LeftStickY, v, _) => pad.stick.1 = v,
                EventType::Disconnected => *pad = PadFrame::default(),
                _ => {}
            }
        }

        for pad in &mut self.pads {
            pad.update_stick();
        }
    }

    /// Intent of the pad assigned to `player`, if any.
    pub fn intent(&self, player: usize) -> Option<Intent> {
        self.pads.get(player).and_then(|p| p.intent(&self.roles))
    }

    pub fn camera_pressed(&self) -> bool {
        self.pads
            .iter()
            .any(|p| p.pressed.iter().any(|b| self.roles.camera.contains(b)))
    }
}
