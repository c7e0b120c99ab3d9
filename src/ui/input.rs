/// Keyboard input: per-frame key state plus the mapping from keys to
/// player intents.
///
/// Movement keys are edge-triggered because a movement intent persists
/// inside the simulation until the player is blocked. The same drained
/// events feed the riddle prompt as typed text.
///
///   Player 1: w a x d move, s stay, e action
///   Player 2: i j m l move, k stay, o action
///
/// Release events are honored when the terminal reports them; otherwise a
/// key expires after a hold timeout.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, poll};

use duskrooms::domain::entity::{Dir, Intent};

/// After this long without a Press/Repeat event a key counts as released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Keys controlling one player.
#[derive(Clone, Copy, Debug)]
pub struct KeyBindings {
    pub up: char,
    pub left: char,
    pub down: char,
    pub right: char,
    pub stay: char,
    pub action: char,
}

pub const KEYBOARD_PLAYERS: [KeyBindings; 2] = [
    KeyBindings { up: 'w', left: 'a', down: 'x', right: 'd', stay: 's', action: 'e' },
    KeyBindings { up: 'i', left: 'j', down: 'm', right: 'l', stay: 'k', action: 'o' },
];

impl KeyBindings {
    fn dir_for(&self, c: char) -> Option<Dir> {
        match c {
            c if c == self.up => Some(Dir::Up),
            c if c == self.left => Some(Dir::Left),
            c if c == self.down => Some(Dir::Down),
            c if c == self.right => Some(Dir::Right),
            c if c == self.stay => Some(Dir::Stay),
            _ => None,
        }
    }
}

pub struct InputState {
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    pub raw_events: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events. Call once per frame before the tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key);
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, key: KeyEvent) {
        self.raw_events.push(key);
        let code = normalize(key.code);
        match key.kind {
            KeyEventKind::Release => {
                self.last_active.remove(&code);
            }
            _ => {
                let was_held = self.is_held(code);
                self.last_active.insert(code, Instant::now());
                if !was_held {
                    self.fresh_presses.push(code);
                }
            }
        }
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .is_some_and(|t| t.elapsed() < HOLD_TIMEOUT)
    }

    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    /// One intent slot per keyboard player. Action wins over movement
    /// when both were pressed in the same frame.
    pub fn keyboard_intents(&self) -> [Option<Intent>; 2] {
        let mut out = [None; 2];
        for (slot, keys) in out.iter_mut().zip(KEYBOARD_PLAYERS.iter()) {
            for code in &self.fresh_presses {
                let KeyCode::Char(c) = *code else { continue };
                if c == keys.action {
                    *slot = Some(Intent::Action);
                    break;
                }
                if let Some(d) = keys.dir_for(c) {
                    *slot = Some(Intent::Move(d));
                }
            }
        }
        out
    }

    /// Key presses of this frame as prompt edits, in arrival order.
    pub fn text_edits(&self) -> Vec<TextEdit> {
        self.raw_events
            .iter()
            .filter(|k| k.kind != KeyEventKind::Release)
            .filter_map(|k| match k.code {
                KeyCode::Enter => Some(TextEdit::Submit),
                KeyCode::Backspace => Some(TextEdit::Backspace),
                KeyCode::Esc => Some(TextEdit::Cancel),
                KeyCode::Char(c) if !k.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(TextEdit::Insert(c))
                }
                _ => None,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextEdit {
    Insert(char),
    Backspace,
    Submit,
    Cancel,
}

/// Shift does not change which key a player pressed.
fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut InputState, c: char) {
        input.record(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    }

    #[test]
    fn keys_map_to_their_own_player() {
        let mut input = InputState::new();
        press(&mut input, 'd');
        press(&mut input, 'I');
        let intents = input.keyboard_intents();
        assert_eq!(intents[0], Some(Intent::Move(Dir::Right)));
        assert_eq!(intents[1], Some(Intent::Move(Dir::Up)));
    }

    #[test]
    fn action_beats_movement() {
        let mut input = InputState::new();
        press(&mut input, 'a');
        press(&mut input, 'e');
        assert_eq!(input.keyboard_intents()[0], Some(Intent::Action));
        assert_eq!(input.keyboard_intents()[1], None);
    }

    #[test]
    fn held_key_does_not_refire() {
        let mut input = InputState::new();
        press(&mut input, 's');
        input.fresh_presses.clear();
        press(&mut input, 's');
        assert_eq!(input.keyboard_intents()[0], None);
    }

    #[test]
    fn typed_text_becomes_edits() {
        let mut input = InputState::new();
        press(&mut input, 'o');
        input.record(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        input.record(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(
            input.text_edits(),
            vec![TextEdit::Insert('o'), TextEdit::Backspace, TextEdit::Submit]
        );
    }
}
