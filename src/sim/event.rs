/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and messages; a
/// recorder can log them next to the tick they happened on.

use crate::domain::entity::{Dir, DoorId, Item, PlayerId, Pos, RoomId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    ScreenTransition { player: PlayerId, room: RoomId },
    LifeLost { player: PlayerId, hearts: u32 },
    RiddleEncountered { player: PlayerId, question: String },
    RiddleAnswered { player: PlayerId, question: String, answer: String, correct: bool },
    GameEnd { won: bool, score: u32 },
    ItemPicked { player: PlayerId, item: Item },
    ItemDropped { player: PlayerId, item: Item, pos: Pos },
    BombPlaced { player: PlayerId, pos: Pos },
    BombExploded { pos: Pos, walls_cleared: usize },
    DoorUnlocked { player: PlayerId, pos: Pos },
    DoorOpened { door: DoorId, pos: Pos },
    KeyInserted { player: PlayerId, door: DoorId, key: char },
    SwitchToggled { player: PlayerId, pos: Pos, on: bool },
    SpringReleased { player: PlayerId, speed: usize, ticks: usize },
    BoostTransferred { from: PlayerId, to: PlayerId },
    Teleported { player: PlayerId, from: Pos, to: Pos },
    ObstaclePushed { player: PlayerId, size: usize, dir: Dir },
}

/// Everything the outside world needs after one tick.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<GameEvent>,
    /// Cells mutated this tick.
    pub dirty: Vec<Pos>,
    /// Full redraw needed (room transition, teleport).
    pub redraw: bool,
}
