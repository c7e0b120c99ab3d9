/// Presentation layer: double-buffered, diff-based terminal renderer.
///
///   1. Compose the next frame into `front`
///   2. Compare each cell with `back` (the previous frame)
///   3. Emit terminal commands only for changed cells, batched with `queue!`
///   4. Swap front/back
///
/// One room fills the map area at one terminal column per cell:
///
///   row 0          legend (level, hearts, score, carried items)
///   rows 1..=25    the camera player's room
///   row 26         message line
///   row 27         riddle prompt or key help

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use duskrooms::domain::darkness::{LIT, PITCH_BLACK};
use duskrooms::domain::entity::{Item, Pos, RoomId};
use duskrooms::domain::room::{ROOM_H, ROOM_W};
use duskrooms::domain::tile::Tile;
use duskrooms::sim::world::{Phase, WorldState};

// ── Cell ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Every cell gets this explicit background so row gaps match on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 18, b: 28 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell; forces a repaint of every position.
    const INVALID: Cell = Cell { ch: '\u{0}', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color) -> Self {
        Cell { ch, fg, bg: Self::BASE_BG }
    }
}

// ── FrameBuffer ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            *self = FrameBuffer::new(w, h);
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i, y, Cell::new(ch, fg));
        }
    }
}

// ── Overlay state owned by the frontend ──

/// Frontend-only state drawn over the world.
#[derive(Clone, Debug, Default)]
pub struct Hud {
    pub camera: usize,
    pub message: String,
    pub prompt: Option<RiddlePrompt>,
}

/// Open riddle prompt: who is answering, the question, and the answer typed so far.
#[derive(Clone, Debug, Default)]
pub struct RiddlePrompt {
    pub player: usize,
    pub question: String,
    pub typed: String,
}

// ── Renderer ──

const LEGEND_ROW: usize = 0;
const MAP_ROW: usize = 1;
const MESSAGE_ROW: usize = MAP_ROW + ROOM_H;
const PROMPT_ROW: usize = MESSAGE_ROW + 1;

const PLAYER_COLORS: [Color; 4] = [Color::Cyan, Color::Yellow, Color::Green, Color::Magenta];

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    last_room: Option<RoomId>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            last_room: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        let (tw, th) = terminal::size().unwrap_or((ROOM_W as u16, PROMPT_ROW as u16 + 1));
        self.front.resize(tw as usize, th as usize);
        self.back.resize(tw as usize, th as usize);
        self.invalidate();
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    /// Repaint everything on the next frame.
    pub fn invalidate(&mut self) {
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &WorldState, hud: &Hud) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((ROOM_W as u16, PROMPT_ROW as u16 + 1));
        if tw as usize != self.front.width || th as usize != self.front.height {
            self.front.resize(tw as usize, th as usize);
            self.back.resize(tw as usize, th as usize);
            self.invalidate();
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        let room = world.players.get(hud.camera).map(|p| p.pos.room).unwrap_or(0);
        if self.last_room != Some(room) {
            self.invalidate();
            self.last_room = Some(room);
        }

        self.front.clear();
        compose(&mut self.front, world, hud, room);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }
        self.writer.flush()
    }
}

// ── Compose ──

fn compose(buf: &mut FrameBuffer, w: &WorldState, hud: &Hud, room: RoomId) {
    compose_legend(buf, w, room);

    let sources = w.light_sources(room);
    let Some(r) = w.rooms.get(room) else { return };
    for y in 0..ROOM_H {
        for x in 0..ROOM_W {
            let shade = duskrooms::domain::darkness::shade_at(r, x, y, &sources);
            buf.set(x, MAP_ROW + y, tile_cell(w.terrain_at(Pos::new(room, x, y)), shade));
        }
    }

    // Players are drawn regardless of darkness
    for p in w.players.iter().filter(|p| p.pos.room == room) {
        let digit = char::from_digit((p.id + 1) as u32, 10).unwrap_or('P');
        let fg = PLAYER_COLORS[p.id % PLAYER_COLORS.len()];
        buf.set(p.pos.x, MAP_ROW + p.pos.y, Cell { ch: digit, fg, bg: Color::DarkGrey });
    }

    buf.put_str(0, MESSAGE_ROW, &hud.message, Color::White);

    match (&hud.prompt, w.phase) {
        (_, Phase::Won) => buf.put_str(0, PROMPT_ROW, &format!("All players made it out! Score {}. Esc to quit.", w.score), Color::Green),
        (_, Phase::Lost) => buf.put_str(0, PROMPT_ROW, "Out of hearts. Esc to quit.", Color::Red),
        (Some(p), _) => {
            let line = format!("P{}: {} > {}_", p.player + 1, p.question, p.typed);
            buf.put_str(0, PROMPT_ROW, &line, Color::Yellow);
        }
        (None, _) => buf.put_str(
            0,
            PROMPT_ROW,
            "P1 wax d/s/e  P2 ijml/k/o  Tab camera  Esc quit",
            Color::DarkGrey,
        ),
    }
}

fn compose_legend(buf: &mut FrameBuffer, w: &WorldState, room: RoomId) {
    let room_name = w.rooms.get(room).map(|r| r.name.as_str()).unwrap_or("?");
    let mut legend = format!(
        " {} / {}  {}  Score:{:<5}",
        w.level_name,
        room_name,
        "♥".repeat(w.hearts as usize),
        w.score,
    );
    for p in &w.players {
        let item = p.item.map(Item::label).unwrap_or_else(|| "-".into());
        legend.push_str(&format!("  P{}:{item}", p.id + 1));
    }
    buf.put_str(0, LEGEND_ROW, &legend, Color::White);
}

/// Terrain glyph and color, replaced by a shade block in the dark.
fn tile_cell(tile: Tile, shade: u8) -> Cell {
    if shade > LIT {
        let ch = match shade {
            1 => '░',
            2 => '▒',
            3 => '▓',
            _ => '█',
        };
        let fg = if shade >= PITCH_BLACK { Color::Black } else { Color::DarkGrey };
        return Cell::new(ch, fg);
    }
    let fg = match tile {
        Tile::Empty => Color::White,
        Tile::Wall => Color::Grey,
        Tile::BombableWall => Color::DarkYellow,
        Tile::Key(_) | Tile::Door(_) => Color::Yellow,
        Tile::Bomb | Tile::LitBomb => Color::Red,
        Tile::Torch => Color::Rgb { r: 255, g: 170, b: 40 },
        Tile::Obstacle => Color::DarkCyan,
        Tile::Spring => Color::Green,
        Tile::Switch { on: true } => Color::Green,
        Tile::Switch { on: false } => Color::DarkGreen,
        Tile::PressureButton => Color::Blue,
        Tile::SpecialDoor => Color::Magenta,
        Tile::Riddle => Color::Cyan,
    };
    Cell::new(tile.glyph(), fg)
}
