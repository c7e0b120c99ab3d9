/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.
///
/// The display glyph is derived from the variant, never the other way round:
/// level text is translated once at load time by `from_glyph`.

use super::entity::Item;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Tile {
    Empty,
    Wall,            // Solid, indestructible
    BombableWall,    // Solid, cleared by a blast
    Key(char),       // Pickup, opens the door with the same letter
    Door(char),      // Solid until the matching key is used
    Bomb,            // Pickup, unlit
    LitBomb,         // Dropped bomb with a running fuse
    Torch,           // Pickup, light source while lying on the floor
    Obstacle,        // Member cell of a pushable obstacle
    Spring,          // Member cell of a spring
    Switch { on: bool },
    PressureButton,  // Walkable, clears linked cells while occupied
    SpecialDoor,     // Opens on keys + switch states
    Riddle,          // Walkable, suspends the player until answered
}

impl Tile {
    /// Translate a level glyph. Player spawn digits are handled by the loader.
    pub fn from_glyph(ch: char) -> Option<Tile> {
        let tile = match ch {
            ' ' | '.' => Tile::Empty,
            '#' => Tile::Wall,
            '=' => Tile::BombableWall,
            'a'..='z' => Tile::Key(ch),
            'A'..='Z' => Tile::Door(ch.to_ascii_lowercase()),
            '@' => Tile::Bomb,
            '%' => Tile::LitBomb,
            '!' => Tile::Torch,
            '*' => Tile::Obstacle,
            '~' => Tile::Spring,
            '\\' => Tile::Switch { on: false },
            '/' => Tile::Switch { on: true },
            '_' => Tile::PressureButton,
            '+' => Tile::SpecialDoor,
            '?' => Tile::Riddle,
            _ => return None,
        };
        Some(tile)
    }

    pub fn glyph(self) -> char {
        match self {
            Tile::Empty => ' ',
            Tile::Wall => '#',
            Tile::BombableWall => '=',
            Tile::Key(c) => c,
            Tile::Door(c) => c.to_ascii_uppercase(),
            Tile::Bomb => '@',
            Tile::LitBomb => '%',
            Tile::Torch => '!',
            Tile::Obstacle => '*',
            Tile::Spring => '~',
            Tile::Switch { on: false } => '\\',
            Tile::Switch { on: true } => '/',
            Tile::PressureButton => '_',
            Tile::SpecialDoor => '+',
            Tile::Riddle => '?',
        }
    }

    /// The item a player picks up from this tile, if any.
    pub fn item(self) -> Option<Item> {
        match self {
            Tile::Key(c) => Some(Item::Key(c)),
            Tile::Bomb => Some(Item::Bomb),
            Tile::Torch => Some(Item::Torch),
            _ => None,
        }
    }

    /// Blocks a plain step. Doors, obstacles and springs have their own
    /// resolution path and are still reported solid here.
    pub fn is_solid(self) -> bool {
        matches!(
            self,
            Tile::Wall
                | Tile::BombableWall
                | Tile::Door(_)
                | Tile::LitBomb
                | Tile::Obstacle
                | Tile::Spring
                | Tile::SpecialDoor
        )
    }

    /// A player may stand here.
    pub fn is_walkable(self) -> bool {
        !self.is_solid()
    }

    /// Wall-like for spring anchoring.
    pub fn is_wall(self) -> bool {
        matches!(self, Tile::Wall | Tile::BombableWall)
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::Empty
    }
}
