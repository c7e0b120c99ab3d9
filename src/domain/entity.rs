/// Entities: Player, Bomb, and the small value types every engine shares
/// (direction, position, intent, carried item).
///
/// Compression state of a spring lives on the player engaging it, not on the
/// spring, and a player is never both engaged and boosted.

pub type RoomId = usize;
pub type PlayerId = usize;
pub type ObstacleId = usize;
pub type SpringId = usize;
pub type DoorId = usize;

/// Movement direction. `Stay` is a real heading: it is what a blocked
/// player falls back to and what releases an engaged spring.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Dir {
    Up,
    Right,
    Down,
    Left,
    Stay,
}

impl Dir {
    /// Cardinal directions in resolution order.
    pub const CARDINALS: [Dir; 4] = [Dir::Up, Dir::Right, Dir::Down, Dir::Left];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Right => (1, 0),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Stay => (0, 0),
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Right => Dir::Left,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Stay => Dir::Stay,
        }
    }

    pub fn is_perpendicular(self, other: Dir) -> bool {
        let horizontal = |d: Dir| matches!(d, Dir::Left | Dir::Right);
        let vertical = |d: Dir| matches!(d, Dir::Up | Dir::Down);
        (horizontal(self) && vertical(other)) || (vertical(self) && horizontal(other))
    }
}

/// A cell in the world: room plus in-room coordinates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct Pos {
    pub room: RoomId,
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub fn new(room: RoomId, x: usize, y: usize) -> Self {
        Pos { room, x, y }
    }

    pub fn manhattan(self, other: Pos) -> Option<usize> {
        (self.room == other.room).then(|| self.x.abs_diff(other.x) + self.y.abs_diff(other.y))
    }

    pub fn chebyshev(self, other: Pos) -> Option<usize> {
        (self.room == other.room).then(|| self.x.abs_diff(other.x).max(self.y.abs_diff(other.y)))
    }
}

/// One buffered input for one player for one tick.
/// Movement persists on the player until blocked or replaced;
/// `Action` is edge-triggered and applies to the tick it arrives in.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Intent {
    Move(Dir),
    Action,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Item {
    Key(char),
    Bomb,
    Torch,
}

impl Item {
    pub fn label(self) -> String {
        match self {
            Item::Key(c) => format!("key {c}"),
            Item::Bomb => "bomb".into(),
            Item::Torch => "torch".into(),
        }
    }
}

/// Cursor into a spring while a player is compressing it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SpringContact {
    pub spring: SpringId,
    pub compressed: usize,
}

/// Post-release launch.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Boost {
    pub speed: usize,
    pub remaining: usize,
    pub dir: Dir,
    /// The launching spring; its cells do not block the boosted player.
    pub origin: Option<SpringId>,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub pos: Pos,
    pub dir: Dir,
    pub facing: Dir,
    pub item: Option<Item>,
    pub spring: Option<SpringContact>,
    pub boost: Option<Boost>,
    pub pending_riddle: Option<Pos>,
}

impl Player {
    pub fn new(id: PlayerId, pos: Pos) -> Self {
        Player {
            id,
            pos,
            dir: Dir::Stay,
            facing: Dir::Right,
            item: None,
            spring: None,
            boost: None,
            pending_riddle: None,
        }
    }

    pub fn has_torch(&self) -> bool {
        self.item == Some(Item::Torch)
    }

    /// Heading that counts for cooperative force: the boost direction while
    /// launched, otherwise the buffered direction.
    pub fn heading(&self) -> Dir {
        self.boost.map(|b| b.dir).unwrap_or(self.dir)
    }

    /// Push strength on its own: boost speed while launched, else 1.
    pub fn base_force(&self) -> usize {
        self.boost.map(|b| b.speed).unwrap_or(1)
    }
}

/// A dropped, lit bomb.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Bomb {
    pub pos: Pos,
    pub fuse: u32,
    /// Tick the bomb was dropped on; the fuse does not run on that tick.
    pub placed_tick: u64,
}
