//! Grid geometry: positions, cardinal directions, and tiles.
//!
//! Rows grow downward and columns grow rightward, so `Direction::Up`
//! decrements the row.  All arithmetic is on `i32` so that neighbor
//! enumeration at the map border never underflows; callers filter
//! out-of-map positions through the distance engine.

use std::fmt;

// ── Position ──────────────────────────────────────────────────────────────────

/// An integer grid coordinate.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// L1 distance ignoring walls.
    #[inline]
    pub fn manhattan(self, other: Position) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// The position one step away in `dir`.
    #[inline]
    pub fn step(self, dir: Direction) -> Position {
        let (dr, dc) = dir.delta();
        Position::new(self.row + dr, self.col + dc)
    }

    /// The four cardinal neighbors, in `Direction::ALL` order.
    ///
    /// No crossability check happens here; see
    /// `DistanceEngine::adjacent` for walkable neighbors.
    #[inline]
    pub fn neighbors(self) -> [Position; 4] {
        Direction::ALL.map(|d| self.step(d))
    }

    /// Direction of the single step from `self` to `other`, or `None` if the
    /// two positions are not 4-adjacent.
    pub fn direction_to(self, other: Position) -> Option<Direction> {
        Direction::ALL.into_iter().find(|&d| self.step(d) == other)
    }

    /// Euclidean distance, used by the Gaussian promise kernels.
    #[inline]
    pub fn euclidean(self, other: Position) -> f64 {
        let dr = (self.row - other.row) as f64;
        let dc = (self.col - other.col) as f64;
        (dr * dr + dc * dc).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(i32, i32)> for Position {
    #[inline]
    fn from((row, col): (i32, i32)) -> Self {
        Position::new(row, col)
    }
}

// ── Direction ─────────────────────────────────────────────────────────────────

/// One of the four moves an agent can make.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// `(d_row, d_col)` offset of one step.
    #[inline]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up    => (-1, 0),
            Direction::Down  => (1, 0),
            Direction::Left  => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    #[inline]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Up    => Direction::Down,
            Direction::Down  => Direction::Up,
            Direction::Left  => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up    => "up",
            Direction::Down  => "down",
            Direction::Left  => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Tile ──────────────────────────────────────────────────────────────────────

/// A map cell.  Created once at map load and never mutated.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub position:  Position,
    pub crossable: bool,
    pub delivery:  bool,
    pub spawn:     bool,
}

impl Tile {
    /// A plain walkable tile.
    pub const fn floor(position: Position) -> Self {
        Self { position, crossable: true, delivery: false, spawn: false }
    }

    /// A non-walkable tile.
    pub const fn wall(position: Position) -> Self {
        Self { position, crossable: false, delivery: false, spawn: false }
    }

    /// A walkable delivery tile.
    pub const fn delivery(position: Position) -> Self {
        Self { position, crossable: true, delivery: true, spawn: false }
    }

    /// A walkable tile on which parcels may appear.
    pub const fn spawn(position: Position) -> Self {
        Self { position, crossable: true, delivery: false, spawn: true }
    }
}
