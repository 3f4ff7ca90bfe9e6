//! Battle map geometry
//!
//! Square board of `size x size` cells with `(0, 0)` in the top-left corner;
//! `y` grows downward.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default board edge length
pub const DEFAULT_BOARD_SIZE: i32 = 20;

/// Largest supported board edge length
pub const MAX_BOARD_SIZE: i32 = 1000;

/// A grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// King-move distance (diagonals count as one step)
    pub fn chebyshev(&self, other: Position) -> i32 {
        distance(self.x.abs_diff(other.x).max(self.y.abs_diff(other.y)))
    }

    /// Orthogonal step distance
    pub fn manhattan(&self, other: Position) -> i32 {
        distance(self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y)))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Direction a token faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    /// Facing after stepping from `from` to `to`.
    ///
    /// The dominant axis wins; vertical wins ties. `None` when the cells are
    /// the same.
    pub fn toward(from: Position, to: Position) -> Option<Facing> {
        let dx = i64::from(to.x) - i64::from(from.x);
        let dy = i64::from(to.y) - i64::from(from.y);
        if dx == 0 && dy == 0 {
            None
        } else if dx.abs() > dy.abs() {
            Some(if dx > 0 { Facing::Right } else { Facing::Left })
        } else {
            Some(if dy > 0 { Facing::Down } else { Facing::Up })
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Facing::Up => "up",
            Facing::Down => "down",
            Facing::Left => "left",
            Facing::Right => "right",
        };
        write!(f, "{}", s)
    }
}

/// Square battle map bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub size: i32,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            size: DEFAULT_BOARD_SIZE,
        }
    }
}

impl Board {
    pub fn new(size: i32) -> Self {
        Self { size }
    }

    /// Whether a cell lies on the board
    pub fn contains(&self, cell: Position) -> bool {
        (0..self.size).contains(&cell.x) && (0..self.size).contains(&cell.y)
    }

    /// The 8 neighbours of `cell` that lie on the board
    pub fn adjacent(&self, cell: Position) -> Vec<Position> {
        let mut cells = self.burst(cell, 1);
        cells.retain(|c| *c != cell);
        cells
    }

    /// Every on-board cell within Chebyshev distance `size` of `center`,
    /// row by row
    pub fn burst(&self, center: Position, size: i32) -> Vec<Position> {
        let size = size.max(0);
        let last = self.size.saturating_sub(1);
        let xs = center.x.saturating_sub(size).max(0)..=center.x.saturating_add(size).min(last);
        let ys = center.y.saturating_sub(size).max(0)..=center.y.saturating_add(size).min(last);

        let mut cells = Vec::new();
        for y in ys {
            for x in xs.clone() {
                cells.push(Position::new(x, y));
            }
        }
        cells
    }

    /// Every on-board cell within Manhattan distance `reach` of `origin`,
    /// `origin` included
    pub fn within_steps(&self, origin: Position, reach: i32) -> Vec<Position> {
        self.burst(origin, reach)
            .into_iter()
            .filter(|c| c.manhattan(origin) <= reach)
            .collect()
    }

    /// Straight line of at most `length` cells from `from` toward `to`.
    ///
    /// Uses Bresenham's algorithm. The line is always traced from the
    /// lexicographically smaller endpoint so that swapping the endpoints
    /// covers the same cells; `from` itself is excluded. Both endpoints must
    /// lie on the board, otherwise the line is empty.
    pub fn line(&self, from: Position, to: Position, length: i32) -> Vec<Position> {
        if from == to || length <= 0 || !self.contains(from) || !self.contains(to) {
            return Vec::new();
        }

        let mut cells = if from <= to {
            bresenham(from, to)
        } else {
            let mut reversed = bresenham(to, from);
            reversed.reverse();
            reversed
        };

        // Drop the origin
        cells.remove(0);
        cells.truncate(length as usize);
        cells
    }
}

fn distance(steps: u32) -> i32 {
    i32::try_from(steps).unwrap_or(i32::MAX)
}

/// Bresenham line including both endpoints
fn bresenham(from: Position, to: Position) -> Vec<Position> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (from.x, from.y);
    let mut cells = Vec::with_capacity((dx - dy) as usize + 1);

    loop {
        cells.push(Position::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}
