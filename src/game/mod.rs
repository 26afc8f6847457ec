use serde::{Deserialize, Serialize};

pub mod grid;
pub mod random;
pub mod resolver;
pub mod session;
pub mod tile;

pub use grid::{Grid, SerializedGrid};
pub use random::{RandomSource, SeededRandom, SequenceRandom, ThreadRandom};
pub use resolver::{resolve, MoveOutcome};
pub use session::{
    Actuator, DedupSubmitter, GameSession, GameStatus, Input, Outcome, ScoreReport,
    ScoreSubmitter, SerializedState, Snapshot,
};
pub use tile::{Tile, TileState};

// ============================================================================
// Configuration
// ============================================================================

pub const DEFAULT_SIZE: usize = 4;
pub const MAX_SIZE: usize = 16;
pub const START_TILES: usize = 2;
pub const WIN_VALUE: u32 = 2048;

/// Largest tile value; pairs of these stay put instead of merging.
pub const MAX_TILE_VALUE: u32 = 1 << 30;

// Spawning: a 4 appears once in every ten spawns on average
pub const SPAWN_ODDS: usize = 10;
pub const SPAWN_FOUR_DRAWS: usize = 1;

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i16,
    pub y: i16,
}

impl Position {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub fn offset(self, (dx, dy): (i16, i16)) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Unit step for this direction; y grows downwards.
    pub fn vector(self) -> (i16, i16) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameEvent {
    Moved { direction: Direction, score_delta: u32 },
    Merged(u32),
    Won(u32),
    GameOver(u32),
    ContinuedAfterWin,
    Restarted,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("corrupt saved state: {reason}")]
    CorruptState { reason: String },
    #[error("invalid game config: {0}")]
    InvalidConfig(String),
}

impl GameError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        GameError::CorruptState {
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use super::*;

    /// Builds a grid from rows of values, `0` meaning empty; `rows[y][x]`.
    pub fn grid_from_rows<const N: usize>(rows: &[[u32; N]]) -> Grid {
        let mut grid = Grid::empty(N);
        for (y, row) in rows.iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                if value != 0 {
                    grid.insert_tile(Tile::new(Position::new(x as i16, y as i16), value));
                }
            }
        }
        grid
    }

    /// Values of a grid as `rows[y][x]`, `0` meaning empty.
    pub fn rows_of(grid: &Grid) -> Vec<Vec<u32>> {
        grid.rows()
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.unwrap_or(0)).collect())
            .collect()
    }

    /// A full board with no two equal neighbours.
    pub fn locked_grid(size: usize) -> Grid {
        let mut grid = Grid::empty(size);
        for x in 0..size {
            for y in 0..size {
                let value = if (x + y) % 2 == 0 { 2 } else { 4 };
                grid.insert_tile(Tile::new(Position::new(x as i16, y as i16), value));
            }
        }
        grid
    }
}
