use serde::{Deserialize, Serialize};

use super::Position;

/// At-rest form of a tile: lineage and previous position are dropped.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TileState {
    pub position: Position,
    pub value: u32,
}

/// A numbered piece on the board.
///
/// `previous_position` and `merged_from` only describe the latest move and
/// exist for renderers that animate the transition.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tile {
    pub position: Position,
    pub value: u32,
    pub previous_position: Option<Position>,
    pub merged_from: Option<Box<[Tile; 2]>>,
}

impl Tile {
    pub fn new(position: Position, value: u32) -> Self {
        Self {
            position,
            value,
            previous_position: None,
            merged_from: None,
        }
    }

    /// Records the current position as the pre-move position.
    pub fn save_position(&mut self) {
        self.previous_position = Some(self.position);
    }

    pub fn update_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn serialize(&self) -> TileState {
        TileState {
            position: self.position,
            value: self.value,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.merged_from.is_some()
    }
}

impl From<TileState> for Tile {
    fn from(state: TileState) -> Self {
        Tile::new(state.position, state.value)
    }
}
