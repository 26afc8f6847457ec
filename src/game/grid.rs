use serde::{Deserialize, Serialize};

use super::random::RandomSource;
use super::tile::{Tile, TileState};
use super::{GameError, Position, MAX_TILE_VALUE};

/// At-rest form of a grid. `cells[x][y]`, matching saved games.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SerializedGrid {
    pub size: usize,
    pub cells: Vec<Vec<Option<TileState>>>,
}

/// Square board of optional tiles, stored column-major as `cells[x][y]`.
///
/// A tile held at `(x, y)` always records `position == (x, y)`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Grid {
    size: usize,
    cells: Vec<Vec<Option<Tile>>>,
}

impl Grid {
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![vec![None; size]; size],
        }
    }

    /// Rebuilds a grid from a saved matrix, rejecting anything that would
    /// break the cell/position invariant.
    pub fn from_serialized(state: &SerializedGrid) -> Result<Self, GameError> {
        let size = state.size;
        if state.cells.len() != size {
            return Err(GameError::corrupt(format!(
                "grid declares size {} but has {} columns",
                size,
                state.cells.len()
            )));
        }

        let mut grid = Grid::empty(size);
        for (x, column) in state.cells.iter().enumerate() {
            if column.len() != size {
                return Err(GameError::corrupt(format!(
                    "column {} has {} cells, expected {}",
                    x,
                    column.len(),
                    size
                )));
            }
            for (y, cell) in column.iter().enumerate() {
                let Some(tile) = cell else { continue };
                if tile.value < 2 || tile.value > MAX_TILE_VALUE || !tile.value.is_power_of_two() {
                    return Err(GameError::corrupt(format!(
                        "tile at ({}, {}) has invalid value {}",
                        x, y, tile.value
                    )));
                }
                if tile.position != Position::new(x as i16, y as i16) {
                    return Err(GameError::corrupt(format!(
                        "tile in cell ({}, {}) records position ({}, {})",
                        x, y, tile.position.x, tile.position.y
                    )));
                }
                grid.cells[x][y] = Some(Tile::from(*tile));
            }
        }
        Ok(grid)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Empty positions, x outer and y inner.
    pub fn available_cells(&self) -> Vec<Position> {
        let mut cells = Vec::new();
        for (x, column) in self.cells.iter().enumerate() {
            for (y, cell) in column.iter().enumerate() {
                if cell.is_none() {
                    cells.push(Position::new(x as i16, y as i16));
                }
            }
        }
        cells
    }

    /// Uniform pick among the empty cells; `None` on a full grid.
    pub fn random_available_cell(&self, random: &mut dyn RandomSource) -> Option<Position> {
        let cells = self.available_cells();
        if cells.is_empty() {
            return None;
        }
        cells.get(random.next_uniform(cells.len())).copied()
    }

    pub fn cells_available(&self) -> bool {
        self.cells.iter().flatten().any(Option::is_none)
    }

    pub fn cell_available(&self, position: Position) -> bool {
        self.cell_content(position).is_none()
    }

    /// Tile at `position`; off-grid positions read as empty.
    pub fn cell_content(&self, position: Position) -> Option<&Tile> {
        let (x, y) = self.index(position)?;
        self.cells[x][y].as_ref()
    }

    /// Places a tile at its own position, replacing whatever was there.
    /// Returns false, leaving the grid untouched, when the tile is off grid.
    pub fn insert_tile(&mut self, tile: Tile) -> bool {
        match self.index(tile.position) {
            Some((x, y)) => {
                self.cells[x][y] = Some(tile);
                true
            }
            None => false,
        }
    }

    /// Clears the cell at the tile's recorded position.
    pub fn remove_tile(&mut self, tile: &Tile) -> Option<Tile> {
        self.take_tile(tile.position)
    }

    pub(crate) fn take_tile(&mut self, position: Position) -> Option<Tile> {
        let (x, y) = self.index(position)?;
        self.cells[x][y].take()
    }

    pub fn within_bounds(&self, position: Position) -> bool {
        self.index(position).is_some()
    }

    pub fn serialize(&self) -> SerializedGrid {
        SerializedGrid {
            size: self.size,
            cells: self
                .cells
                .iter()
                .map(|column| column.iter().map(|cell| cell.as_ref().map(Tile::serialize)).collect())
                .collect(),
        }
    }

    /// Occupied tiles in scan order (x outer, y inner).
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter().flatten().flatten()
    }

    pub(crate) fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.cells.iter_mut().flatten().flatten()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    pub fn value_sum(&self) -> u64 {
        self.tiles().map(|tile| u64::from(tile.value)).sum()
    }

    pub fn max_value(&self) -> u32 {
        self.tiles().map(|tile| tile.value).max().unwrap_or(0)
    }

    /// Values laid out for display, `rows[y][x]`.
    pub fn rows(&self) -> Vec<Vec<Option<u32>>> {
        (0..self.size)
            .map(|y| (0..self.size).map(|x| self.cells[x][y].as_ref().map(|tile| tile.value)).collect())
            .collect()
    }

    fn index(&self, position: Position) -> Option<(usize, usize)> {
        let (x, y) = (position.x, position.y);
        if x < 0 || y < 0 || x as usize >= self.size || y as usize >= self.size {
            return None;
        }
        Some((x as usize, y as usize))
    }
}
