use super::grid::Grid;
use super::tile::Tile;
use super::{Direction, Position, MAX_TILE_VALUE};

/// Result of sliding a grid in one direction, before any tile is spawned.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveOutcome {
    pub grid: Grid,
    pub score_delta: u32,
    pub moved: bool,
    pub reached_win: bool,
}

/// Cell visitation order for a move: the axis being moved along is walked
/// from the destination edge back, so blocking tiles settle first.
pub fn build_traversals(size: usize, direction: Direction) -> (Vec<usize>, Vec<usize>) {
    let (dx, dy) = direction.vector();
    let mut xs: Vec<usize> = (0..size).collect();
    let mut ys: Vec<usize> = (0..size).collect();
    if dx == 1 {
        xs.reverse();
    }
    if dy == 1 {
        ys.reverse();
    }
    (xs, ys)
}

/// Steps from `cell` while the next cell is on the grid and empty.
///
/// Returns the last empty position reached and the first position past it,
/// which is either occupied or off the grid.
pub fn find_farthest_position(grid: &Grid, cell: Position, vector: (i16, i16)) -> (Position, Position) {
    let mut previous = cell;
    let mut next = cell.offset(vector);
    while grid.within_bounds(next) && grid.cell_available(next) {
        previous = next;
        next = next.offset(vector);
    }
    (previous, next)
}

/// Slides every tile in `direction` on a copy of `grid`.
///
/// Each tile merges into an equal neighbour at most once, and a tile
/// created by a merge cannot absorb another tile during the same move.
pub fn resolve(grid: &Grid, direction: Direction, win_value: u32) -> MoveOutcome {
    let mut grid = grid.clone();
    prepare_tiles(&mut grid);

    let vector = direction.vector();
    let (xs, ys) = build_traversals(grid.size(), direction);
    let mut score_delta: u32 = 0;
    let mut moved = false;
    let mut reached_win = false;

    for &x in &xs {
        for &y in &ys {
            let cell = Position::new(x as i16, y as i16);
            let Some(mut tile) = grid.take_tile(cell) else {
                continue;
            };

            let (farthest, next) = find_farthest_position(&grid, cell, vector);
            let mergeable = grid
                .cell_content(next)
                .is_some_and(|other| can_merge(&tile, other) && !other.is_merged());

            match mergeable.then(|| grid.take_tile(next)).flatten() {
                Some(other) => {
                    tile.update_position(next);
                    let mut merged = Tile::new(next, tile.value * 2);
                    merged.merged_from = Some(Box::new([tile, other]));

                    score_delta = score_delta.saturating_add(merged.value);
                    if merged.value == win_value {
                        reached_win = true;
                    }
                    grid.insert_tile(merged);
                    moved = true;
                }
                None => {
                    tile.update_position(farthest);
                    if farthest != cell {
                        moved = true;
                    }
                    grid.insert_tile(tile);
                }
            }
        }
    }

    MoveOutcome {
        grid,
        score_delta,
        moved,
        reached_win,
    }
}

/// Equal tiles merge unless their sum would pass [`MAX_TILE_VALUE`].
pub fn can_merge(tile: &Tile, other: &Tile) -> bool {
    tile.value == other.value && tile.value <= MAX_TILE_VALUE / 2
}

/// Drops last move's lineage and snapshots positions.
fn prepare_tiles(grid: &mut Grid) {
    for tile in grid.tiles_mut() {
        tile.merged_from = None;
        tile.save_position();
    }
}
