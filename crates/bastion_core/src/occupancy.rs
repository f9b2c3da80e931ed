//! Tile occupancy and wall grids.
//!
//! The occupancy map is rebuilt from scratch at the start of every tick and
//! then mutated incrementally as assets claim movement steps. Assets hidden
//! inside mines, shelters or repositories are excluded so they do not block
//! movement.
//!
//! The wall map tracks live wall segments and rubble plus a 4-neighbor
//! adjacency nibble per tile. Rendering consumes the nibble; the simulation
//! only keeps it correct as walls die.

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::position::{Direction, TilePosition};

/// Which asset, if any, occupies each tile, plus diagonal transit claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyMap {
    width: i32,
    height: i32,
    cells: Vec<Option<AssetId>>,
    /// A claimed corner between four tiles; indexed like a tile, meaning
    /// the corner toward the claimed diagonal's minimum x/y.
    diagonals: Vec<bool>,
}

impl OccupancyMap {
    /// Create an empty occupancy map.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "occupancy dimensions must be positive");
        let cells = (width as usize) * (height as usize);
        Self {
            width,
            height,
            cells: vec![None; cells],
            diagonals: vec![false; cells],
        }
    }

    /// Whether a tile lies on the map.
    #[must_use]
    pub const fn in_bounds(&self, tile: TilePosition) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    fn index(&self, tile: TilePosition) -> usize {
        (tile.y as usize) * (self.width as usize) + (tile.x as usize)
    }

    /// Clear every claim. Called at the start of each tick's rebuild.
    pub fn clear(&mut self) {
        self.cells.fill(None);
        self.diagonals.fill(false);
    }

    /// Occupant of a tile, if any. Out of bounds reads as unoccupied.
    #[must_use]
    pub fn occupant(&self, tile: TilePosition) -> Option<AssetId> {
        if self.in_bounds(tile) {
            self.cells[self.index(tile)]
        } else {
            None
        }
    }

    /// Whether a tile is free of assets.
    #[must_use]
    pub fn is_free(&self, tile: TilePosition) -> bool {
        self.in_bounds(tile) && self.occupant(tile).is_none()
    }

    /// Claim a `size`-by-`size` footprint for an asset.
    pub fn place(&mut self, id: AssetId, tile: TilePosition, size: i32) {
        for dy in 0..size {
            for dx in 0..size {
                let cell = TilePosition::new(tile.x + dx, tile.y + dy);
                if self.in_bounds(cell) {
                    let index = self.index(cell);
                    self.cells[index] = Some(id);
                }
            }
        }
    }

    /// Release a single tile claim.
    pub fn release(&mut self, tile: TilePosition) {
        if self.in_bounds(tile) {
            let index = self.index(tile);
            self.cells[index] = None;
        }
    }

    /// Whether the diagonal crossed by stepping from `from` in `direction`
    /// is already claimed this tick. Cardinal steps never cross one.
    #[must_use]
    pub fn diagonal_claimed(&self, from: TilePosition, direction: Direction) -> bool {
        if !direction.is_diagonal() {
            return false;
        }
        let corner = Self::corner(from, direction);
        self.in_bounds(corner) && self.diagonals[self.index(corner)]
    }

    /// Claim the diagonal crossed by stepping from `from` in `direction`.
    pub fn claim_diagonal(&mut self, from: TilePosition, direction: Direction) {
        if !direction.is_diagonal() {
            return;
        }
        let corner = Self::corner(from, direction);
        if self.in_bounds(corner) {
            let index = self.index(corner);
            self.diagonals[index] = true;
        }
    }

    /// Canonical tile index for the corner crossed by a diagonal step: the
    /// minimum-x/y tile among the four sharing that corner.
    fn corner(from: TilePosition, direction: Direction) -> TilePosition {
        let (dx, dy) = direction.delta();
        TilePosition::new(from.x.min(from.x + dx), from.y.min(from.y + dy))
    }
}

/// State of one cell in the wall grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WallCell {
    /// No wall here and never was.
    #[default]
    Empty,
    /// A standing wall segment.
    Standing(AssetId),
    /// A destroyed wall; rendering shows debris, units pass.
    Rubble,
}

/// Wall segments and their adjacency nibbles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallMap {
    width: i32,
    height: i32,
    cells: Vec<WallCell>,
    /// Bit 0 north, bit 1 east, bit 2 south, bit 3 west: which neighbors
    /// hold standing walls or rubble. Rendering keys tile art off this.
    adjacency: Vec<u8>,
}

impl WallMap {
    /// Create an empty wall map.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "wall map dimensions must be positive");
        let cells = (width as usize) * (height as usize);
        Self {
            width,
            height,
            cells: vec![WallCell::Empty; cells],
            adjacency: vec![0; cells],
        }
    }

    /// Whether a tile lies on the map.
    #[must_use]
    pub const fn in_bounds(&self, tile: TilePosition) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    fn index(&self, tile: TilePosition) -> usize {
        (tile.y as usize) * (self.width as usize) + (tile.x as usize)
    }

    /// Wall state at a tile.
    #[must_use]
    pub fn cell(&self, tile: TilePosition) -> WallCell {
        if self.in_bounds(tile) {
            self.cells[self.index(tile)]
        } else {
            WallCell::Empty
        }
    }

    /// Clear all standing walls, keeping rubble. Called before the per-tick
    /// rebuild from live wall assets.
    pub fn clear_standing(&mut self) {
        for cell in &mut self.cells {
            if matches!(cell, WallCell::Standing(_)) {
                *cell = WallCell::Empty;
            }
        }
    }

    /// Record a standing wall segment.
    pub fn place_wall(&mut self, id: AssetId, tile: TilePosition) {
        if self.in_bounds(tile) {
            let index = self.index(tile);
            self.cells[index] = WallCell::Standing(id);
        }
    }

    /// Mark a dead wall's tile as rubble.
    pub fn set_rubble(&mut self, tile: TilePosition) {
        if self.in_bounds(tile) {
            let index = self.index(tile);
            self.cells[index] = WallCell::Rubble;
        }
    }

    /// Recompute every tile's 4-neighbor adjacency nibble.
    pub fn rebuild_adjacency(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let tile = TilePosition::new(x, y);
                let mut mask = 0u8;
                let neighbors = [
                    TilePosition::new(x, y - 1),
                    TilePosition::new(x + 1, y),
                    TilePosition::new(x, y + 1),
                    TilePosition::new(x - 1, y),
                ];
                for (bit, neighbor) in neighbors.into_iter().enumerate() {
                    if !matches!(self.cell(neighbor), WallCell::Empty) {
                        mask |= 1 << bit;
                    }
                }
                let index = self.index(tile);
                self.adjacency[index] = mask;
            }
        }
    }

    /// Adjacency nibble for a tile.
    #[must_use]
    pub fn adjacency(&self, tile: TilePosition) -> u8 {
        if self.in_bounds(tile) {
            self.adjacency[self.index(tile)]
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_and_release() {
        let mut map = OccupancyMap::new(8, 8);
        map.place(5, TilePosition::new(2, 2), 2);
        assert_eq!(map.occupant(TilePosition::new(3, 3)), Some(5));
        assert!(map.is_free(TilePosition::new(4, 2)));
        map.release(TilePosition::new(3, 3));
        assert!(map.is_free(TilePosition::new(3, 3)));
    }

    #[test]
    fn test_out_of_bounds_not_free() {
        let map = OccupancyMap::new(4, 4);
        assert!(!map.is_free(TilePosition::new(-1, 0)));
        assert!(!map.is_free(TilePosition::new(4, 0)));
    }

    #[test]
    fn test_diagonal_claims_share_corner() {
        let mut map = OccupancyMap::new(8, 8);
        let from = TilePosition::new(2, 2);
        map.claim_diagonal(from, Direction::SouthEast);
        // The opposing diagonal through the same corner is blocked too.
        assert!(map.diagonal_claimed(TilePosition::new(3, 3), Direction::NorthWest));
        // A different corner is untouched.
        assert!(!map.diagonal_claimed(from, Direction::NorthWest));
        // Cardinal steps never consult corners.
        assert!(!map.diagonal_claimed(from, Direction::East));
    }

    #[test]
    fn test_wall_adjacency_mask() {
        let mut walls = WallMap::new(8, 8);
        walls.place_wall(1, TilePosition::new(2, 2));
        walls.place_wall(2, TilePosition::new(3, 2));
        walls.place_wall(3, TilePosition::new(2, 3));
        walls.rebuild_adjacency();

        // (2,2) has a wall east (bit 1) and south (bit 2).
        assert_eq!(walls.adjacency(TilePosition::new(2, 2)), 0b0110);

        // Death leaves rubble which still joins wall art.
        walls.set_rubble(TilePosition::new(3, 2));
        walls.rebuild_adjacency();
        assert_eq!(walls.adjacency(TilePosition::new(2, 2)), 0b0110);
        assert!(matches!(
            walls.cell(TilePosition::new(3, 2)),
            WallCell::Rubble
        ));
    }
}
