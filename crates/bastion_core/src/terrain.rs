//! Terrain tiles, per-tile resource reserves, and tree regrowth.
//!
//! The terrain map is the static layer under the simulation: which tiles
//! can be walked or built on, how much lumber or stone a tile still holds,
//! and where gold veins sit. Stumps regrow into forest over time in
//! proportion to the forest density around them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::position::TilePosition;

/// Lumber held by a fresh forest tile.
pub const LUMBER_PER_TILE: i32 = 400;

/// Stone held by a fresh rock tile.
pub const STONE_PER_TILE: i32 = 400;

/// Growth units a stump must accumulate before turning back into forest.
/// Each adjacent forest tile contributes one unit per tick.
pub const TREE_GROW_THRESHOLD: u32 = 2400;

/// Static classification of one map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainTile {
    /// Open ground; walkable and buildable.
    #[default]
    Grass,
    /// Open ground; walkable and buildable.
    Dirt,
    /// Standing forest; harvestable, not walkable.
    Forest,
    /// Felled forest; walkable, regrows.
    Stump,
    /// Stone outcrop; quarryable, not walkable.
    Rock,
    /// Exhausted rock; walkable, never regrows.
    RockRubble,
    /// Impassable water.
    Water,
    /// Buried gold; a gold mine may be built over it.
    GoldVein,
}

impl TerrainTile {
    /// Whether ground units can stand on this tile.
    #[must_use]
    pub const fn is_traversable(self) -> bool {
        matches!(
            self,
            Self::Grass | Self::Dirt | Self::Stump | Self::RockRubble | Self::GoldVein
        )
    }

    /// Whether buildings may be placed on this tile. Veins are buildable
    /// so gold mines can go over them.
    #[must_use]
    pub const fn is_buildable(self) -> bool {
        matches!(
            self,
            Self::Grass | Self::Dirt | Self::Stump | Self::RockRubble | Self::GoldVein
        )
    }
}

/// The terrain layer of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainMap {
    width: i32,
    height: i32,
    tiles: Vec<TerrainTile>,
    lumber: Vec<i32>,
    stone: Vec<i32>,
    /// Regrowth progress per stump tile. Keyed by tile for sparse storage;
    /// `BTreeMap` keeps iteration deterministic.
    growth: BTreeMap<(i32, i32), u32>,
}

impl TerrainMap {
    /// Create an all-grass map.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0, "terrain width must be positive");
        assert!(height > 0, "terrain height must be positive");
        let cells = (width as usize) * (height as usize);
        Self {
            width,
            height,
            tiles: vec![TerrainTile::Grass; cells],
            lumber: vec![0; cells],
            stone: vec![0; cells],
            growth: BTreeMap::new(),
        }
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Whether a tile lies on the map.
    #[must_use]
    pub const fn in_bounds(&self, tile: TilePosition) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    fn index(&self, tile: TilePosition) -> usize {
        (tile.y as usize) * (self.width as usize) + (tile.x as usize)
    }

    /// Tile type at a position; out-of-bounds reads as water so callers
    /// treat the border as impassable.
    #[must_use]
    pub fn tile(&self, tile: TilePosition) -> TerrainTile {
        if self.in_bounds(tile) {
            self.tiles[self.index(tile)]
        } else {
            TerrainTile::Water
        }
    }

    /// Set a tile type, initializing its resource reserve.
    pub fn set_tile(&mut self, tile: TilePosition, terrain: TerrainTile) {
        if !self.in_bounds(tile) {
            return;
        }
        let index = self.index(tile);
        self.tiles[index] = terrain;
        self.lumber[index] = if terrain == TerrainTile::Forest {
            LUMBER_PER_TILE
        } else {
            0
        };
        self.stone[index] = if terrain == TerrainTile::Rock {
            STONE_PER_TILE
        } else {
            0
        };
        self.growth.remove(&(tile.x, tile.y));
    }

    /// Lumber remaining on a tile.
    #[must_use]
    pub fn lumber_at(&self, tile: TilePosition) -> i32 {
        if self.in_bounds(tile) {
            self.lumber[self.index(tile)]
        } else {
            0
        }
    }

    /// Stone remaining on a tile.
    #[must_use]
    pub fn stone_at(&self, tile: TilePosition) -> i32 {
        if self.in_bounds(tile) {
            self.stone[self.index(tile)]
        } else {
            0
        }
    }

    /// Remove up to `amount` lumber from a forest tile. Returns the amount
    /// actually removed; an exhausted tile becomes a stump.
    pub fn harvest_lumber(&mut self, tile: TilePosition, amount: i32) -> i32 {
        if self.tile(tile) != TerrainTile::Forest {
            return 0;
        }
        let index = self.index(tile);
        let removed = amount.min(self.lumber[index]);
        self.lumber[index] -= removed;
        if self.lumber[index] <= 0 {
            self.tiles[index] = TerrainTile::Stump;
            self.growth.insert((tile.x, tile.y), 0);
        }
        removed
    }

    /// Remove up to `amount` stone from a rock tile. Returns the amount
    /// actually removed; an exhausted tile becomes rubble.
    pub fn quarry_stone(&mut self, tile: TilePosition, amount: i32) -> i32 {
        if self.tile(tile) != TerrainTile::Rock {
            return 0;
        }
        let index = self.index(tile);
        let removed = amount.min(self.stone[index]);
        self.stone[index] -= removed;
        if self.stone[index] <= 0 {
            self.tiles[index] = TerrainTile::RockRubble;
        }
        removed
    }

    /// Advance every stump's regrowth counter by its adjacent-forest count;
    /// fully grown stumps convert back to forest and reset the counters of
    /// their 2x2 neighborhood.
    pub fn grow_trees(&mut self) {
        let mut grown: Vec<TilePosition> = Vec::new();

        let stump_keys: Vec<(i32, i32)> = self.growth.keys().copied().collect();
        for (x, y) in stump_keys {
            let tile = TilePosition::new(x, y);
            let mut adjacent_forest = 0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let neighbor = TilePosition::new(x + dx, y + dy);
                    if self.tile(neighbor) == TerrainTile::Forest {
                        adjacent_forest += 1;
                    }
                }
            }
            let counter = self.growth.get_mut(&(x, y)).expect("key from snapshot");
            *counter += adjacent_forest;
            if *counter >= TREE_GROW_THRESHOLD {
                grown.push(tile);
            }
        }

        for tile in grown {
            self.set_tile(tile, TerrainTile::Forest);
            // Remaining stumps in the 2x2 neighborhood start over.
            for dy in 0..2 {
                for dx in 0..2 {
                    if let Some(counter) = self.growth.get_mut(&(tile.x + dx, tile.y + dy)) {
                        *counter = 0;
                    }
                }
            }
        }
    }

    /// Whether a `size`-by-`size` footprint anchored at `tile` sits on
    /// buildable terrain. Occupancy is checked separately.
    #[must_use]
    pub fn footprint_buildable(&self, tile: TilePosition, size: i32) -> bool {
        for dy in 0..size {
            for dx in 0..size {
                let cell = TilePosition::new(tile.x + dx, tile.y + dy);
                if !self.in_bounds(cell) || !self.tile(cell).is_buildable() {
                    return false;
                }
            }
        }
        true
    }

    /// Whether a footprint anchored at `tile` covers at least one gold
    /// vein. Gold mines must be placed over a located vein.
    #[must_use]
    pub fn footprint_covers_vein(&self, tile: TilePosition, size: i32) -> bool {
        for dy in 0..size {
            for dx in 0..size {
                if self.tile(TilePosition::new(tile.x + dx, tile.y + dy))
                    == TerrainTile::GoldVein
                {
                    return true;
                }
            }
        }
        false
    }

    /// Nearest tile of the given type, by squared tile distance with id
    /// order tie-breaking (scan order). Returns `None` if absent.
    #[must_use]
    pub fn nearest_tile(
        &self,
        from: TilePosition,
        wanted: TerrainTile,
    ) -> Option<TilePosition> {
        let mut best: Option<(i64, TilePosition)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                let tile = TilePosition::new(x, y);
                if self.tile(tile) != wanted {
                    continue;
                }
                let dx = i64::from(tile.x - from.x);
                let dy = i64::from(tile.y - from.y);
                let dist = dx * dx + dy * dy;
                if best.map_or(true, |(bd, _)| dist < bd) {
                    best = Some((dist, tile));
                }
            }
        }
        best.map(|(_, tile)| tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harvest_exhausts_to_stump() {
        let mut map = TerrainMap::new(8, 8);
        let tile = TilePosition::new(3, 3);
        map.set_tile(tile, TerrainTile::Forest);

        let mut total = 0;
        while map.tile(tile) == TerrainTile::Forest {
            total += map.harvest_lumber(tile, 100);
        }
        assert_eq!(total, LUMBER_PER_TILE);
        assert_eq!(map.tile(tile), TerrainTile::Stump);
        assert_eq!(map.harvest_lumber(tile, 100), 0);
    }

    #[test]
    fn test_quarry_exhausts_to_rubble() {
        let mut map = TerrainMap::new(8, 8);
        let tile = TilePosition::new(1, 1);
        map.set_tile(tile, TerrainTile::Rock);
        assert_eq!(map.quarry_stone(tile, STONE_PER_TILE + 50), STONE_PER_TILE);
        assert_eq!(map.tile(tile), TerrainTile::RockRubble);
        assert!(map.tile(tile).is_traversable());
    }

    #[test]
    fn test_stump_regrows_near_forest() {
        let mut map = TerrainMap::new(8, 8);
        let stump = TilePosition::new(3, 3);
        map.set_tile(stump, TerrainTile::Forest);
        // Surround with forest so regrowth accumulates 8 per tick.
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx != 0 || dy != 0 {
                    map.set_tile(TilePosition::new(3 + dx, 3 + dy), TerrainTile::Forest);
                }
            }
        }
        while map.tile(stump) == TerrainTile::Forest {
            map.harvest_lumber(stump, LUMBER_PER_TILE);
        }

        let ticks_needed = TREE_GROW_THRESHOLD.div_ceil(8);
        for _ in 0..ticks_needed {
            map.grow_trees();
        }
        assert_eq!(map.tile(stump), TerrainTile::Forest);
        assert_eq!(map.lumber_at(stump), LUMBER_PER_TILE);
    }

    #[test]
    fn test_isolated_stump_never_regrows() {
        let mut map = TerrainMap::new(8, 8);
        let stump = TilePosition::new(3, 3);
        map.set_tile(stump, TerrainTile::Forest);
        map.harvest_lumber(stump, LUMBER_PER_TILE);

        for _ in 0..10_000 {
            map.grow_trees();
        }
        assert_eq!(map.tile(stump), TerrainTile::Stump);
    }

    #[test]
    fn test_footprint_checks() {
        let mut map = TerrainMap::new(8, 8);
        assert!(map.footprint_buildable(TilePosition::new(0, 0), 4));
        map.set_tile(TilePosition::new(2, 2), TerrainTile::Water);
        assert!(!map.footprint_buildable(TilePosition::new(0, 0), 4));
        assert!(!map.footprint_buildable(TilePosition::new(6, 6), 4));

        map.set_tile(TilePosition::new(5, 5), TerrainTile::GoldVein);
        assert!(map.footprint_covers_vein(TilePosition::new(4, 4), 2));
        assert!(!map.footprint_covers_vein(TilePosition::new(0, 0), 2));
    }
}
