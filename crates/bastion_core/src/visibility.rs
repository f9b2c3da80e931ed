//! Per-player fog-of-war visibility.
//!
//! Each tile holds one of six states so renderers can distinguish what is
//! visible right now from what is merely remembered:
//!
//! - [`TileVisibility::Unseen`] - never seen.
//! - [`TileVisibility::Partial`] - on the sight fringe now, never fully
//!   seen before.
//! - [`TileVisibility::PartialSeen`] - on the sight fringe now, over
//!   terrain seen before.
//! - [`TileVisibility::Visible`] - fully visible now.
//! - [`TileVisibility::Seen`] - fully seen in the past, out of sight now.
//! - [`TileVisibility::SeenPartial`] - partially seen in the past, out of
//!   sight now.
//!
//! The grid carries a padding border equal to the maximum possible sight
//! radius so the rasterizer never bounds-checks. The update is
//! O(assets x sight^2) per tick by design.

use serde::{Deserialize, Serialize};

use crate::position::TilePosition;

/// Upper bound on `effective_sight + size/2` across all asset types and
/// upgrades; sets the padding border width.
pub const MAX_SIGHT: i32 = 16;

/// Visibility state of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileVisibility {
    /// Never seen.
    #[default]
    Unseen,
    /// Fringe-visible now, never seen before.
    Partial,
    /// Fringe-visible now, seen before.
    PartialSeen,
    /// Fully visible now.
    Visible,
    /// Fully seen before, out of sight now.
    Seen,
    /// Partially seen before, out of sight now.
    SeenPartial,
}

impl TileVisibility {
    /// Whether the tile is lit right now.
    #[must_use]
    pub const fn is_currently_visible(self) -> bool {
        matches!(self, Self::Partial | Self::PartialSeen | Self::Visible)
    }

    /// Whether the tile's terrain has ever been revealed.
    #[must_use]
    pub const fn is_discovered(self) -> bool {
        !matches!(self, Self::Unseen)
    }
}

/// One player's fog-of-war grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityMap {
    width: i32,
    height: i32,
    /// Row stride including both padding borders.
    stride: i32,
    cells: Vec<TileVisibility>,
    unseen_tiles: usize,
}

impl VisibilityMap {
    /// Create an all-unseen map for a `width`-by-`height` board.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "visibility dimensions must be positive");
        let stride = width + 2 * MAX_SIGHT;
        let rows = height + 2 * MAX_SIGHT;
        Self {
            width,
            height,
            stride,
            cells: vec![TileVisibility::Unseen; (stride as usize) * (rows as usize)],
            unseen_tiles: (width as usize) * (height as usize),
        }
    }

    /// Map width in tiles (without padding).
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Map height in tiles (without padding).
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Count of tiles still never seen.
    #[must_use]
    pub const fn unseen_tiles(&self) -> usize {
        self.unseen_tiles
    }

    /// Padded index for a tile; valid for any tile within `MAX_SIGHT` of
    /// the board.
    fn index(&self, tile: TilePosition) -> usize {
        let px = tile.x + MAX_SIGHT;
        let py = tile.y + MAX_SIGHT;
        (py as usize) * (self.stride as usize) + (px as usize)
    }

    /// Visibility of a tile. Tiles off the board read as unseen.
    #[must_use]
    pub fn tile(&self, tile: TilePosition) -> TileVisibility {
        if tile.x < -MAX_SIGHT
            || tile.y < -MAX_SIGHT
            || tile.x >= self.width + MAX_SIGHT
            || tile.y >= self.height + MAX_SIGHT
        {
            return TileVisibility::Unseen;
        }
        self.cells[self.index(tile)]
    }

    /// Recompute visibility from the given sight sources.
    ///
    /// Each source is an asset's anchor tile plus its effective sight
    /// radius in tiles (already including the size/2 term and any
    /// forest-concealment halving).
    pub fn update(&mut self, sources: &[(TilePosition, i32)]) {
        // Demote everything currently lit to its remembered counterpart.
        for cell in &mut self.cells {
            *cell = match *cell {
                TileVisibility::Visible | TileVisibility::PartialSeen => TileVisibility::Seen,
                TileVisibility::Partial => TileVisibility::SeenPartial,
                other => other,
            };
        }

        for &(tile, sight) in sources {
            let sight = sight.clamp(0, MAX_SIGHT - 1);
            let inner_sq = i64::from(sight) * i64::from(sight);
            let fringe = sight + 1;
            let fringe_sq = i64::from(fringe) * i64::from(fringe);

            for dy in -fringe..=fringe {
                for dx in -fringe..=fringe {
                    let dist_sq = i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy);
                    if dist_sq > fringe_sq {
                        continue;
                    }
                    let cell_tile = TilePosition::new(tile.x + dx, tile.y + dy);
                    let index = self.index(cell_tile);
                    let current = self.cells[index];
                    self.cells[index] = if dist_sq <= inner_sq {
                        TileVisibility::Visible
                    } else {
                        // Fringe: merge with history. Fully-seen history
                        // wins over never-seen; a mere past glimpse does
                        // not upgrade the fringe.
                        match current {
                            TileVisibility::Visible => TileVisibility::Visible,
                            TileVisibility::Seen | TileVisibility::PartialSeen => {
                                TileVisibility::PartialSeen
                            }
                            TileVisibility::Unseen
                            | TileVisibility::Partial
                            | TileVisibility::SeenPartial => TileVisibility::Partial,
                        }
                    };
                }
            }
        }

        // Full rescan of the unseen counter over the unpadded board.
        let mut unseen = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.tile(TilePosition::new(x, y)) == TileVisibility::Unseen {
                    unseen += 1;
                }
            }
        }
        self.unseen_tiles = unseen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initially_unseen() {
        let map = VisibilityMap::new(16, 16);
        assert_eq!(map.tile(TilePosition::new(5, 5)), TileVisibility::Unseen);
        assert_eq!(map.unseen_tiles(), 256);
    }

    #[test]
    fn test_update_lights_circle() {
        let mut map = VisibilityMap::new(16, 16);
        let center = TilePosition::new(8, 8);
        map.update(&[(center, 2)]);

        assert_eq!(map.tile(center), TileVisibility::Visible);
        assert_eq!(map.tile(TilePosition::new(10, 8)), TileVisibility::Visible);
        // One past the radius is fringe.
        assert_eq!(map.tile(TilePosition::new(11, 8)), TileVisibility::Partial);
        // Far away stays unseen.
        assert_eq!(map.tile(TilePosition::new(0, 0)), TileVisibility::Unseen);
        assert!(map.unseen_tiles() < 256);
    }

    #[test]
    fn test_out_of_sight_becomes_remembered() {
        let mut map = VisibilityMap::new(32, 32);
        map.update(&[(TilePosition::new(5, 5), 2)]);
        // Move far away; previous area must be remembered, not lit.
        map.update(&[(TilePosition::new(25, 25), 2)]);

        assert_eq!(map.tile(TilePosition::new(5, 5)), TileVisibility::Seen);
        assert_eq!(map.tile(TilePosition::new(8, 5)), TileVisibility::SeenPartial);
    }

    #[test]
    fn test_fringe_over_seen_terrain() {
        let mut map = VisibilityMap::new(32, 32);
        map.update(&[(TilePosition::new(5, 5), 2)]);
        map.update(&[(TilePosition::new(25, 25), 2)]);
        // Come back so the old fully-seen area is on the fringe.
        map.update(&[(TilePosition::new(5, 8), 2)]);

        assert_eq!(map.tile(TilePosition::new(5, 5)), TileVisibility::PartialSeen);
    }

    #[test]
    fn test_update_is_idempotent_without_movement() {
        let mut map = VisibilityMap::new(24, 24);
        let sources = vec![(TilePosition::new(4, 4), 3), (TilePosition::new(12, 12), 5)];
        map.update(&sources);
        let snapshot = map.clone();
        map.update(&sources);
        assert_eq!(map, snapshot);
    }
}
