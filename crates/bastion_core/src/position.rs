//! Tile and pixel coordinates for the simulation grid.
//!
//! All positions are integer pixels on a fixed-size tile grid. Integer
//! arithmetic keeps the simulation deterministic across platforms without
//! resorting to floating-point math.

use serde::{Deserialize, Serialize};

/// Width and height of one map tile in pixels.
pub const TILE_SIZE: i32 = 32;

/// Half a tile in pixels, used for tile-center alignment.
pub const HALF_TILE: i32 = TILE_SIZE / 2;

/// One of the eight movement/facing directions.
///
/// `South` is +y (row index grows southward), `East` is +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward -y.
    North,
    /// Toward +x, -y.
    NorthEast,
    /// Toward +x.
    East,
    /// Toward +x, +y.
    SouthEast,
    /// Toward +y.
    South,
    /// Toward -x, +y.
    SouthWest,
    /// Toward -x.
    West,
    /// Toward -x, -y.
    NorthWest,
}

impl Direction {
    /// All directions in clockwise order starting from north.
    ///
    /// This order is load-bearing: the router and placement searches probe
    /// neighbors in this order, so changing it changes simulation outcomes.
    pub const ALL: [Self; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// Tile-space delta for one step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::NorthEast => (1, -1),
            Self::East => (1, 0),
            Self::SouthEast => (1, 1),
            Self::South => (0, 1),
            Self::SouthWest => (-1, 1),
            Self::West => (-1, 0),
            Self::NorthWest => (-1, -1),
        }
    }

    /// The opposite direction (used when a movement step is refused).
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::NorthEast => Self::SouthWest,
            Self::East => Self::West,
            Self::SouthEast => Self::NorthWest,
            Self::South => Self::North,
            Self::SouthWest => Self::NorthEast,
            Self::West => Self::East,
            Self::NorthWest => Self::SouthEast,
        }
    }

    /// Whether a step in this direction crosses a tile corner.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Self::NorthEast | Self::SouthEast | Self::SouthWest | Self::NorthWest
        )
    }

    /// Direction from a tile-space delta. Returns `None` for a zero delta.
    ///
    /// The octant boundaries use a 2:1 slope: a delta leaning more than
    /// twice as far along one axis counts as a cardinal direction.
    #[must_use]
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        if dx == 0 && dy == 0 {
            return None;
        }
        let ax = dx.abs();
        let ay = dy.abs();
        let dir = if ax > 2 * ay {
            if dx > 0 {
                Self::East
            } else {
                Self::West
            }
        } else if ay > 2 * ax {
            if dy > 0 {
                Self::South
            } else {
                Self::North
            }
        } else if dx > 0 {
            if dy > 0 {
                Self::SouthEast
            } else {
                Self::NorthEast
            }
        } else if dy > 0 {
            Self::SouthWest
        } else {
            Self::NorthWest
        };
        Some(dir)
    }
}

/// A position in whole tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TilePosition {
    /// Tile column.
    pub x: i32,
    /// Tile row.
    pub y: i32,
}

impl TilePosition {
    /// Create a tile position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The pixel position of this tile's center.
    #[must_use]
    pub const fn center(self) -> PixelPosition {
        PixelPosition {
            x: self.x * TILE_SIZE + HALF_TILE,
            y: self.y * TILE_SIZE + HALF_TILE,
        }
    }

    /// Chebyshev distance to another tile (diagonal steps count as one).
    #[must_use]
    pub fn distance(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Whether the other tile is within one step (including the same tile).
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.distance(other) <= 1
    }

    /// Chebyshev distance to the nearest tile of a `size`-by-`size`
    /// footprint anchored at `other`.
    #[must_use]
    pub fn distance_to_footprint(self, other: Self, size: i32) -> i32 {
        let dx = if self.x < other.x {
            other.x - self.x
        } else if self.x >= other.x + size {
            self.x - (other.x + size - 1)
        } else {
            0
        };
        let dy = if self.y < other.y {
            other.y - self.y
        } else if self.y >= other.y + size {
            self.y - (other.y + size - 1)
        } else {
            0
        };
        dx.max(dy)
    }

    /// One step in the given direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Direction toward another tile, or `None` if equal.
    #[must_use]
    pub fn direction_to(self, other: Self) -> Option<Direction> {
        Direction::from_delta(other.x - self.x, other.y - self.y)
    }
}

/// A position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelPosition {
    /// Pixel x.
    pub x: i32,
    /// Pixel y.
    pub y: i32,
}

impl PixelPosition {
    /// Create a pixel position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile containing this pixel.
    #[must_use]
    pub const fn tile(self) -> TilePosition {
        TilePosition {
            x: self.x.div_euclid(TILE_SIZE),
            y: self.y.div_euclid(TILE_SIZE),
        }
    }

    /// Whether this position sits exactly on a tile center.
    #[must_use]
    pub const fn is_tile_aligned(self) -> bool {
        self.x.rem_euclid(TILE_SIZE) == HALF_TILE && self.y.rem_euclid(TILE_SIZE) == HALF_TILE
    }

    /// Squared pixel distance to another position.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        dx * dx + dy * dy
    }

    /// Facing direction toward another pixel position, or `None` if equal.
    #[must_use]
    pub fn direction_to(self, other: Self) -> Option<Direction> {
        Direction::from_delta(other.x - self.x, other.y - self.y)
    }

    /// Move up to `step` pixels toward `target`, never overshooting.
    #[must_use]
    pub fn advance_toward(self, target: Self, step: i32) -> Self {
        let move_axis = |from: i32, to: i32| -> i32 {
            let delta = to - from;
            if delta.abs() <= step {
                to
            } else if delta > 0 {
                from + step
            } else {
                from - step
            }
        };
        Self {
            x: move_axis(self.x, target.x),
            y: move_axis(self.y, target.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_center_round_trip() {
        let tile = TilePosition::new(3, 7);
        let center = tile.center();
        assert!(center.is_tile_aligned());
        assert_eq!(center.tile(), tile);
    }

    #[test]
    fn test_direction_octants() {
        assert_eq!(Direction::from_delta(5, 0), Some(Direction::East));
        assert_eq!(Direction::from_delta(0, -5), Some(Direction::North));
        assert_eq!(Direction::from_delta(4, 4), Some(Direction::SouthEast));
        assert_eq!(Direction::from_delta(-3, -3), Some(Direction::NorthWest));
        // 2:1 slope still counts as diagonal
        assert_eq!(Direction::from_delta(2, -1), Some(Direction::NorthEast));
        // steeper than 2:1 snaps to the cardinal
        assert_eq!(Direction::from_delta(5, -1), Some(Direction::East));
        assert_eq!(Direction::from_delta(0, 0), None);
    }

    #[test]
    fn test_opposite_is_involution() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }

    #[test]
    fn test_footprint_distance() {
        let peasant = TilePosition::new(0, 0);
        // 2x2 building anchored at (1, 0): peasant touches its west edge.
        assert_eq!(peasant.distance_to_footprint(TilePosition::new(1, 0), 2), 1);
        // Inside the footprint counts as zero.
        assert_eq!(peasant.distance_to_footprint(TilePosition::new(-1, -1), 2), 0);
        assert_eq!(peasant.distance_to_footprint(TilePosition::new(4, 0), 2), 4);
    }

    #[test]
    fn test_advance_toward_clamps() {
        let from = PixelPosition::new(0, 0);
        let target = PixelPosition::new(10, -3);
        let step = from.advance_toward(target, 16);
        assert_eq!(step, target);
        let partial = from.advance_toward(PixelPosition::new(100, 0), 16);
        assert_eq!(partial, PixelPosition::new(16, 0));
    }
}
