//! Grid routing for walking assets.
//!
//! The tick hands the router an occupancy view, the walking asset, and a
//! target pixel; it answers with the direction of the first step along a
//! shortest route, or `None` when no route exists. Tiles occupied by other
//! assets are obstacles, except the target tile itself so routes can lead
//! up to buildings, mines and enemies.
//!
//! Breadth-first search with a fixed neighbor order keeps results
//! deterministic.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::occupancy::OccupancyMap;
use crate::position::{Direction, PixelPosition, TilePosition};
use crate::terrain::TerrainMap;

/// The routing component consulted by the Walk action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Router;

impl Router {
    /// Direction of the first step from `asset` toward `target`, or `None`
    /// when the target is unreachable or already underfoot.
    #[must_use]
    pub fn route(
        &self,
        terrain: &TerrainMap,
        occupancy: &OccupancyMap,
        asset: &Asset,
        target: PixelPosition,
    ) -> Option<Direction> {
        let start = asset.tile_position();
        let goal = target.tile();
        if start == goal {
            return None;
        }

        let width = terrain.width();
        let height = terrain.height();
        let cells = (width as usize) * (height as usize);
        let index = |tile: TilePosition| (tile.y as usize) * (width as usize) + (tile.x as usize);

        let passable = |tile: TilePosition| -> bool {
            if !terrain.in_bounds(tile) {
                return false;
            }
            if tile == goal {
                // The goal is enterable even when occupied; arrival and
                // adjacency are the walker's concern.
                return true;
            }
            if !terrain.tile(tile).is_traversable() {
                return false;
            }
            match occupancy.occupant(tile) {
                None => true,
                Some(id) => id == asset.id,
            }
        };

        let mut parent: Vec<Option<TilePosition>> = vec![None; cells];
        let mut visited = vec![false; cells];
        let mut queue = VecDeque::new();

        visited[index(start)] = true;
        queue.push_back(start);

        let mut found = false;
        while let Some(tile) = queue.pop_front() {
            if tile == goal {
                found = true;
                break;
            }
            for direction in Direction::ALL {
                let next = tile.step(direction);
                if !terrain.in_bounds(next) || visited[index(next)] || !passable(next) {
                    continue;
                }
                visited[index(next)] = true;
                parent[index(next)] = Some(tile);
                queue.push_back(next);
            }
        }

        if !found {
            return None;
        }

        // Walk the parent chain back to the tile right after the start.
        let mut step = goal;
        while let Some(previous) = parent[index(step)] {
            if previous == start {
                return start.direction_to(step);
            }
            step = previous;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_type::{AssetTypeKind, PlayerColor};
    use crate::terrain::TerrainTile;

    fn walker(tile: TilePosition) -> Asset {
        let mut asset = Asset::new(PlayerColor::Blue, AssetTypeKind::Peasant, tile);
        asset.id = 1;
        asset
    }

    #[test]
    fn test_straight_route() {
        let terrain = TerrainMap::new(8, 8);
        let occupancy = OccupancyMap::new(8, 8);
        let asset = walker(TilePosition::new(1, 4));
        let direction = Router.route(
            &terrain,
            &occupancy,
            &asset,
            TilePosition::new(6, 4).center(),
        );
        assert_eq!(direction, Some(Direction::East));
    }

    #[test]
    fn test_routes_around_forest() {
        let mut terrain = TerrainMap::new(8, 8);
        // A vertical forest wall with a gap at the bottom.
        for y in 0..7 {
            terrain.set_tile(TilePosition::new(4, y), TerrainTile::Forest);
        }
        let occupancy = OccupancyMap::new(8, 8);
        let asset = walker(TilePosition::new(2, 2));
        let direction = Router.route(
            &terrain,
            &occupancy,
            &asset,
            TilePosition::new(6, 2).center(),
        );
        // Must head for the gap, not straight east into the trees.
        assert!(direction.is_some());
        assert_ne!(direction, Some(Direction::East));
    }

    #[test]
    fn test_no_route_when_walled_in() {
        let mut terrain = TerrainMap::new(8, 8);
        for (dx, dy) in [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)] {
            terrain.set_tile(TilePosition::new(2 + dx, 2 + dy), TerrainTile::Water);
        }
        let occupancy = OccupancyMap::new(8, 8);
        let asset = walker(TilePosition::new(2, 2));
        let direction = Router.route(
            &terrain,
            &occupancy,
            &asset,
            TilePosition::new(6, 6).center(),
        );
        assert_eq!(direction, None);
    }

    #[test]
    fn test_occupied_goal_is_still_reachable() {
        let terrain = TerrainMap::new(8, 8);
        let mut occupancy = OccupancyMap::new(8, 8);
        occupancy.place(9, TilePosition::new(5, 4), 1);
        let asset = walker(TilePosition::new(1, 4));
        let direction = Router.route(
            &terrain,
            &occupancy,
            &asset,
            TilePosition::new(5, 4).center(),
        );
        assert_eq!(direction, Some(Direction::East));
    }
}
