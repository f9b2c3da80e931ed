//! Test fixtures and helpers.
//!
//! Pre-built game states and spawn helpers for consistent testing.

use bastion_core::prelude::*;

/// An open grass map of the given edge length.
#[must_use]
pub fn flatland(size: i32) -> TerrainMap {
    TerrainMap::new(size, size)
}

/// A model over open ground with Blue and Red stocked with resources.
#[must_use]
pub fn two_player_model(seed: u64) -> GameModel {
    let mut model = GameModel::new(seed, flatland(48));
    for color in [PlayerColor::Blue, PlayerColor::Red] {
        let player = model.player_mut(color);
        player.increment_gold(5000);
        player.increment_lumber(5000);
        player.increment_stone(5000);
    }
    model
}

/// Spawn a completed asset at a tile.
pub fn spawn(
    model: &mut GameModel,
    color: PlayerColor,
    kind: AssetTypeKind,
    x: i32,
    y: i32,
) -> AssetId {
    model.create_asset(color, kind, TilePosition::new(x, y))
}

/// Spawn a neutral gold mine holding the given reserve.
pub fn spawn_mine(model: &mut GameModel, x: i32, y: i32, gold: i32) -> AssetId {
    let id = spawn(model, PlayerColor::None, AssetTypeKind::GoldMine, x, y);
    if let Some(mine) = model.asset_mut(id) {
        mine.mine_gold = gold;
    }
    id
}

/// Paint a rectangle of terrain.
pub fn paint(
    model: &mut GameModel,
    tile: TerrainTile,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
) {
    for dy in 0..height {
        for dx in 0..width {
            model
                .terrain_mut()
                .set_tile(TilePosition::new(x + dx, y + dy), tile);
        }
    }
}

/// Run the model forward a number of cycles.
pub fn run(model: &mut GameModel, ticks: u64) {
    for _ in 0..ticks {
        model.tick();
    }
}

/// Run until the predicate holds or the tick budget runs out. Returns the
/// number of ticks consumed, or `None` if the budget was exhausted.
pub fn run_until(
    model: &mut GameModel,
    budget: u64,
    mut predicate: impl FnMut(&GameModel) -> bool,
) -> Option<u64> {
    for tick in 0..budget {
        if predicate(model) {
            return Some(tick);
        }
        model.tick();
    }
    if predicate(model) {
        Some(budget)
    } else {
        None
    }
}
