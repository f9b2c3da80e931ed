//! Scenario data: map, players, and starting assets.
//!
//! Pure data structures deserialized from RON. This module contains no
//! file IO - loading from disk is the headless runner's job; tests build
//! scenarios in code.

use serde::{Deserialize, Serialize};

use crate::asset_type::{AssetTypeKind, PlayerColor};
use crate::error::{GameError, Result};
use crate::game::GameModel;
use crate::position::TilePosition;
use crate::terrain::{TerrainMap, TerrainTile};

/// A complete game setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name, for reports.
    pub name: String,
    /// RNG seed; identical seeds and commands replay identically.
    pub seed: u64,
    /// The map.
    pub map: MapSpec,
    /// Participating players.
    pub players: Vec<PlayerSpec>,
}

/// Map dimensions plus rectangular terrain patches painted in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSpec {
    /// Width in tiles.
    pub width: i32,
    /// Height in tiles.
    pub height: i32,
    /// Terrain patches, painted over grass in declaration order.
    #[serde(default)]
    pub patches: Vec<TerrainPatch>,
}

/// A rectangle of one terrain type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TerrainPatch {
    /// Terrain to paint.
    pub tile: TerrainTile,
    /// Left edge in tiles.
    pub x: i32,
    /// Top edge in tiles.
    pub y: i32,
    /// Patch width in tiles.
    pub width: i32,
    /// Patch height in tiles.
    pub height: i32,
}

/// One player's starting state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSpec {
    /// Player color.
    pub color: PlayerColor,
    /// Starting gold.
    pub gold: i32,
    /// Starting lumber.
    pub lumber: i32,
    /// Starting stone.
    pub stone: i32,
    /// Starting assets.
    #[serde(default)]
    pub assets: Vec<AssetSpec>,
}

/// One starting asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Asset kind.
    pub kind: AssetTypeKind,
    /// Anchor tile x.
    pub x: i32,
    /// Anchor tile y.
    pub y: i32,
    /// Gold reserve, for gold mines.
    #[serde(default)]
    pub gold: i32,
}

impl Scenario {
    /// Parse a scenario from RON text.
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::ScenarioLoad(e.to_string()))
    }

    /// Serialize to RON text.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::ScenarioLoad(e.to_string()))
    }

    /// Build a game model from this scenario.
    pub fn build(&self) -> Result<GameModel> {
        if self.map.width <= 0 || self.map.height <= 0 {
            return Err(GameError::ScenarioLoad(format!(
                "bad map dimensions {}x{}",
                self.map.width, self.map.height
            )));
        }
        let mut terrain = TerrainMap::new(self.map.width, self.map.height);
        for patch in &self.map.patches {
            for dy in 0..patch.height {
                for dx in 0..patch.width {
                    terrain.set_tile(
                        TilePosition::new(patch.x + dx, patch.y + dy),
                        patch.tile,
                    );
                }
            }
        }

        let mut model = GameModel::new(self.seed, terrain);
        for player in &self.players {
            let data = model.player_mut(player.color);
            data.increment_gold(player.gold);
            data.increment_lumber(player.lumber);
            data.increment_stone(player.stone);
            for spec in &player.assets {
                let id = model.create_asset(
                    player.color,
                    spec.kind,
                    TilePosition::new(spec.x, spec.y),
                );
                if spec.kind == AssetTypeKind::GoldMine {
                    if let Some(mine) = model.asset_mut(id) {
                        mine.mine_gold = spec.gold;
                    }
                }
            }
        }
        Ok(model)
    }
}

/// A small two-player skirmish on open ground: a town hall, peasants and
/// footmen each, a shared gold mine and a forest belt.
#[must_use]
pub fn skirmish() -> Scenario {
    Scenario {
        name: "skirmish".to_string(),
        seed: 0x5eed,
        map: MapSpec {
            width: 48,
            height: 48,
            patches: vec![
                TerrainPatch {
                    tile: TerrainTile::Forest,
                    x: 20,
                    y: 0,
                    width: 4,
                    height: 20,
                },
                TerrainPatch {
                    tile: TerrainTile::Rock,
                    x: 20,
                    y: 30,
                    width: 3,
                    height: 6,
                },
            ],
        },
        players: vec![
            PlayerSpec {
                color: PlayerColor::Blue,
                gold: 2000,
                lumber: 1000,
                stone: 500,
                assets: vec![
                    AssetSpec {
                        kind: AssetTypeKind::TownHall,
                        x: 4,
                        y: 4,
                        gold: 0,
                    },
                    AssetSpec {
                        kind: AssetTypeKind::Peasant,
                        x: 9,
                        y: 5,
                        gold: 0,
                    },
                    AssetSpec {
                        kind: AssetTypeKind::Footman,
                        x: 9,
                        y: 8,
                        gold: 0,
                    },
                ],
            },
            PlayerSpec {
                color: PlayerColor::Red,
                gold: 2000,
                lumber: 1000,
                stone: 500,
                assets: vec![
                    AssetSpec {
                        kind: AssetTypeKind::TownHall,
                        x: 40,
                        y: 40,
                        gold: 0,
                    },
                    AssetSpec {
                        kind: AssetTypeKind::Peasant,
                        x: 38,
                        y: 41,
                        gold: 0,
                    },
                    AssetSpec {
                        kind: AssetTypeKind::Footman,
                        x: 38,
                        y: 38,
                        gold: 0,
                    },
                ],
            },
            PlayerSpec {
                color: PlayerColor::None,
                gold: 0,
                lumber: 0,
                stone: 0,
                assets: vec![AssetSpec {
                    kind: AssetTypeKind::GoldMine,
                    x: 22,
                    y: 22,
                    gold: 25_000,
                }],
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skirmish_builds() {
        let model = skirmish().build().unwrap();
        assert_eq!(model.player(PlayerColor::Blue).gold(), 2000);
        assert_eq!(model.arena().len(), 7);
    }

    #[test]
    fn test_ron_round_trip() {
        let scenario = skirmish();
        let text = scenario.to_ron().unwrap();
        let parsed = Scenario::from_ron(&text).unwrap();
        assert_eq!(parsed.players.len(), scenario.players.len());
        assert_eq!(parsed.seed, scenario.seed);
    }

    #[test]
    fn test_bad_dimensions_rejected() {
        let mut scenario = skirmish();
        scenario.map.width = 0;
        assert!(scenario.build().is_err());
    }
}
