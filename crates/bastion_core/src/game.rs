//! The game model and the per-cycle simulation tick.
//!
//! `GameModel` owns every piece of simulation state: the asset arena, the
//! players, the terrain and occupancy layers, per-player visibility, and
//! the seeded RNG. One call to [`GameModel::tick`] advances exactly one
//! discrete cycle; no asset mutation happens outside that call.
//!
//! The tick never fails. Illegal orders are filtered at the capability
//! layer before a command reaches the tick, and any inconsistency found
//! mid-tick degrades the asset to idle instead of erroring.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::asset::{Asset, AssetAction, AssetArena, AssetCommand, AssetId};
use crate::asset_type::{
    AssetType, AssetTypeKind, AssetTypeStore, PlayerColor, ResourceKind, UPDATE_FREQUENCY,
};
use crate::capability::{self, CapabilityId, Target};
use crate::error::{GameError, Result};
use crate::events::{EventKind, GameEvent};
use crate::occupancy::{OccupancyMap, WallMap};
use crate::player::PlayerData;
use crate::position::{PixelPosition, TilePosition, TILE_SIZE};
use crate::rng::GameRng;
use crate::router::Router;
use crate::terrain::{TerrainMap, TerrainTile};
use crate::visibility::VisibilityMap;

/// Gold extracted per completed mining pass.
pub const GOLD_PER_MINING: i32 = 100;

/// Lumber extracted per completed harvest pass.
pub const LUMBER_PER_HARVEST: i32 = 100;

/// Stone extracted per completed quarry pass.
pub const STONE_PER_QUARRY: i32 = 100;

/// Ticks a miner spends inside a gold mine per pass.
pub const MINE_STEPS: u32 = 60;

/// Ticks of chopping per harvest pass.
pub const HARVEST_STEPS: u32 = 60;

/// Ticks of quarrying per pass.
pub const QUARRY_STEPS: u32 = 60;

/// Ticks spent inside a repository delivering a load.
pub const CONVEY_STEPS: u32 = 20;

/// Ticks a corpse lingers before removal.
pub const DEATH_STEPS: u32 = 20;

/// Ticks a corpse marker takes to fade.
pub const DECAY_STEPS: u32 = 80;

/// Ticks between healing pulses while food runs a surplus.
pub const HEAL_STEPS: u32 = 40;

/// Ticks per repair increment; each increment costs one of every resource.
pub const REPAIR_STEPS: u32 = 20;

/// The core game simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameModel {
    rng: GameRng,
    cycle: u64,
    pub(crate) arena: AssetArena,
    players: Vec<PlayerData>,
    type_stores: Vec<AssetTypeStore>,
    terrain: TerrainMap,
    occupancy: OccupancyMap,
    walls: WallMap,
    visibility: Vec<VisibilityMap>,
    router: Router,
    tick_events: Vec<GameEvent>,
    /// Whether each player's healing pulse fires this tick. Recomputed at
    /// the start of every tick.
    #[serde(default)]
    heal_pulse: Vec<bool>,
}

impl GameModel {
    /// Create a model over the given terrain with every player at zero
    /// resources.
    #[must_use]
    pub fn new(seed: u64, terrain: TerrainMap) -> Self {
        let players = PlayerColor::ALL
            .into_iter()
            .map(|color| PlayerData::new(color, 0, 0, 0))
            .collect();
        let type_stores = PlayerColor::ALL
            .into_iter()
            .map(|_| AssetTypeStore::standard())
            .collect();
        let visibility = PlayerColor::ALL
            .into_iter()
            .map(|_| VisibilityMap::new(terrain.width(), terrain.height()))
            .collect();
        let occupancy = OccupancyMap::new(terrain.width(), terrain.height());
        let walls = WallMap::new(terrain.width(), terrain.height());
        Self {
            rng: GameRng::seed_from_u64(seed),
            cycle: 0,
            arena: AssetArena::new(),
            players,
            type_stores,
            terrain,
            occupancy,
            walls,
            visibility,
            router: Router,
            tick_events: Vec::new(),
            heal_pulse: vec![false; PlayerColor::ALL.len()],
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Current game cycle.
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// The asset arena.
    #[must_use]
    pub fn arena(&self) -> &AssetArena {
        &self.arena
    }

    /// An asset by id.
    #[must_use]
    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        self.arena.get(id)
    }

    /// Mutable asset access.
    pub fn asset_mut(&mut self, id: AssetId) -> Option<&mut Asset> {
        self.arena.get_mut(id)
    }

    /// A player's data.
    #[must_use]
    pub fn player(&self, color: PlayerColor) -> &PlayerData {
        &self.players[color.index()]
    }

    /// Mutable player access.
    pub fn player_mut(&mut self, color: PlayerColor) -> &mut PlayerData {
        &mut self.players[color.index()]
    }

    /// A player's asset type store.
    #[must_use]
    pub fn types(&self, color: PlayerColor) -> &AssetTypeStore {
        &self.type_stores[color.index()]
    }

    /// Mutable type store access.
    pub fn types_mut(&mut self, color: PlayerColor) -> &mut AssetTypeStore {
        &mut self.type_stores[color.index()]
    }

    /// The stat block for an asset.
    #[must_use]
    pub fn asset_type_of(&self, id: AssetId) -> Option<&AssetType> {
        self.asset(id)
            .map(|asset| self.types(asset.color).get(asset.kind))
    }

    /// The terrain layer.
    #[must_use]
    pub fn terrain(&self) -> &TerrainMap {
        &self.terrain
    }

    /// Mutable terrain access (scenario setup).
    pub fn terrain_mut(&mut self) -> &mut TerrainMap {
        &mut self.terrain
    }

    /// The current occupancy layer.
    #[must_use]
    pub fn occupancy(&self) -> &OccupancyMap {
        &self.occupancy
    }

    /// The wall layer.
    #[must_use]
    pub fn walls(&self) -> &WallMap {
        &self.walls
    }

    /// A player's fog-of-war grid.
    #[must_use]
    pub fn visibility(&self, color: PlayerColor) -> &VisibilityMap {
        &self.visibility[color.index()]
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Queue an event for delivery to every player at the end of the tick.
    pub fn post_event(&mut self, asset: AssetId, kind: EventKind) {
        self.tick_events.push(GameEvent::new(asset, kind));
    }

    /// Queue an order acknowledgement.
    pub fn post_acknowledge(&mut self, asset: AssetId) {
        self.post_event(asset, EventKind::Acknowledge);
    }

    // ------------------------------------------------------------------
    // Asset lifecycle
    // ------------------------------------------------------------------

    /// Create a completed asset at full hit points.
    pub fn create_asset(
        &mut self,
        color: PlayerColor,
        kind: AssetTypeKind,
        tile: TilePosition,
    ) -> AssetId {
        let id = self.create_incomplete_asset(color, kind, tile);
        let max_hp = self.types(color).get(kind).hit_points;
        if let Some(asset) = self.arena.get_mut(id) {
            asset.hit_points = max_hp;
        }
        id
    }

    /// Create an asset at one hit point, as construction and training do.
    pub fn create_incomplete_asset(
        &mut self,
        color: PlayerColor,
        kind: AssetTypeKind,
        tile: TilePosition,
    ) -> AssetId {
        let mut asset = Asset::new(color, kind, tile);
        asset.creation_cycle = self.cycle;
        let id = self.arena.insert(asset);
        let ty = self.types(color).get(kind);
        let (consumption, production, size, immobile) = (
            ty.food_consumption,
            ty.food_production,
            ty.size,
            !ty.is_mobile(),
        );
        let player = self.player_mut(color);
        player.add_asset(id);
        player.food_consumption += consumption;
        player.food_production += production;
        // Buildings block immediately; units are claimed by the next
        // occupancy rebuild.
        if immobile {
            self.occupancy.place(id, tile, size);
        }
        id
    }

    /// Create a transient marker wrapping a terrain location.
    pub fn create_marker(&mut self, position: PixelPosition) -> AssetId {
        let mut marker = Asset::new(PlayerColor::None, AssetTypeKind::None, position.tile());
        marker.position = position;
        marker.creation_cycle = self.cycle;
        let id = self.arena.insert(marker);
        self.player_mut(PlayerColor::None).add_asset(id);
        id
    }

    /// Spawn a transient missile asset carrying precomputed damage toward
    /// a target. Missiles decouple projectile travel time from damage
    /// application.
    fn create_missile(
        &mut self,
        color: PlayerColor,
        from: AssetId,
        target: AssetId,
        damage: i32,
    ) -> AssetId {
        let position = self
            .asset(from)
            .map(|asset| asset.position)
            .unwrap_or_default();
        let mut missile = Asset::new(color, AssetTypeKind::None, position.tile());
        missile.position = position;
        missile.missile_damage = damage;
        missile.creation_cycle = self.cycle;
        let id = self.arena.insert(missile);
        self.player_mut(color).add_asset(id);
        if let Some(missile) = self.arena.get_mut(id) {
            missile.push_command(AssetCommand::with_target(AssetAction::Attack, target));
        }
        id
    }

    /// Remove an asset from the arena and every bookkeeping structure.
    pub fn delete_asset(&mut self, id: AssetId) {
        let Some(asset) = self.arena.remove(id) else {
            return;
        };
        let ty = self.types(asset.color).get(asset.kind);
        let (consumption, production) = (ty.food_consumption, ty.food_production);
        let player = self.player_mut(asset.color);
        player.remove_asset(id);
        player.food_consumption -= consumption;
        player.food_production -= production;
        // Leave no dangling garrison entry.
        if let Some(shelter_id) = asset.sheltered_in {
            if let Some(shelter) = self.arena.get_mut(shelter_id) {
                shelter.sheltered.retain(|&occupant| occupant != id);
            }
        }
    }

    /// Kill an asset: fire the death event, update counters and the wall
    /// layer, demolish construction it was driving, strip every command
    /// referencing it, and start the corpse countdown.
    pub fn kill_asset(&mut self, id: AssetId, credit: Option<PlayerColor>) {
        let Some(asset) = self.arena.get(id) else {
            return;
        };
        if asset.action() == AssetAction::Death {
            return;
        }
        let (color, kind, tile) = (asset.color, asset.kind, asset.tile_position());
        let mobile = self.types(color).get(kind).is_mobile();

        self.post_event(id, EventKind::Death);

        if mobile {
            self.player_mut(color).units_lost += 1;
        } else {
            self.player_mut(color).buildings_lost += 1;
        }
        if let Some(killer) = credit {
            if killer != color {
                self.player_mut(killer).assets_destroyed += 1;
            }
        }

        if kind == AssetTypeKind::Wall {
            self.walls.set_rubble(tile);
        }

        self.evict_sheltered(id);
        if let Some(shelter_id) = self.arena.get(id).and_then(|asset| asset.sheltered_in) {
            if let Some(shelter) = self.arena.get_mut(shelter_id) {
                shelter.sheltered.retain(|&occupant| occupant != id);
            }
        }

        // A dead builder demolishes the construction it was driving.
        let mut demolish = Vec::new();
        for other_id in self.arena.sorted_ids() {
            let Some(other) = self.arena.get(other_id) else {
                continue;
            };
            if other.action() == AssetAction::Construct {
                let driven_by_dead = other
                    .current_command()
                    .and_then(|command| command.activated.as_ref())
                    .map_or(false, |activated| activated.actor() == id);
                if driven_by_dead {
                    demolish.push(other_id);
                }
            }
        }

        // Stale references pop rather than dangle.
        for other_id in self.arena.sorted_ids() {
            if other_id == id {
                continue;
            }
            if let Some(other) = self.arena.get_mut(other_id) {
                other.remove_commands_targeting(id);
            }
        }

        if let Some(asset) = self.arena.get_mut(id) {
            asset.hit_points = 0;
            asset.carried = None;
            asset.clear_commands();
            asset.push_command(AssetCommand::new(AssetAction::Death));
        }

        for building in demolish {
            self.kill_asset(building, None);
        }
    }

    /// Swap an asset's kind in place, keeping food counters correct.
    pub fn change_asset_kind(&mut self, id: AssetId, new_kind: AssetTypeKind) {
        let Some(asset) = self.arena.get(id) else {
            return;
        };
        let color = asset.color;
        let old_kind = asset.kind;
        let old = self.types(color).get(old_kind);
        let new = self.types(color).get(new_kind);
        let consumption_delta = new.food_consumption - old.food_consumption;
        let production_delta = new.food_production - old.food_production;
        let player = self.player_mut(color);
        player.food_consumption += consumption_delta;
        player.food_production += production_delta;
        if let Some(asset) = self.arena.get_mut(id) {
            asset.kind = new_kind;
        }
    }

    // ------------------------------------------------------------------
    // Queries used by capabilities and handlers
    // ------------------------------------------------------------------

    /// Whether the player owns a living, completed asset of `kind`.
    #[must_use]
    pub fn owns_completed(&self, color: PlayerColor, kind: AssetTypeKind) -> bool {
        self.player(color).asset_ids.iter().any(|&id| {
            self.asset(id).map_or(false, |asset| {
                asset.kind == kind && asset.alive() && asset.action() != AssetAction::Construct
            })
        })
    }

    /// Whether every building requirement for acquiring `kind` is met.
    #[must_use]
    pub fn requirements_met(&self, color: PlayerColor, kind: AssetTypeKind) -> bool {
        self.types(color)
            .get(kind)
            .requirements
            .clone()
            .iter()
            .all(|&requirement| self.owns_completed(color, requirement))
    }

    /// Whether a building footprint fits: buildable terrain, and no
    /// occupant other than the listed exempt assets.
    #[must_use]
    pub fn can_place_building(&self, tile: TilePosition, size: i32, exempt: &[AssetId]) -> bool {
        if !self.terrain.footprint_buildable(tile, size) {
            return false;
        }
        for dy in 0..size {
            for dx in 0..size {
                let cell = TilePosition::new(tile.x + dx, tile.y + dy);
                if let Some(occupant) = self.occupancy.occupant(cell) {
                    if !exempt.contains(&occupant) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Deterministic spiral search for the nearest free, traversable tile
    /// around a footprint. Used to place trained units, exiting builders
    /// and miners, and evicted passengers.
    #[must_use]
    pub fn find_asset_placement(
        &self,
        anchor: TilePosition,
        anchor_size: i32,
    ) -> Option<TilePosition> {
        let max_ring = self.terrain.width().max(self.terrain.height());
        for ring in 1..max_ring {
            let min_x = anchor.x - ring;
            let min_y = anchor.y - ring;
            let max_x = anchor.x + anchor_size - 1 + ring;
            let max_y = anchor.y + anchor_size - 1 + ring;
            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    if x != min_x && x != max_x && y != min_y && y != max_y {
                        continue;
                    }
                    let tile = TilePosition::new(x, y);
                    if self.terrain.in_bounds(tile)
                        && self.terrain.tile(tile).is_traversable()
                        && self.occupancy.is_free(tile)
                    {
                        return Some(tile);
                    }
                }
            }
        }
        None
    }

    /// Move an asset to the nearest open tile around another asset's
    /// footprint, claiming occupancy immediately so two relocations in the
    /// same tick cannot stack.
    pub fn relocate_near(&mut self, id: AssetId, around: AssetId) {
        let Some((anchor, size)) = self.asset(around).map(|asset| {
            (
                asset.tile_position(),
                self.types(asset.color).get(asset.kind).size,
            )
        }) else {
            return;
        };
        if let Some(tile) = self.find_asset_placement(anchor, size) {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.set_tile_position(tile);
            }
            self.occupancy.place(id, tile, 1);
        }
    }

    /// Evict every sheltered passenger onto open tiles nearby.
    pub fn evict_sheltered(&mut self, shelter: AssetId) {
        let passengers = self
            .asset(shelter)
            .map(|asset| asset.sheltered.clone())
            .unwrap_or_default();
        if passengers.is_empty() {
            return;
        }
        if let Some(asset) = self.arena.get_mut(shelter) {
            asset.sheltered.clear();
        }
        for passenger in passengers {
            if let Some(unit) = self.arena.get_mut(passenger) {
                unit.sheltered_in = None;
                unit.clear_commands();
            }
            self.relocate_near(passenger, shelter);
        }
    }

    /// Nearest living repository of the player accepting `resource`.
    #[must_use]
    pub fn find_nearest_repository(
        &self,
        from: TilePosition,
        color: PlayerColor,
        resource: ResourceKind,
    ) -> Option<AssetId> {
        let mut best: Option<(i32, AssetId)> = None;
        for &id in &self.player(color).asset_ids {
            let Some(asset) = self.asset(id) else {
                continue;
            };
            if !asset.alive() || asset.action() == AssetAction::Construct {
                continue;
            }
            let accepts = match resource {
                ResourceKind::Gold => asset.kind.accepts_gold(),
                ResourceKind::Lumber => asset.kind.accepts_lumber(),
                ResourceKind::Stone => asset.kind.accepts_stone(),
            };
            if !accepts {
                continue;
            }
            let size = self.types(color).get(asset.kind).size;
            let distance = from.distance_to_footprint(asset.tile_position(), size);
            if best.map_or(true, |(bd, bid)| (distance, id) < (bd, bid)) {
                best = Some((distance, id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Nearest living enemy combatant within `range` tiles of the asset,
    /// skipping concealed and sheltered targets.
    #[must_use]
    pub fn find_nearest_enemy(&self, of: AssetId, range: i32) -> Option<AssetId> {
        let Some(me) = self.asset(of) else {
            return None;
        };
        let my_tile = me.tile_position();
        let my_color = me.color;
        let mut best: Option<(i32, AssetId)> = None;
        for color in PlayerColor::ALL {
            if color == my_color || color == PlayerColor::None {
                continue;
            }
            for &id in &self.player(color).asset_ids {
                let Some(enemy) = self.asset(id) else {
                    continue;
                };
                // Walls are excluded: auto-engagement picks combatants,
                // walls fall to explicit orders.
                if !enemy.alive()
                    || enemy.kind == AssetTypeKind::None
                    || enemy.kind == AssetTypeKind::Wall
                    || enemy.sheltered_in.is_some()
                    || self.is_concealed(id)
                {
                    continue;
                }
                let size = self.types(color).get(enemy.kind).size;
                let distance = my_tile.distance_to_footprint(enemy.tile_position(), size);
                if distance <= range && best.map_or(true, |(bd, bid)| (distance, id) < (bd, bid)) {
                    best = Some((distance, id));
                }
            }
        }
        best.map(|(_, id)| id)
    }

    /// Whether an asset hides in the trees: a ranger with the scouting
    /// research standing against a forest edge.
    #[must_use]
    pub fn is_concealed(&self, id: AssetId) -> bool {
        let Some(asset) = self.asset(id) else {
            return false;
        };
        if asset.kind != AssetTypeKind::Ranger
            || !self.player(asset.color).has_upgrade(CapabilityId::RangerScouting)
        {
            return false;
        }
        let tile = asset.tile_position();
        [(0, -1), (1, 0), (0, 1), (-1, 0)].into_iter().any(|(dx, dy)| {
            self.terrain.tile(TilePosition::new(tile.x + dx, tile.y + dy)) == TerrainTile::Forest
        })
    }

    /// Sight radius in tiles for the visibility rasterizer: base sight
    /// (construction sight while being built) plus half the footprint,
    /// halved for a concealed ranger.
    #[must_use]
    pub fn effective_sight(&self, id: AssetId) -> i32 {
        let Some(asset) = self.asset(id) else {
            return 0;
        };
        let ty = self.types(asset.color).get(asset.kind);
        let base = if asset.action() == AssetAction::Construct {
            ty.construction_sight
        } else {
            ty.sight
        };
        let sight = base + ty.size / 2;
        if self.is_concealed(id) {
            sight / 2
        } else {
            sight
        }
    }

    /// Cancel the construction driving a building, if any.
    pub fn cancel_construction(&mut self, building: AssetId) {
        let taken = self
            .arena
            .get_mut(building)
            .filter(|asset| asset.action() == AssetAction::Construct)
            .and_then(|asset| asset.current_command_mut())
            .and_then(|command| command.activated.take());
        if let Some(mut activated) = taken {
            activated.cancel(self);
        }
    }

    /// Rewind the asset id allocator for save restoration. Returns the
    /// previous counter for [`Self::arena_restore_counter`].
    pub fn arena_rewind(&mut self, id: AssetId) -> AssetId {
        self.arena.rewind(id)
    }

    /// Restore the id allocator after a rewound creation.
    pub fn arena_restore_counter(&mut self, previous: AssetId) {
        self.arena.restore_counter(previous);
    }

    // ------------------------------------------------------------------
    // Producer interface (UI / AI)
    // ------------------------------------------------------------------

    /// Queue a capability request on an asset. The request is resolved by
    /// the tick on the next cycle: `can_apply` is re-checked and the
    /// capability applied. Terrain targets are wrapped into transient
    /// markers so commands stay id-based.
    pub fn enqueue_capability(
        &mut self,
        actor: AssetId,
        capability: CapabilityId,
        target: Target,
    ) -> Result<()> {
        if self.asset(actor).is_none() {
            return Err(GameError::AssetNotFound(actor));
        }
        let Some(spec) = capability::registry().find(capability) else {
            return Err(GameError::UnknownCapability(capability.name().to_string()));
        };
        let resolved = match spec.target_kind() {
            crate::capability::TargetKind::None => None,
            _ => match target.asset {
                Some(id) => Some(id),
                None => Some(self.create_marker(target.location)),
            },
        };
        if let Some(asset) = self.arena.get_mut(actor) {
            // Cancel stacks on top of the activity it is cancelling;
            // everything else replaces the actor's orders.
            if capability != CapabilityId::Cancel {
                asset.clear_commands();
            }
            asset.push_command(AssetCommand {
                action: AssetAction::Capability,
                capability: Some(capability),
                target: resolved,
                activated: None,
            });
        }
        Ok(())
    }

    /// Push a raw command onto an asset's stack.
    pub fn push_command(&mut self, id: AssetId, command: AssetCommand) -> Result<()> {
        self.arena
            .get_mut(id)
            .map(|asset| asset.push_command(command))
            .ok_or(GameError::AssetNotFound(id))
    }

    /// Pop an asset's current command.
    pub fn pop_command(&mut self, id: AssetId) -> Result<()> {
        self.arena
            .get_mut(id)
            .map(|asset| {
                asset.pop_command();
            })
            .ok_or(GameError::AssetNotFound(id))
    }

    /// Clear an asset's command stack.
    pub fn clear_commands(&mut self, id: AssetId) -> Result<()> {
        self.arena
            .get_mut(id)
            .map(Asset::clear_commands)
            .ok_or(GameError::AssetNotFound(id))
    }

    // ------------------------------------------------------------------
    // The tick
    // ------------------------------------------------------------------

    /// Advance the simulation by one cycle.
    pub fn tick(&mut self) {
        // 1. Tree growth.
        self.terrain.grow_trees();

        // 2. Rebuild occupancy from scratch.
        self.rebuild_occupancy();

        // 3. Per-player visibility.
        self.update_visibility();

        // 4. Wall layer and adjacency.
        self.rebuild_walls();

        // Healing pulses consumed by the None/StandGround handlers.
        self.update_heal_pulses();

        // 5. Pseudo-random turn order, mobile assets first.
        let order = self.turn_order();

        // 6. Per-asset dispatch on the current action tag.
        for id in order {
            self.process_asset(id);
        }

        self.prune_markers();

        // 7. Advance the cycle and flush events to every player.
        self.cycle += 1;
        let events = std::mem::take(&mut self.tick_events);
        for player in &mut self.players {
            for &event in &events {
                player.push_event(event);
            }
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(cycle = self.cycle, state_hash = hash, "cycle state hash");
        }
    }

    fn rebuild_occupancy(&mut self) {
        self.occupancy.clear();
        for id in self.arena.sorted_ids() {
            let Some(asset) = self.arena.get(id) else {
                continue;
            };
            // Markers and missiles never block movement.
            if asset.kind == AssetTypeKind::None {
                continue;
            }
            let ty = self.types(asset.color).get(asset.kind);
            if ty.is_mobile() {
                // Units hidden inside mines, repositories, shelters or
                // construction sites do not block.
                let hidden = asset.sheltered_in.is_some()
                    || matches!(
                        asset.action(),
                        AssetAction::MineGold
                            | AssetAction::ConveyGold
                            | AssetAction::ConveyLumber
                            | AssetAction::ConveyStone
                            | AssetAction::Construct
                            | AssetAction::Build
                    );
                if hidden {
                    continue;
                }
                let tile = asset.tile_position();
                self.occupancy.place(id, tile, 1);
                // A mid-transit walker also claims the tile it is
                // entering.
                if !asset.position.is_tile_aligned() {
                    self.occupancy.place(id, tile.step(asset.direction), 1);
                }
            } else {
                self.occupancy.place(id, asset.tile_position(), ty.size);
            }
        }
    }

    fn update_visibility(&mut self) {
        for color in PlayerColor::ALL {
            let index = color.index();
            let mut sources = Vec::new();
            for &id in &self.players[index].asset_ids {
                let Some(asset) = self.arena.get(id) else {
                    continue;
                };
                if !asset.alive()
                    || asset.kind == AssetTypeKind::None
                    || asset.sheltered_in.is_some()
                {
                    continue;
                }
                sources.push((asset.tile_position(), self.effective_sight(id)));
            }
            if !sources.is_empty() {
                self.visibility[index].update(&sources);
            }
        }
    }

    fn rebuild_walls(&mut self) {
        self.walls.clear_standing();
        for id in self.arena.sorted_ids() {
            if let Some(asset) = self.arena.get(id) {
                if asset.kind == AssetTypeKind::Wall && asset.alive() {
                    self.walls.place_wall(id, asset.tile_position());
                }
            }
        }
        self.walls.rebuild_adjacency();
    }

    fn update_heal_pulses(&mut self) {
        self.heal_pulse = vec![false; PlayerColor::ALL.len()];
        for color in PlayerColor::ALL {
            let index = color.index();
            let player = &mut self.players[index];
            if player.has_food_surplus() {
                player.heal_timer += 1;
                if player.heal_timer >= HEAL_STEPS {
                    player.heal_timer = 0;
                    self.heal_pulse[index] = true;
                }
            } else {
                player.heal_timer = 0;
            }
        }
    }

    /// Assign every asset a random key, then process mobile assets first
    /// and immobile second, each group stably sorted by key. The draws are
    /// made in ascending id order so replays are exact.
    fn turn_order(&mut self) -> Vec<AssetId> {
        let mut mobile = Vec::new();
        let mut immobile = Vec::new();
        for id in self.arena.sorted_ids() {
            let key = self.rng.next_u32();
            let Some(asset) = self.arena.get(id) else {
                continue;
            };
            if self.types(asset.color).get(asset.kind).is_mobile() {
                mobile.push((key, id));
            } else {
                immobile.push((key, id));
            }
        }
        mobile.sort_by_key(|&(key, _)| key);
        immobile.sort_by_key(|&(key, _)| key);
        mobile
            .into_iter()
            .chain(immobile)
            .map(|(_, id)| id)
            .collect()
    }

    fn process_asset(&mut self, id: AssetId) {
        let Some(asset) = self.arena.get(id) else {
            return; // Deleted earlier this tick.
        };
        match asset.action() {
            AssetAction::None => self.handle_none(id),
            AssetAction::Capability => self.handle_capability(id),
            AssetAction::Construct => self.handle_construct(id),
            AssetAction::Build => self.handle_build(id),
            AssetAction::Walk => self.handle_walk(id),
            AssetAction::StandGround => self.handle_stand_ground(id),
            AssetAction::Attack => self.handle_attack(id),
            AssetAction::Repair => self.handle_repair(id),
            AssetAction::HarvestLumber => self.handle_gather(id, ResourceKind::Lumber),
            AssetAction::QuarryStone => self.handle_gather(id, ResourceKind::Stone),
            AssetAction::MineGold => self.handle_mine(id),
            AssetAction::ConveyGold | AssetAction::ConveyLumber | AssetAction::ConveyStone => {
                self.handle_convey(id);
            }
            AssetAction::Shelter => self.handle_shelter(id),
            AssetAction::Death => self.handle_death(id),
            AssetAction::Decay => self.handle_decay(id),
        }
    }

    // ------------------------------------------------------------------
    // Action handlers
    // ------------------------------------------------------------------

    fn try_heal(&mut self, id: AssetId) {
        let Some(asset) = self.arena.get(id) else {
            return;
        };
        if !asset.alive() {
            return;
        }
        let color = asset.color;
        let pulse = self.heal_pulse.get(color.index()).copied().unwrap_or(false);
        if !pulse {
            return;
        }
        let max_hp = self.types(color).get(asset.kind).hit_points;
        if let Some(asset) = self.arena.get_mut(id) {
            if asset.hit_points < max_hp {
                asset.hit_points += 1;
            }
        }
    }

    fn handle_none(&mut self, id: AssetId) {
        self.try_heal(id);
        // Armed immobile assets guard their ground by default.
        let auto_guard = self.asset(id).map_or(false, |asset| {
            let ty = self.types(asset.color).get(asset.kind);
            asset.alive() && !ty.is_mobile() && ty.range > 0
        });
        if auto_guard {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.push_command(AssetCommand::new(AssetAction::StandGround));
            }
        }
    }

    /// A capability command either steps its activation or resolves a
    /// deferred request queued by the UI/AI one or more ticks ago.
    fn handle_capability(&mut self, id: AssetId) {
        let Some(asset) = self.arena.get_mut(id) else {
            return;
        };
        let Some(mut command) = asset.pop_command() else {
            return;
        };

        if let Some(mut activated) = command.activated.take() {
            let done = activated.increment_step(self);
            if !done {
                command.activated = Some(activated);
                if let Some(asset) = self.arena.get_mut(id) {
                    asset.push_command(command);
                }
            }
            return;
        }

        // Deferred resolution: look the capability up, re-check its rules,
        // and apply. A refusal simply leaves the command popped.
        let Some(capability_id) = command.capability else {
            return;
        };
        let Some(capability) = capability::registry().find(capability_id) else {
            return;
        };
        let target = match command.target {
            Some(target_id) => match self.asset(target_id) {
                Some(target_asset) => Target::asset(target_id, target_asset.position),
                None => return, // Target vanished; degrade to idle.
            },
            None => Target::NONE,
        };
        if capability.can_apply(self, id, &target) {
            let _ = capability.apply(self, id, &target);
        }
    }

    /// A building being built: step the driving activation.
    fn handle_construct(&mut self, id: AssetId) {
        let has_activation = self
            .asset(id)
            .and_then(|asset| asset.current_command())
            .map_or(false, |command| command.activated.is_some());
        if !has_activation {
            // Trainees carry a bare Construct command; the producing
            // building drives their progress.
            return;
        }
        let Some(asset) = self.arena.get_mut(id) else {
            return;
        };
        let Some(mut command) = asset.pop_command() else {
            return;
        };
        if let Some(mut activated) = command.activated.take() {
            let done = activated.increment_step(self);
            if !done {
                command.activated = Some(activated);
                if let Some(asset) = self.arena.get_mut(id) {
                    asset.push_command(command);
                }
            }
        }
    }

    /// A builder waiting at the site: idle facing the building until the
    /// construction releases or demolishes it.
    fn handle_build(&mut self, id: AssetId) {
        let building = self
            .asset(id)
            .and_then(|asset| asset.current_command())
            .and_then(|command| command.target);
        let Some(building_id) = building else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };
        let valid = self.asset(building_id).map_or(false, |b| b.alive());
        if !valid {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        }
        let facing = self
            .asset(id)
            .zip(self.asset(building_id))
            .and_then(|(builder, building)| builder.position.direction_to(building.position));
        if let (Some(direction), Some(asset)) = (facing, self.arena.get_mut(id)) {
            asset.direction = direction;
        }
    }

    fn handle_walk(&mut self, id: AssetId) {
        let Some(asset) = self.arena.get(id) else {
            return;
        };
        let Some(target_id) = asset.current_command().and_then(|command| command.target) else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };
        let Some(target_position) = self.asset(target_id).map(|target| target.position) else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };

        let (position, direction, color, kind) = {
            let asset = self.arena.get(id).expect("checked above");
            (asset.position, asset.direction, asset.color, asset.kind)
        };
        let ty = self.types(color).get(kind);
        let speed_px = ty.speed * TILE_SIZE / UPDATE_FREQUENCY as i32;
        let my_range = ty.range;

        if position.is_tile_aligned() {
            let tile = position.tile();

            // Interruption: pop into an attack once the target is in
            // range.
            let next = self
                .arena
                .get(id)
                .and_then(|asset| asset.next_command().cloned());
            if let Some(next_command) = &next {
                if next_command.action == AssetAction::Attack {
                    if let Some(enemy_id) = next_command.target {
                        if let Some(enemy) = self.asset(enemy_id) {
                            let enemy_size =
                                self.types(enemy.color).get(enemy.kind).size;
                            if enemy.alive()
                                && tile.distance_to_footprint(enemy.tile_position(), enemy_size)
                                    <= my_range
                            {
                                if let Some(asset) = self.arena.get_mut(id) {
                                    asset.pop_command();
                                }
                                return;
                            }
                        }
                    }
                }
                // Continuation: gathering and building commands resume
                // once the walker touches the target footprint.
                if next_command.target == Some(target_id) {
                    let reached = self.asset(target_id).map_or(false, |target| {
                        let size = self.types(target.color).get(target.kind).size;
                        tile.distance_to_footprint(target.tile_position(), size) <= 1
                    });
                    if reached {
                        if let Some(asset) = self.arena.get_mut(id) {
                            asset.pop_command();
                        }
                        return;
                    }
                }
            }

            if tile == target_position.tile() {
                if let Some(asset) = self.arena.get_mut(id) {
                    asset.pop_command();
                }
                return;
            }

            let route = {
                let asset = self.arena.get(id).expect("checked above");
                self.router
                    .route(&self.terrain, &self.occupancy, asset, target_position)
            };
            let Some(step_direction) = route else {
                // No route: pop back to the next command, adjacent or not.
                if let Some(asset) = self.arena.get_mut(id) {
                    asset.pop_command();
                }
                return;
            };

            let destination = tile.step(step_direction);
            let blocked = !self.occupancy.is_free(destination)
                || self.occupancy.diagonal_claimed(tile, step_direction);
            if blocked {
                // Refuse the step and face away from the collision.
                if let Some(asset) = self.arena.get_mut(id) {
                    asset.direction = step_direction.opposite();
                }
                return;
            }

            self.occupancy.place(id, destination, 1);
            self.occupancy.claim_diagonal(tile, step_direction);
            if let Some(asset) = self.arena.get_mut(id) {
                asset.direction = step_direction;
                asset.position = position.advance_toward(destination.center(), speed_px);
            }
        } else {
            // Mid-transit: keep moving toward the tile center ahead.
            let tile = position.tile();
            let center = tile.center();
            let (dx, dy) = direction.delta();
            let dot = (center.x - position.x) * dx + (center.y - position.y) * dy;
            let destination = if dot >= 0 {
                center
            } else {
                tile.step(direction).center()
            };
            if let Some(asset) = self.arena.get_mut(id) {
                asset.position = position.advance_toward(destination, speed_px);
            }
        }
    }

    fn handle_stand_ground(&mut self, id: AssetId) {
        // Mobile defenders engage anything they can see; towers only what
        // they can actually shoot.
        let scan_range = self.asset(id).map_or(0, |asset| {
            let ty = self.types(asset.color).get(asset.kind);
            if ty.is_mobile() {
                ty.sight.max(ty.range)
            } else {
                ty.range
            }
        });
        if let Some(enemy) = self.find_nearest_enemy(id, scan_range) {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.push_command(AssetCommand::with_target(AssetAction::Attack, enemy));
            }
            return;
        }
        self.try_heal(id);
    }

    fn handle_attack(&mut self, id: AssetId) {
        let Some(asset) = self.arena.get(id) else {
            return;
        };

        // Missiles are assets of the None kind carrying their damage.
        if asset.kind == AssetTypeKind::None {
            self.handle_missile(id);
            return;
        }

        let Some(target_id) = asset.current_command().and_then(|command| command.target) else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };
        let target_alive = self.asset(target_id).map_or(false, |target| target.alive());
        if !target_alive {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        }

        let (my_tile, my_color, my_kind, my_step) = {
            let asset = self.arena.get(id).expect("checked above");
            (
                asset.tile_position(),
                asset.color,
                asset.kind,
                asset.step,
            )
        };
        let ty = self.types(my_color).get(my_kind).clone();
        let (target_tile, target_position, target_color, target_kind) = {
            let target = self.asset(target_id).expect("checked above");
            (
                target.tile_position(),
                target.position,
                target.color,
                target.kind,
            )
        };
        let target_size = self.types(target_color).get(target_kind).size;
        let distance = my_tile.distance_to_footprint(target_tile, target_size);

        if distance > ty.range {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.step = 0;
                if ty.is_mobile() {
                    // Chase: the walk pops itself once back in range.
                    asset.push_command(AssetCommand::with_target(AssetAction::Walk, target_id));
                } else {
                    // A tower cannot chase; drop the target.
                    asset.pop_command();
                }
            }
            return;
        }

        let facing = {
            let asset = self.arena.get(id).expect("checked above");
            asset.position.direction_to(target_position)
        };
        if let Some(asset) = self.arena.get_mut(id) {
            if let Some(direction) = facing {
                asset.direction = direction;
            }
            asset.step += 1;
        }

        let step = my_step + 1;
        if step == ty.attack_steps {
            let target_armor = self.types(target_color).get(target_kind).armor;
            let mut damage = (ty.basic_damage - target_armor).max(0) + ty.piercing_damage;
            // One draw per swing: half damage on heads.
            if self.rng.next_bool() {
                damage /= 2;
            }
            if ty.range == 1 {
                self.post_event(id, EventKind::MeleeHit);
                self.apply_damage(target_id, damage, my_color);
            } else {
                let missile = self.create_missile(my_color, id, target_id, damage);
                self.post_event(missile, EventKind::MissileFire);
            }
        }
        if step >= ty.attack_cycle() {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.step = 0;
            }
        }
    }

    fn handle_missile(&mut self, id: AssetId) {
        let Some(target_id) = self
            .asset(id)
            .and_then(|missile| missile.current_command())
            .and_then(|command| command.target)
        else {
            self.delete_asset(id);
            return;
        };
        let Some(target_position) = self.asset(target_id).map(|target| target.position) else {
            self.delete_asset(id);
            return;
        };
        let speed_px = self.types(PlayerColor::None).get(AssetTypeKind::None).speed * TILE_SIZE
            / UPDATE_FREQUENCY as i32;
        let (position, color, damage) = {
            let Some(missile) = self.arena.get(id) else {
                return;
            };
            (missile.position, missile.color, missile.missile_damage)
        };
        let next = position.advance_toward(target_position, speed_px);
        if next == target_position {
            self.post_event(target_id, EventKind::MissileHit);
            self.apply_damage(target_id, damage, color);
            self.delete_asset(id);
        } else if let Some(missile) = self.arena.get_mut(id) {
            if let Some(direction) = position.direction_to(target_position) {
                missile.direction = direction;
            }
            missile.position = next;
        }
    }

    /// Deal damage and kill the target if it runs out of hit points.
    fn apply_damage(&mut self, target: AssetId, damage: i32, attacker: PlayerColor) {
        let Some(asset) = self.arena.get_mut(target) else {
            return;
        };
        if !asset.alive() {
            return;
        }
        asset.hit_points -= damage;
        let dead = asset.hit_points <= 0;
        self.post_event(target, EventKind::Attacked);
        if dead {
            self.kill_asset(target, Some(attacker));
        }
    }

    fn handle_repair(&mut self, id: AssetId) {
        let Some(target_id) = self
            .asset(id)
            .and_then(|asset| asset.current_command())
            .and_then(|command| command.target)
        else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };
        let Some((target_tile, target_color, target_kind, target_hp, target_position)) =
            self.asset(target_id).map(|target| {
                (
                    target.tile_position(),
                    target.color,
                    target.kind,
                    target.hit_points,
                    target.position,
                )
            })
        else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };
        let target_type = self.types(target_color).get(target_kind).clone();
        if target_hp <= 0 || target_hp >= target_type.hit_points {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        }

        let (my_tile, my_color, my_step) = {
            let Some(asset) = self.arena.get(id) else {
                return;
            };
            (asset.tile_position(), asset.color, asset.step)
        };
        if my_tile.distance_to_footprint(target_tile, target_type.size) > 1 {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.push_command(AssetCommand::with_target(AssetAction::Walk, target_id));
            }
            return;
        }

        let facing = {
            let Some(asset) = self.arena.get(id) else {
                return;
            };
            asset.position.direction_to(target_position)
        };
        if let Some(asset) = self.arena.get_mut(id) {
            if let Some(direction) = facing {
                asset.direction = direction;
            }
            asset.step += 1;
        }

        if my_step + 1 >= REPAIR_STEPS {
            // Each completed increment drains one of each resource; the
            // repair stalls when the stockpile runs dry.
            let affordable = self
                .player(my_color)
                .can_afford(crate::asset_type::ResourceCost::new(1, 1, 1));
            if !affordable {
                if let Some(asset) = self.arena.get_mut(id) {
                    asset.pop_command();
                }
                return;
            }
            let player = self.player_mut(my_color);
            player.decrement_gold(1);
            player.decrement_lumber(1);
            player.decrement_stone(1);

            let build_ticks = target_type.build_time.max(1) as u32 * UPDATE_FREQUENCY;
            let hp_per_increment =
                ((i64::from(target_type.hit_points) * i64::from(REPAIR_STEPS)
                    / i64::from(build_ticks)) as i32)
                    .max(1);
            let mut finished = false;
            if let Some(target) = self.arena.get_mut(target_id) {
                target.hit_points =
                    (target.hit_points + hp_per_increment).min(target_type.hit_points);
                finished = target.hit_points >= target_type.hit_points;
            }
            if let Some(asset) = self.arena.get_mut(id) {
                asset.step = 0;
            }
            if finished {
                if let Some(asset) = self.arena.get_mut(id) {
                    asset.pop_command();
                }
                self.post_event(id, EventKind::WorkComplete);
            }
        }
    }

    fn handle_gather(&mut self, id: AssetId, resource: ResourceKind) {
        let (wanted_terrain, steps_needed, amount, event) = match resource {
            ResourceKind::Lumber => (
                TerrainTile::Forest,
                HARVEST_STEPS,
                LUMBER_PER_HARVEST,
                EventKind::Harvest,
            ),
            ResourceKind::Stone => (
                TerrainTile::Rock,
                QUARRY_STEPS,
                STONE_PER_QUARRY,
                EventKind::Quarry,
            ),
            ResourceKind::Gold => return,
        };

        let Some(marker_id) = self
            .asset(id)
            .and_then(|asset| asset.current_command())
            .and_then(|command| command.target)
        else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };
        let Some(resource_tile) = self.asset(marker_id).map(|marker| marker.tile_position())
        else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };

        // The tile may have been exhausted by another gatherer: retarget
        // the nearest remaining tile or give up.
        if self.terrain.tile(resource_tile) != wanted_terrain {
            let my_tile = self.asset(id).map(|asset| asset.tile_position());
            let Some(my_tile) = my_tile else {
                return;
            };
            match self.terrain.nearest_tile(my_tile, wanted_terrain) {
                Some(replacement) => {
                    let marker = self.create_marker(replacement.center());
                    if let Some(asset) = self.arena.get_mut(id) {
                        if let Some(command) = asset.current_command_mut() {
                            command.target = Some(marker);
                        }
                        asset.step = 0;
                        asset.push_command(AssetCommand::with_target(AssetAction::Walk, marker));
                    }
                }
                None => {
                    if let Some(asset) = self.arena.get_mut(id) {
                        asset.pop_command();
                    }
                }
            }
            return;
        }

        let (my_tile, my_color, my_step) = {
            let Some(asset) = self.arena.get(id) else {
                return;
            };
            (asset.tile_position(), asset.color, asset.step)
        };
        if my_tile.distance(resource_tile) > 1 {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.push_command(AssetCommand::with_target(AssetAction::Walk, marker_id));
            }
            return;
        }

        let facing = my_tile.direction_to(resource_tile);
        if let Some(asset) = self.arena.get_mut(id) {
            if let Some(direction) = facing {
                asset.direction = direction;
            }
            asset.step += 1;
        }

        if my_step + 1 >= steps_needed {
            let removed = match resource {
                ResourceKind::Lumber => self.terrain.harvest_lumber(resource_tile, amount),
                ResourceKind::Stone => self.terrain.quarry_stone(resource_tile, amount),
                ResourceKind::Gold => 0,
            };
            if removed <= 0 {
                // Lost the race for the last of the tile; retarget next
                // tick.
                if let Some(asset) = self.arena.get_mut(id) {
                    asset.step = 0;
                }
                return;
            }
            if let Some(asset) = self.arena.get_mut(id) {
                asset.carried = Some((resource, removed));
                asset.step = 0;
            }
            self.post_event(id, event);

            match self.find_nearest_repository(my_tile, my_color, resource) {
                Some(repository) => {
                    // The gather command stays underneath so the cycle
                    // resumes after the delivery.
                    let convey_action = match resource {
                        ResourceKind::Lumber => AssetAction::ConveyLumber,
                        ResourceKind::Stone => AssetAction::ConveyStone,
                        ResourceKind::Gold => return,
                    };
                    if let Some(asset) = self.arena.get_mut(id) {
                        asset.push_command(AssetCommand::with_target(convey_action, repository));
                        asset.push_command(AssetCommand::with_target(
                            AssetAction::Walk,
                            repository,
                        ));
                    }
                }
                None => {
                    if let Some(asset) = self.arena.get_mut(id) {
                        asset.pop_command();
                    }
                }
            }
        }
    }

    fn handle_mine(&mut self, id: AssetId) {
        // A gold mine's own MineGold entries are bookkeeping for the
        // miners inside it, one entry per miner; the mine itself does
        // nothing with them.
        if self
            .asset(id)
            .map_or(false, |asset| asset.kind == AssetTypeKind::GoldMine)
        {
            return;
        }
        let Some(mine_id) = self
            .asset(id)
            .and_then(|asset| asset.current_command())
            .and_then(|command| command.target)
        else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };
        let Some((mine_tile, mine_size, mine_gold, mine_queue)) =
            self.asset(mine_id).map(|mine| {
                (
                    mine.tile_position(),
                    self.types(mine.color).get(mine.kind).size,
                    mine.mine_gold,
                    mine.command_count(),
                )
            })
        else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };

        let (my_tile, my_color, my_step) = {
            let Some(asset) = self.arena.get(id) else {
                return;
            };
            (asset.tile_position(), asset.color, asset.step)
        };
        let inside = my_tile.distance_to_footprint(mine_tile, mine_size) == 0;

        if !inside {
            if my_tile.distance_to_footprint(mine_tile, mine_size) > 1 {
                if let Some(asset) = self.arena.get_mut(id) {
                    asset.push_command(AssetCommand::with_target(AssetAction::Walk, mine_id));
                }
                return;
            }
            // Mining is serialized through the mine's own command queue.
            // A miner may only enter while a full pass remains for it.
            if mine_gold < (mine_queue as i32 + 1) * GOLD_PER_MINING {
                if let Some(asset) = self.arena.get_mut(id) {
                    asset.pop_command();
                }
                return;
            }
            let mine_position = self
                .asset(mine_id)
                .map(|mine| mine.position)
                .unwrap_or_default();
            if let Some(mine) = self.arena.get_mut(mine_id) {
                mine.push_command(AssetCommand::with_target(AssetAction::MineGold, id));
            }
            if let Some(asset) = self.arena.get_mut(id) {
                asset.position = mine_position;
                asset.step = 0;
            }
            return;
        }

        if let Some(asset) = self.arena.get_mut(id) {
            asset.step += 1;
        }
        if my_step + 1 < MINE_STEPS {
            return;
        }

        // A pass completes: unload the vein, leave the mine, queue the
        // delivery with the mining command underneath so the cycle
        // continues.
        if let Some(mine) = self.arena.get_mut(mine_id) {
            mine.remove_commands_targeting(id);
            mine.mine_gold -= GOLD_PER_MINING;
        }
        self.relocate_near(id, mine_id);
        if let Some(asset) = self.arena.get_mut(id) {
            asset.carried = Some((ResourceKind::Gold, GOLD_PER_MINING));
            asset.pop_command();
        }
        let my_tile = self
            .asset(id)
            .map(|asset| asset.tile_position())
            .unwrap_or(my_tile);
        if let Some(repository) =
            self.find_nearest_repository(my_tile, my_color, ResourceKind::Gold)
        {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.push_command(AssetCommand::with_target(AssetAction::MineGold, mine_id));
                asset.push_command(AssetCommand::with_target(
                    AssetAction::ConveyGold,
                    repository,
                ));
                asset.push_command(AssetCommand::with_target(AssetAction::Walk, repository));
            }
        }

        // The mine dies with its last pass and spills its queue.
        let exhausted = self
            .asset(mine_id)
            .map_or(false, |mine| mine.mine_gold <= 0);
        if exhausted {
            self.spill_mine_queue(mine_id);
            self.kill_asset(mine_id, None);
        }
    }

    /// Pop every queued miner out of an exhausted mine.
    fn spill_mine_queue(&mut self, mine_id: AssetId) {
        let queued: Vec<AssetId> = self
            .asset(mine_id)
            .map(Asset::command_targets)
            .unwrap_or_default();
        if let Some(mine) = self.arena.get_mut(mine_id) {
            mine.clear_commands();
        }
        for miner in queued {
            if self
                .asset(miner)
                .map_or(false, |asset| asset.action() == AssetAction::MineGold)
            {
                if let Some(asset) = self.arena.get_mut(miner) {
                    asset.pop_command();
                }
                self.relocate_near(miner, mine_id);
            }
        }
    }

    fn handle_convey(&mut self, id: AssetId) {
        let action = self.asset(id).map_or(AssetAction::None, Asset::action);
        let resource = match action {
            AssetAction::ConveyGold => ResourceKind::Gold,
            AssetAction::ConveyLumber => ResourceKind::Lumber,
            AssetAction::ConveyStone => ResourceKind::Stone,
            _ => return,
        };
        let Some(repository_id) = self
            .asset(id)
            .and_then(|asset| asset.current_command())
            .and_then(|command| command.target)
        else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };

        let (my_tile, my_color, my_step) = {
            let Some(asset) = self.arena.get(id) else {
                return;
            };
            (asset.tile_position(), asset.color, asset.step)
        };

        let repository = self.asset(repository_id).and_then(|repo| {
            if repo.alive() && repo.action() != AssetAction::Construct {
                Some((
                    repo.tile_position(),
                    self.types(repo.color).get(repo.kind).size,
                    repo.position,
                ))
            } else {
                None
            }
        });
        let Some((repo_tile, repo_size, repo_position)) = repository else {
            // The repository fell: deliver somewhere else or give up.
            match self.find_nearest_repository(my_tile, my_color, resource) {
                Some(replacement) => {
                    if let Some(asset) = self.arena.get_mut(id) {
                        if let Some(command) = asset.current_command_mut() {
                            command.target = Some(replacement);
                        }
                        asset.push_command(AssetCommand::with_target(
                            AssetAction::Walk,
                            replacement,
                        ));
                    }
                }
                None => {
                    if let Some(asset) = self.arena.get_mut(id) {
                        asset.pop_command();
                    }
                }
            }
            return;
        };

        let inside = my_tile.distance_to_footprint(repo_tile, repo_size) == 0;
        if !inside {
            if my_tile.distance_to_footprint(repo_tile, repo_size) > 1 {
                if let Some(asset) = self.arena.get_mut(id) {
                    asset.push_command(AssetCommand::with_target(AssetAction::Walk, repository_id));
                }
                return;
            }
            if let Some(asset) = self.arena.get_mut(id) {
                asset.position = repo_position;
                asset.step = 0;
            }
            return;
        }

        if let Some(asset) = self.arena.get_mut(id) {
            asset.step += 1;
        }
        if my_step + 1 < CONVEY_STEPS {
            return;
        }

        let amount = self
            .asset(id)
            .and_then(|asset| asset.carried)
            .map_or(0, |(_, amount)| amount);
        match resource {
            ResourceKind::Gold => self.player_mut(my_color).increment_gold(amount),
            ResourceKind::Lumber => self.player_mut(my_color).increment_lumber(amount),
            ResourceKind::Stone => self.player_mut(my_color).increment_stone(amount),
        }
        if let Some(asset) = self.arena.get_mut(id) {
            asset.carried = None;
            asset.pop_command();
        }
        self.relocate_near(id, repository_id);
    }

    fn handle_shelter(&mut self, id: AssetId) {
        let Some(shelter_id) = self
            .asset(id)
            .and_then(|asset| asset.current_command())
            .and_then(|command| command.target)
        else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };
        let shelter = self.asset(shelter_id).and_then(|shelter| {
            if shelter.alive() {
                Some((
                    shelter.tile_position(),
                    self.types(shelter.color).get(shelter.kind).size,
                    self.types(shelter.color)
                        .get(shelter.kind)
                        .shelter_capacity,
                    shelter.sheltered.len(),
                    shelter.position,
                    shelter.color,
                ))
            } else {
                None
            }
        });
        let Some((shelter_tile, shelter_size, capacity, occupants, shelter_position, color)) =
            shelter
        else {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.pop_command();
            }
            return;
        };

        // The shelter filled while walking over: retarget another one.
        if occupants >= capacity {
            let my_tile = self
                .asset(id)
                .map(|asset| asset.tile_position())
                .unwrap_or(shelter_tile);
            let replacement = self.find_open_shelter(my_tile, color, shelter_id);
            match replacement {
                Some(other) => {
                    if let Some(asset) = self.arena.get_mut(id) {
                        if let Some(command) = asset.current_command_mut() {
                            command.target = Some(other);
                        }
                        asset.push_command(AssetCommand::with_target(AssetAction::Walk, other));
                    }
                }
                None => {
                    if let Some(asset) = self.arena.get_mut(id) {
                        asset.pop_command();
                    }
                }
            }
            return;
        }

        let my_tile = {
            let Some(asset) = self.arena.get(id) else {
                return;
            };
            asset.tile_position()
        };
        if my_tile.distance_to_footprint(shelter_tile, shelter_size) > 1 {
            if let Some(asset) = self.arena.get_mut(id) {
                asset.push_command(AssetCommand::with_target(AssetAction::Walk, shelter_id));
            }
            return;
        }

        // Occupy a slot and vanish into the shelter.
        if let Some(shelter) = self.arena.get_mut(shelter_id) {
            shelter.sheltered.push(id);
        }
        if let Some(asset) = self.arena.get_mut(id) {
            asset.sheltered_in = Some(shelter_id);
            asset.position = shelter_position;
            asset.clear_commands();
        }
    }

    /// Nearest same-color shelter with a free slot, excluding one.
    fn find_open_shelter(
        &self,
        from: TilePosition,
        color: PlayerColor,
        exclude: AssetId,
    ) -> Option<AssetId> {
        let mut best: Option<(i32, AssetId)> = None;
        for &id in &self.player(color).asset_ids {
            if id == exclude {
                continue;
            }
            let Some(asset) = self.asset(id) else {
                continue;
            };
            let ty = self.types(color).get(asset.kind);
            if !asset.alive()
                || ty.shelter_capacity == 0
                || asset.sheltered.len() >= ty.shelter_capacity
                || asset.action() == AssetAction::Construct
            {
                continue;
            }
            let distance = from.distance_to_footprint(asset.tile_position(), ty.size);
            if best.map_or(true, |(bd, bid)| (distance, id) < (bd, bid)) {
                best = Some((distance, id));
            }
        }
        best.map(|(_, id)| id)
    }

    fn handle_death(&mut self, id: AssetId) {
        let Some(asset) = self.arena.get_mut(id) else {
            return;
        };
        asset.step += 1;
        if asset.step < DEATH_STEPS {
            return;
        }
        let (position, color, kind) = (asset.position, asset.color, asset.kind);
        let mobile = self.types(color).get(kind).is_mobile();
        if mobile && kind != AssetTypeKind::None {
            let corpse = self.create_marker(position);
            if let Some(marker) = self.arena.get_mut(corpse) {
                marker.push_command(AssetCommand::new(AssetAction::Decay));
            }
        }
        self.delete_asset(id);
    }

    fn handle_decay(&mut self, id: AssetId) {
        let Some(asset) = self.arena.get_mut(id) else {
            return;
        };
        asset.step += 1;
        if asset.step >= DECAY_STEPS {
            self.delete_asset(id);
        }
    }

    /// Drop markers no command references anymore.
    fn prune_markers(&mut self) {
        let candidates: Vec<AssetId> = self
            .arena
            .sorted_ids()
            .into_iter()
            .filter(|&id| {
                self.arena
                    .get(id)
                    .map_or(false, |asset| asset.is_stale_marker())
            })
            .collect();
        for marker in candidates {
            let referenced = self.arena.sorted_ids().into_iter().any(|id| {
                id != marker
                    && self
                        .arena
                        .get(id)
                        .map_or(false, |asset| asset.references(marker))
            });
            if !referenced {
                self.delete_asset(marker);
            }
        }
    }

    // ------------------------------------------------------------------
    // Determinism support
    // ------------------------------------------------------------------

    /// Hash of the full simulation state, for desync detection and replay
    /// verification.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.cycle.hash(&mut hasher);
        self.rng.state_words().hash(&mut hasher);

        let ids = self.arena.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            let Some(asset) = self.arena.get(id) else {
                continue;
            };
            id.hash(&mut hasher);
            asset.kind.name().hash(&mut hasher);
            asset.color.index().hash(&mut hasher);
            asset.position.x.hash(&mut hasher);
            asset.position.y.hash(&mut hasher);
            asset.hit_points.hash(&mut hasher);
            asset.step.hash(&mut hasher);
            asset.mine_gold.hash(&mut hasher);
            asset.missile_damage.hash(&mut hasher);
            if let Some((kind, amount)) = asset.carried {
                (kind as u8).hash(&mut hasher);
                amount.hash(&mut hasher);
            }
            (asset.action() as u8).hash(&mut hasher);
            asset.command_count().hash(&mut hasher);
        }

        for player in &self.players {
            player.gold().hash(&mut hasher);
            player.lumber().hash(&mut hasher);
            player.stone().hash(&mut hasher);
            player.food_consumption.hash(&mut hasher);
            player.food_production.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the full model for snapshots and transfer.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("failed to serialize model: {e}")))
    }

    /// Restore a model from a snapshot.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("failed to deserialize model: {e}")))
    }
}
