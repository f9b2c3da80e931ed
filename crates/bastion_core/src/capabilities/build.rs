//! Building construction capabilities.
//!
//! One singleton per constructible building kind. The peasant walks to the
//! site first; placement and funds are validated only once it arrives, at
//! which point the building asset is created at one hit point and its
//! Construct command drives the hit-point interpolation.
//!
//! The gold mine is the special case: it is owned by the colorless neutral
//! player, must cover a located gold vein, and is pre-seeded with a fixed
//! gold reserve.

use serde::{Deserialize, Serialize};

use crate::activated::ActivatedCapability;
use crate::asset::{AssetAction, AssetCommand, AssetId};
use crate::asset_type::{AssetTypeKind, PlayerColor, ResourceCost, UPDATE_FREQUENCY};
use crate::capability::{Capability, CapabilityId, CapabilityRegistry, Target, TargetKind};
use crate::events::EventKind;
use crate::game::GameModel;

/// Gold reserve seeded into a newly constructed gold mine.
pub const GOLD_MINE_SEED: i32 = 25_000;

/// Register the construction singletons.
pub fn register(registry: &mut CapabilityRegistry) {
    let kinds = [
        (CapabilityId::BuildWall, AssetTypeKind::Wall),
        (CapabilityId::BuildFarm, AssetTypeKind::Farm),
        (CapabilityId::BuildTownHall, AssetTypeKind::TownHall),
        (CapabilityId::BuildBarracks, AssetTypeKind::Barracks),
        (CapabilityId::BuildLumberMill, AssetTypeKind::LumberMill),
        (CapabilityId::BuildBlacksmith, AssetTypeKind::Blacksmith),
        (CapabilityId::BuildScoutTower, AssetTypeKind::ScoutTower),
        (CapabilityId::BuildGoldMine, AssetTypeKind::GoldMine),
    ];
    for (id, building) in kinds {
        let _ = registry.register(Box::new(BuildCapability { id, building }));
    }
}

/// Construct one kind of building.
pub struct BuildCapability {
    id: CapabilityId,
    building: AssetTypeKind,
}

impl Capability for BuildCapability {
    fn id(&self) -> CapabilityId {
        self.id
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Terrain
    }

    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool {
        let Some(asset) = model.asset(actor) else {
            return false;
        };
        let types = model.types(asset.color);
        if !types.get(asset.kind).has_capability(self.id) {
            return false;
        }
        let building_type = types.get(self.building);
        model.player(asset.color).can_afford(building_type.cost)
            && model.requirements_met(asset.color, self.building)
    }

    fn unmet_requirements(&self, model: &GameModel, actor: AssetId) -> String {
        let Some(asset) = model.asset(actor) else {
            return String::new();
        };
        let building_type = model.types(asset.color).get(self.building);
        let mut unmet = model.player(asset.color).unmet_cost(building_type.cost);
        for requirement in &building_type.requirements {
            if !model.owns_completed(asset.color, *requirement) {
                unmet.push_str(requirement.name());
                unmet.push(' ');
            }
        }
        unmet
    }

    fn can_apply(&self, model: &GameModel, actor: AssetId, _target: &Target) -> bool {
        self.can_initiate(model, actor)
    }

    fn apply(&self, model: &mut GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_apply(model, actor, target) {
            return false;
        }
        let Some((actor_tile, actor_color)) = model
            .asset(actor)
            .map(|asset| (asset.tile_position(), asset.color))
        else {
            return false;
        };
        let site = target.location.tile();

        // Not on site yet: walk there and re-resolve on arrival.
        if actor_tile != site {
            let Some(marker) = target.asset else {
                return false;
            };
            if let Some(asset) = model.asset_mut(actor) {
                asset.clear_commands();
                asset.push_command(AssetCommand {
                    action: AssetAction::Capability,
                    capability: Some(self.id),
                    target: Some(marker),
                    activated: None,
                });
                asset.push_command(AssetCommand::with_target(AssetAction::Walk, marker));
            }
            model.post_acknowledge(actor);
            return true;
        }

        let building_type = model.types(actor_color).get(self.building).clone();
        if !model.can_place_building(site, building_type.size, &[actor]) {
            return false;
        }
        if self.building == AssetTypeKind::GoldMine
            && !model
                .terrain()
                .footprint_covers_vein(site, building_type.size)
        {
            return false;
        }

        model.player_mut(actor_color).spend(building_type.cost);

        // Gold mines belong to no player and start with their reserve.
        let owner = if self.building == AssetTypeKind::GoldMine {
            PlayerColor::None
        } else {
            actor_color
        };
        let building = model.create_incomplete_asset(owner, self.building, site);
        if self.building == AssetTypeKind::GoldMine {
            if let Some(mine) = model.asset_mut(building) {
                mine.mine_gold = GOLD_MINE_SEED;
            }
        }

        let total_steps = building_type.build_time.max(1) as u32 * UPDATE_FREQUENCY;
        if let Some(site_asset) = model.asset_mut(building) {
            site_asset.push_command(AssetCommand {
                action: AssetAction::Construct,
                capability: Some(self.id),
                target: Some(actor),
                activated: Some(ActivatedCapability::Construct(ConstructActivation {
                    capability: self.id,
                    builder: actor,
                    building,
                    color: actor_color,
                    total_steps,
                    step: 0,
                    cost: building_type.cost,
                    refunded: false,
                })),
            });
        }
        if let Some(builder) = model.asset_mut(actor) {
            builder.clear_commands();
            builder.push_command(AssetCommand::with_target(AssetAction::Build, building));
        }
        model.post_event(building, EventKind::PlaceAction);
        model.post_acknowledge(actor);
        true
    }
}

/// Multi-tick construction state, owned by the building's Construct
/// command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The peasant at the site.
    pub builder: AssetId,
    /// The building going up.
    pub building: AssetId,
    /// The paying player; gold mines are neutral-owned but player-paid.
    pub color: PlayerColor,
    /// Ticks to completion.
    pub total_steps: u32,
    /// Ticks elapsed.
    pub step: u32,
    /// Resources committed at apply time.
    pub cost: ResourceCost,
    /// Guard against double refunds.
    pub refunded: bool,
}

impl ConstructActivation {
    /// Advance construction one tick, interpolating hit points so the
    /// final step lands exactly on the maximum.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        self.step += 1;
        let max_hp = model
            .asset_type_of(self.building)
            .map_or(1, |ty| ty.hit_points);
        let hp = interpolate_hit_points(max_hp, self.step, self.total_steps);
        if let Some(building) = model.asset_mut(self.building) {
            building.hit_points = hp;
        }

        if self.step < self.total_steps {
            return false;
        }

        // Complete: free the builder and announce the work.
        self.release_builder(model);
        model.post_event(self.builder, EventKind::WorkComplete);
        true
    }

    /// Refund and demolish. Safe to call twice.
    pub fn cancel(&mut self, model: &mut GameModel) {
        if self.refunded {
            return;
        }
        self.refunded = true;
        model.player_mut(self.color).refund(self.cost);
        self.release_builder(model);
        model.delete_asset(self.building);
    }

    /// Overwrite progress during save restoration.
    pub fn restore_step(&mut self, step: u32, model: &mut GameModel) {
        self.step = step.min(self.total_steps);
        let max_hp = model
            .asset_type_of(self.building)
            .map_or(1, |ty| ty.hit_points);
        let hp = interpolate_hit_points(max_hp, self.step, self.total_steps);
        if let Some(building) = model.asset_mut(self.building) {
            building.hit_points = hp;
        }
    }

    /// Pop the builder's Build command and move it off the footprint.
    fn release_builder(&self, model: &mut GameModel) {
        let waiting = model.asset(self.builder).map_or(false, |builder| {
            builder.action() == AssetAction::Build
                && builder
                    .current_command()
                    .and_then(|command| command.target)
                    == Some(self.building)
        });
        if !waiting {
            return;
        }
        if let Some(builder) = model.asset_mut(self.builder) {
            builder.pop_command();
        }
        model.relocate_near(self.builder, self.building);
    }
}

/// Hit points after `step` of `total` construction ticks: starts above
/// zero, grows linearly, ends exactly at `max_hp`.
#[must_use]
pub fn interpolate_hit_points(max_hp: i32, step: u32, total: u32) -> i32 {
    if total == 0 {
        return max_hp;
    }
    let scaled = i64::from(max_hp) * i64::from(step.min(total)) / i64::from(total);
    (scaled as i32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_endpoints() {
        assert_eq!(interpolate_hit_points(400, 0, 900), 1);
        assert_eq!(interpolate_hit_points(400, 900, 900), 400);
        assert_eq!(interpolate_hit_points(400, 450, 900), 200);
    }

    #[test]
    fn test_interpolation_monotone() {
        let mut last = 0;
        for step in 0..=300 {
            let hp = interpolate_hit_points(1200, step, 300);
            assert!(hp >= last);
            last = hp;
        }
        assert_eq!(last, 1200);
    }
}
