//! Unit training capabilities.
//!
//! Training runs inside the producing building: the trainee asset exists
//! from the first tick at one hit point, hidden within the building's
//! footprint, and steps out next to it when ready.

use serde::{Deserialize, Serialize};

use crate::activated::ActivatedCapability;
use crate::asset::{AssetAction, AssetCommand, AssetId};
use crate::asset_type::{AssetTypeKind, PlayerColor, ResourceCost, UPDATE_FREQUENCY};
use crate::capabilities::build::interpolate_hit_points;
use crate::capability::{Capability, CapabilityId, CapabilityRegistry, Target, TargetKind};
use crate::events::EventKind;
use crate::game::GameModel;

/// Register the training singletons.
pub fn register(registry: &mut CapabilityRegistry) {
    let kinds = [
        (CapabilityId::TrainPeasant, AssetTypeKind::Peasant),
        (CapabilityId::TrainFootman, AssetTypeKind::Footman),
        (CapabilityId::TrainArcher, AssetTypeKind::Archer),
        (CapabilityId::TrainRanger, AssetTypeKind::Ranger),
    ];
    for (id, unit) in kinds {
        let _ = registry.register(Box::new(TrainCapability { id, unit }));
    }
}

/// Train one kind of unit.
pub struct TrainCapability {
    id: CapabilityId,
    unit: AssetTypeKind,
}

impl Capability for TrainCapability {
    fn id(&self) -> CapabilityId {
        self.id
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::None
    }

    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool {
        let Some(building) = model.asset(actor) else {
            return false;
        };
        let types = model.types(building.color);
        if !types.get(building.kind).has_capability(self.id) {
            return false;
        }
        model.player(building.color).can_afford(types.get(self.unit).cost)
            && model.requirements_met(building.color, self.unit)
    }

    fn unmet_requirements(&self, model: &GameModel, actor: AssetId) -> String {
        let Some(building) = model.asset(actor) else {
            return String::new();
        };
        let unit_type = model.types(building.color).get(self.unit);
        let mut unmet = model.player(building.color).unmet_cost(unit_type.cost);
        for requirement in &unit_type.requirements {
            if !model.owns_completed(building.color, *requirement) {
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
        let Some((color, site)) = model
            .asset(actor)
            .map(|building| (building.color, building.tile_position()))
        else {
            return false;
        };
        let unit_type = model.types(color).get(self.unit).clone();
        model.player_mut(color).spend(unit_type.cost);

        let trainee = model.create_incomplete_asset(color, self.unit, site);
        if let Some(unit) = model.asset_mut(trainee) {
            unit.push_command(AssetCommand::with_target(AssetAction::Construct, actor));
        }

        let total_steps = unit_type.build_time.max(1) as u32 * UPDATE_FREQUENCY;
        if let Some(building) = model.asset_mut(actor) {
            building.clear_commands();
            building.push_command(AssetCommand {
                action: AssetAction::Capability,
                capability: Some(self.id),
                target: Some(trainee),
                activated: Some(ActivatedCapability::Train(TrainActivation {
                    capability: self.id,
                    building: actor,
                    trainee,
                    color,
                    total_steps,
                    step: 0,
                    cost: unit_type.cost,
                    refunded: false,
                })),
            });
        }
        model.post_acknowledge(actor);
        true
    }
}

/// Multi-tick training state, owned by the building's capability command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The producing building.
    pub building: AssetId,
    /// The unit being trained.
    pub trainee: AssetId,
    /// The paying player.
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

impl TrainActivation {
    /// Advance training one tick.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        self.step += 1;
        let max_hp = model
            .asset_type_of(self.trainee)
            .map_or(1, |ty| ty.hit_points);
        let hp = interpolate_hit_points(max_hp, self.step, self.total_steps);
        if let Some(unit) = model.asset_mut(self.trainee) {
            unit.hit_points = hp;
        }

        if self.step < self.total_steps {
            return false;
        }

        if let Some(unit) = model.asset_mut(self.trainee) {
            unit.hit_points = max_hp;
            unit.pop_command();
        }
        model.relocate_near(self.trainee, self.building);
        model.post_event(self.trainee, EventKind::Ready);
        true
    }

    /// Refund and discard the half-trained unit. Safe to call twice.
    pub fn cancel(&mut self, model: &mut GameModel) {
        if self.refunded {
            return;
        }
        self.refunded = true;
        model.player_mut(self.color).refund(self.cost);
        model.delete_asset(self.trainee);
    }

    /// Overwrite progress during save restoration.
    pub fn restore_step(&mut self, step: u32, model: &mut GameModel) {
        self.step = step.min(self.total_steps);
        let max_hp = model
            .asset_type_of(self.trainee)
            .map_or(1, |ty| ty.hit_points);
        let hp = interpolate_hit_points(max_hp, self.step, self.total_steps);
        if let Some(unit) = model.asset_mut(self.trainee) {
            unit.hit_points = hp;
        }
    }
}
