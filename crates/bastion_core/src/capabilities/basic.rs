//! Basic orders: move, attack, stand ground, patrol, repair, gather,
//! convey, shelter, and cancel.
//!
//! These capabilities complete their activation on the first step by
//! rewriting the actor's command stack into plain action commands; the
//! long-running work happens in the tick's action handlers. The tick pops
//! the capability command before stepping, so activations only push.

use serde::{Deserialize, Serialize};

use crate::activated::ActivatedCapability;
use crate::asset::{AssetAction, AssetCommand, AssetId};
use crate::asset_type::{AssetTypeKind, ResourceCost, ResourceKind};
use crate::capability::{Capability, CapabilityId, CapabilityRegistry, Target, TargetKind};
use crate::game::GameModel;
use crate::terrain::TerrainTile;

/// Register the basic capability singletons.
pub fn register(registry: &mut CapabilityRegistry) {
    let _ = registry.register(Box::new(MoveCapability));
    let _ = registry.register(Box::new(RepairCapability));
    let _ = registry.register(Box::new(MineCapability));
    let _ = registry.register(Box::new(ConveyCapability));
    let _ = registry.register(Box::new(PatrolCapability));
    let _ = registry.register(Box::new(StandGroundCapability));
    let _ = registry.register(Box::new(AttackCapability));
    let _ = registry.register(Box::new(ShelterCapability));
    let _ = registry.register(Box::new(CancelCapability));
}

/// Whether the actor's type carries the capability bit.
fn has_capability_bit(model: &GameModel, actor: AssetId, capability: CapabilityId) -> bool {
    model
        .asset(actor)
        .map_or(false, |asset| {
            model
                .types(asset.color)
                .get(asset.kind)
                .has_capability(capability)
        })
}

/// Clear the actor's stack and push a capability command carrying a fresh
/// activation.
fn replace_with_activation(
    model: &mut GameModel,
    actor: AssetId,
    capability: CapabilityId,
    target: Option<AssetId>,
    activated: ActivatedCapability,
) {
    if let Some(asset) = model.asset_mut(actor) {
        asset.clear_commands();
        asset.push_command(AssetCommand {
            action: AssetAction::Capability,
            capability: Some(capability),
            target,
            activated: Some(activated),
        });
    }
}

// ============================================================================
// Move
// ============================================================================

/// Walk to a location or asset.
pub struct MoveCapability;

impl Capability for MoveCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::Move
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::TerrainOrAsset
    }

    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool {
        has_capability_bit(model, actor, self.id())
            && model
                .asset_type_of(actor)
                .map_or(false, |ty| ty.is_mobile())
    }

    fn can_apply(&self, model: &GameModel, actor: AssetId, target: &Target) -> bool {
        self.can_initiate(model, actor)
            && model.asset(actor).map_or(false, |asset| {
                asset.tile_position() != target.location.tile()
            })
    }

    fn apply(&self, model: &mut GameModel, actor: AssetId, target: &Target) -> bool {
        // Already there: the transition is forbidden, not a no-op.
        if !self.can_apply(model, actor, target) {
            return false;
        }
        replace_with_activation(
            model,
            actor,
            self.id(),
            target.asset,
            ActivatedCapability::Move(MoveActivation {
                capability: self.id(),
                actor,
                target: target.asset,
            }),
        );
        model.post_acknowledge(actor);
        true
    }
}

/// One-shot walk activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The walker.
    pub actor: AssetId,
    /// Destination marker or asset.
    pub target: Option<AssetId>,
}

impl MoveActivation {
    /// Replace this activation with a Walk command.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        let Some(target) = self.target else {
            return true;
        };
        if model.asset(target).is_none() {
            return true;
        }
        if let Some(asset) = model.asset_mut(self.actor) {
            asset.push_command(AssetCommand::with_target(AssetAction::Walk, target));
        }
        true
    }
}

// ============================================================================
// Attack
// ============================================================================

/// Fight another asset.
pub struct AttackCapability;

impl Capability for AttackCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::Attack
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Asset
    }

    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool {
        has_capability_bit(model, actor, self.id())
    }

    fn can_apply(&self, model: &GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_initiate(model, actor) {
            return false;
        }
        let Some(target_id) = target.asset else {
            return false;
        };
        let (Some(attacker), Some(defender)) = (model.asset(actor), model.asset(target_id)) else {
            return false;
        };
        if !defender.alive() || defender.color == attacker.color {
            return false;
        }
        // Neutral assets (gold mines, markers) are not combatants.
        if defender.color == crate::asset_type::PlayerColor::None {
            return false;
        }
        // A peasant cannot bring down a wall.
        if attacker.kind == AssetTypeKind::Peasant && defender.kind == AssetTypeKind::Wall {
            return false;
        }
        // Forest concealment protects from targeting and forbids attacking.
        if model.is_concealed(target_id) || model.is_concealed(actor) {
            return false;
        }
        true
    }

    fn apply(&self, model: &mut GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_apply(model, actor, target) {
            return false;
        }
        let Some(target_id) = target.asset else {
            return false;
        };
        replace_with_activation(
            model,
            actor,
            self.id(),
            Some(target_id),
            ActivatedCapability::Attack(AttackActivation {
                capability: self.id(),
                actor,
                target: target_id,
            }),
        );
        model.post_acknowledge(actor);
        true
    }
}

/// One-shot attack activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The attacker.
    pub actor: AssetId,
    /// The defender.
    pub target: AssetId,
}

impl AttackActivation {
    /// Replace this activation with Attack under Walk, so the walker pops
    /// into the attack once in range.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        let target_alive = model.asset(self.target).map_or(false, |t| t.alive());
        if !target_alive {
            return true;
        }
        if let Some(asset) = model.asset_mut(self.actor) {
            asset.push_command(AssetCommand::with_target(AssetAction::Attack, self.target));
            asset.push_command(AssetCommand::with_target(AssetAction::Walk, self.target));
        }
        true
    }
}

// ============================================================================
// Stand ground
// ============================================================================

/// Hold position and engage enemies in range.
pub struct StandGroundCapability;

impl Capability for StandGroundCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::StandGround
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::None
    }

    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool {
        has_capability_bit(model, actor, self.id())
    }

    fn can_apply(&self, model: &GameModel, actor: AssetId, _target: &Target) -> bool {
        self.can_initiate(model, actor)
    }

    fn apply(&self, model: &mut GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_apply(model, actor, target) {
            return false;
        }
        replace_with_activation(
            model,
            actor,
            self.id(),
            None,
            ActivatedCapability::StandGround(StandGroundActivation {
                capability: self.id(),
                actor,
            }),
        );
        model.post_acknowledge(actor);
        true
    }
}

/// One-shot stand-ground activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandGroundActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The holder.
    pub actor: AssetId,
}

impl StandGroundActivation {
    /// Replace this activation with a StandGround command.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        if let Some(asset) = model.asset_mut(self.actor) {
            asset.push_command(AssetCommand::new(AssetAction::StandGround));
        }
        true
    }
}

// ============================================================================
// Patrol
// ============================================================================

/// Walk back and forth between the current position and a target.
pub struct PatrolCapability;

impl Capability for PatrolCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::Patrol
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Terrain
    }

    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool {
        has_capability_bit(model, actor, self.id())
            && model
                .asset_type_of(actor)
                .map_or(false, |ty| ty.is_mobile())
    }

    fn can_apply(&self, model: &GameModel, actor: AssetId, target: &Target) -> bool {
        self.can_initiate(model, actor)
            && target
                .asset
                .map_or(false, |id| model.asset(id).is_some())
    }

    fn apply(&self, model: &mut GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_apply(model, actor, target) {
            return false;
        }
        let Some(target_id) = target.asset else {
            return false;
        };
        replace_with_activation(
            model,
            actor,
            self.id(),
            Some(target_id),
            ActivatedCapability::Patrol(PatrolActivation {
                capability: self.id(),
                actor,
                target: target_id,
            }),
        );
        model.post_acknowledge(actor);
        true
    }
}

/// One leg of a patrol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatrolActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The patroller.
    pub actor: AssetId,
    /// This leg's far endpoint.
    pub target: AssetId,
}

impl PatrolActivation {
    /// Push a deferred return-leg patrol under a walk to the far endpoint.
    /// When the walk completes, the deferred capability resolves and flips
    /// the legs.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        if model.asset(self.target).is_none() {
            return true;
        }
        let Some(origin) = model.asset(self.actor).map(|asset| asset.position) else {
            return true;
        };
        let origin_marker = model.create_marker(origin);
        if let Some(asset) = model.asset_mut(self.actor) {
            asset.push_command(AssetCommand {
                action: AssetAction::Capability,
                capability: Some(CapabilityId::Patrol),
                target: Some(origin_marker),
                activated: None,
            });
            asset.push_command(AssetCommand::with_target(AssetAction::Walk, self.target));
        }
        true
    }
}

// ============================================================================
// Repair
// ============================================================================

/// Repair a damaged building, draining one of each resource per increment.
pub struct RepairCapability;

impl Capability for RepairCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::Repair
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Asset
    }

    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool {
        if !has_capability_bit(model, actor, self.id()) {
            return false;
        }
        model.asset(actor).map_or(false, |asset| {
            model
                .player(asset.color)
                .can_afford(ResourceCost::new(1, 1, 1))
        })
    }

    fn unmet_requirements(&self, model: &GameModel, actor: AssetId) -> String {
        model.asset(actor).map_or_else(String::new, |asset| {
            model
                .player(asset.color)
                .unmet_cost(ResourceCost::new(1, 1, 1))
        })
    }

    fn can_apply(&self, model: &GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_initiate(model, actor) {
            return false;
        }
        let Some(target_id) = target.asset else {
            return false;
        };
        let (Some(actor_asset), Some(target_asset)) =
            (model.asset(actor), model.asset(target_id))
        else {
            return false;
        };
        if target_asset.color != actor_asset.color || !target_asset.alive() {
            return false;
        }
        let target_type = model.types(target_asset.color).get(target_asset.kind);
        !target_type.is_mobile() && target_asset.hit_points < target_type.hit_points
    }

    fn apply(&self, model: &mut GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_apply(model, actor, target) {
            return false;
        }
        let Some(target_id) = target.asset else {
            return false;
        };
        replace_with_activation(
            model,
            actor,
            self.id(),
            Some(target_id),
            ActivatedCapability::Repair(RepairActivation {
                capability: self.id(),
                actor,
                target: target_id,
            }),
        );
        model.post_acknowledge(actor);
        true
    }
}

/// One-shot repair activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The repairer.
    pub actor: AssetId,
    /// The damaged building.
    pub target: AssetId,
}

impl RepairActivation {
    /// Replace this activation with Repair under Walk.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        let valid = model.asset(self.target).map_or(false, |t| t.alive());
        if !valid {
            return true;
        }
        if let Some(asset) = model.asset_mut(self.actor) {
            asset.push_command(AssetCommand::with_target(AssetAction::Repair, self.target));
            asset.push_command(AssetCommand::with_target(AssetAction::Walk, self.target));
        }
        true
    }
}

// ============================================================================
// Mine / Harvest / Quarry
// ============================================================================

/// Gather resources. One capability that branches at activation time into
/// gold mining, lumber harvesting or stone quarrying depending on the
/// target.
pub struct MineCapability;

impl Capability for MineCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::Mine
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::TerrainOrAsset
    }

    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool {
        has_capability_bit(model, actor, self.id())
    }

    fn can_apply(&self, model: &GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_initiate(model, actor) {
            return false;
        }
        // A loaded carrier must convey before gathering again.
        if model.asset(actor).map_or(true, |a| a.carried.is_some()) {
            return false;
        }
        let Some(target_id) = target.asset else {
            return false;
        };
        let Some(target_asset) = model.asset(target_id) else {
            return false;
        };
        match target_asset.kind {
            AssetTypeKind::GoldMine => target_asset.mine_gold > 0,
            AssetTypeKind::None => {
                let tile = target_asset.tile_position();
                match model.terrain().tile(tile) {
                    TerrainTile::Forest => model.terrain().lumber_at(tile) > 0,
                    TerrainTile::Rock => model.terrain().stone_at(tile) > 0,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn apply(&self, model: &mut GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_apply(model, actor, target) {
            return false;
        }
        let Some(target_id) = target.asset else {
            return false;
        };
        replace_with_activation(
            model,
            actor,
            self.id(),
            Some(target_id),
            ActivatedCapability::Mine(MineActivation {
                capability: self.id(),
                actor,
                target: target_id,
            }),
        );
        model.post_acknowledge(actor);
        true
    }
}

/// One-shot gather activation; picks the concrete sub-behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MineActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The gatherer.
    pub actor: AssetId,
    /// Gold mine asset or terrain marker.
    pub target: AssetId,
}

impl MineActivation {
    /// Branch into MineGold, HarvestLumber or QuarryStone under a Walk.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        let Some(target_asset) = model.asset(self.target) else {
            return true;
        };
        let action = match target_asset.kind {
            AssetTypeKind::GoldMine => AssetAction::MineGold,
            AssetTypeKind::None => {
                match model.terrain().tile(target_asset.tile_position()) {
                    TerrainTile::Forest => AssetAction::HarvestLumber,
                    TerrainTile::Rock => AssetAction::QuarryStone,
                    _ => return true,
                }
            }
            _ => return true,
        };
        if let Some(asset) = model.asset_mut(self.actor) {
            asset.push_command(AssetCommand::with_target(action, self.target));
            asset.push_command(AssetCommand::with_target(AssetAction::Walk, self.target));
        }
        true
    }
}

// ============================================================================
// Convey
// ============================================================================

/// Deliver the carried resource to a repository.
pub struct ConveyCapability;

impl Capability for ConveyCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::Convey
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Asset
    }

    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool {
        has_capability_bit(model, actor, self.id())
            && model.asset(actor).map_or(false, |a| a.carried.is_some())
    }

    fn can_apply(&self, model: &GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_initiate(model, actor) {
            return false;
        }
        let Some(target_id) = target.asset else {
            return false;
        };
        let (Some(actor_asset), Some(repository)) = (model.asset(actor), model.asset(target_id))
        else {
            return false;
        };
        let Some((kind, _)) = actor_asset.carried else {
            return false;
        };
        if repository.color != actor_asset.color
            || !repository.alive()
            || repository.action() == AssetAction::Construct
        {
            return false;
        }
        match kind {
            ResourceKind::Gold => repository.kind.accepts_gold(),
            ResourceKind::Lumber => repository.kind.accepts_lumber(),
            ResourceKind::Stone => repository.kind.accepts_stone(),
        }
    }

    fn apply(&self, model: &mut GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_apply(model, actor, target) {
            return false;
        }
        let Some(target_id) = target.asset else {
            return false;
        };
        replace_with_activation(
            model,
            actor,
            self.id(),
            Some(target_id),
            ActivatedCapability::Convey(ConveyActivation {
                capability: self.id(),
                actor,
                target: target_id,
            }),
        );
        model.post_acknowledge(actor);
        true
    }
}

/// One-shot delivery activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConveyActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The carrier.
    pub actor: AssetId,
    /// The repository.
    pub target: AssetId,
}

impl ConveyActivation {
    /// Replace this activation with the kind-matched convey action under a
    /// Walk.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        let valid = model.asset(self.target).map_or(false, |t| t.alive());
        if !valid {
            return true;
        }
        let Some(kind) = model
            .asset(self.actor)
            .and_then(|asset| asset.carried.map(|(kind, _)| kind))
        else {
            return true;
        };
        let action = match kind {
            ResourceKind::Gold => AssetAction::ConveyGold,
            ResourceKind::Lumber => AssetAction::ConveyLumber,
            ResourceKind::Stone => AssetAction::ConveyStone,
        };
        if let Some(asset) = model.asset_mut(self.actor) {
            asset.push_command(AssetCommand::with_target(action, self.target));
            asset.push_command(AssetCommand::with_target(AssetAction::Walk, self.target));
        }
        true
    }
}

// ============================================================================
// Shelter
// ============================================================================

/// Garrison a peasant inside a shelter with free capacity.
pub struct ShelterCapability;

impl Capability for ShelterCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::Shelter
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Asset
    }

    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool {
        has_capability_bit(model, actor, self.id())
    }

    fn can_apply(&self, model: &GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_initiate(model, actor) {
            return false;
        }
        let Some(target_id) = target.asset else {
            return false;
        };
        let (Some(actor_asset), Some(shelter)) = (model.asset(actor), model.asset(target_id))
        else {
            return false;
        };
        if shelter.color != actor_asset.color || !shelter.alive() {
            return false;
        }
        let capacity = model.types(shelter.color).get(shelter.kind).shelter_capacity;
        capacity > 0 && shelter.sheltered.len() < capacity
    }

    fn apply(&self, model: &mut GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_apply(model, actor, target) {
            return false;
        }
        let Some(target_id) = target.asset else {
            return false;
        };
        replace_with_activation(
            model,
            actor,
            self.id(),
            Some(target_id),
            ActivatedCapability::Shelter(ShelterActivation {
                capability: self.id(),
                actor,
                target: target_id,
            }),
        );
        model.post_acknowledge(actor);
        true
    }
}

/// One-shot garrison activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelterActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The unit taking shelter.
    pub actor: AssetId,
    /// The shelter.
    pub target: AssetId,
}

impl ShelterActivation {
    /// Replace this activation with Shelter under Walk.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        let valid = model.asset(self.target).map_or(false, |t| t.alive());
        if !valid {
            return true;
        }
        if let Some(asset) = model.asset_mut(self.actor) {
            asset.push_command(AssetCommand::with_target(AssetAction::Shelter, self.target));
            asset.push_command(AssetCommand::with_target(AssetAction::Walk, self.target));
        }
        true
    }
}

// ============================================================================
// Cancel
// ============================================================================

/// Cancel the actor's current activity. Polymorphic over the actor's
/// state: clears a shelter, forwards to the active activation (including a
/// building's construction when invoked on its builder), or just pops.
pub struct CancelCapability;

impl Capability for CancelCapability {
    fn id(&self) -> CapabilityId {
        CapabilityId::Cancel
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::None
    }

    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool {
        has_capability_bit(model, actor, self.id())
    }

    fn can_apply(&self, model: &GameModel, actor: AssetId, _target: &Target) -> bool {
        self.can_initiate(model, actor)
    }

    fn apply(&self, model: &mut GameModel, actor: AssetId, target: &Target) -> bool {
        if !self.can_apply(model, actor, target) {
            return false;
        }
        // Cancel stacks on top of the activity it is cancelling.
        if let Some(asset) = model.asset_mut(actor) {
            asset.push_command(AssetCommand {
                action: AssetAction::Capability,
                capability: Some(self.id()),
                target: None,
                activated: Some(ActivatedCapability::Cancel(CancelActivation {
                    capability: self.id(),
                    actor,
                })),
            });
        }
        true
    }
}

/// One-shot cancel activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The asset whose activity is cancelled.
    pub actor: AssetId,
}

impl CancelActivation {
    /// Dispatch on the actor's now-current command.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        // A shelter with passengers empties instead of cancelling work.
        let has_passengers = model
            .asset(self.actor)
            .map_or(false, |asset| !asset.sheltered.is_empty());
        if has_passengers {
            model.evict_sheltered(self.actor);
            return true;
        }

        enum Forward {
            Nothing,
            Activated,
            Construction(AssetId),
            Pop,
        }

        let forward = match model.asset(self.actor).and_then(|asset| asset.current_command()) {
            None => Forward::Nothing,
            Some(command) => {
                if command.activated.is_some() {
                    Forward::Activated
                } else if command.action == AssetAction::Build {
                    command
                        .target
                        .map_or(Forward::Pop, Forward::Construction)
                } else {
                    Forward::Pop
                }
            }
        };

        match forward {
            Forward::Nothing => {}
            Forward::Activated => {
                let taken = model
                    .asset_mut(self.actor)
                    .and_then(|asset| asset.current_command_mut())
                    .and_then(|command| command.activated.take());
                if let Some(mut activated) = taken {
                    activated.cancel(model);
                }
                if let Some(asset) = model.asset_mut(self.actor) {
                    asset.pop_command();
                }
            }
            Forward::Construction(building) => {
                // The construct activation pops the builder's command.
                model.cancel_construction(building);
            }
            Forward::Pop => {
                if let Some(asset) = model.asset_mut(self.actor) {
                    asset.pop_command();
                }
            }
        }
        true
    }
}
