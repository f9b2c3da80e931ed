//! Per-invocation capability state machines.
//!
//! Applying a capability creates one [`ActivatedCapability`] owned by a
//! single command-stack entry. The lifecycle is
//! `Created -> (increment_step)* -> Completed`, or `Cancelled` at any
//! point. `increment_step` returns `true` exactly on the completing tick;
//! the tick owns popping the actor's command on that transition.
//!
//! Basic capabilities complete on their first step by rewriting the
//! actor's stack into plain action commands. Build, train and upgrade
//! capabilities track multi-tick progress and interpolate hit points.

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::asset_type::ResourceCost;
use crate::capabilities::basic::{
    AttackActivation, CancelActivation, ConveyActivation, MineActivation, MoveActivation,
    PatrolActivation, RepairActivation, ShelterActivation, StandGroundActivation,
};
use crate::capabilities::build::ConstructActivation;
use crate::capabilities::train::TrainActivation;
use crate::capabilities::upgrade::{BuildingUpgradeActivation, UnitUpgradeActivation};
use crate::capability::CapabilityId;
use crate::game::GameModel;

/// The open set of in-flight capability state machines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActivatedCapability {
    /// One-shot walk order.
    Move(MoveActivation),
    /// One-shot gather order; branches on the target kind.
    Mine(MineActivation),
    /// One-shot delivery order.
    Convey(ConveyActivation),
    /// One-shot patrol leg.
    Patrol(PatrolActivation),
    /// One-shot hold-position order.
    StandGround(StandGroundActivation),
    /// One-shot repair order.
    Repair(RepairActivation),
    /// One-shot attack order.
    Attack(AttackActivation),
    /// One-shot garrison order.
    Shelter(ShelterActivation),
    /// One-shot cancel, polymorphic over the actor's state.
    Cancel(CancelActivation),
    /// Multi-tick building construction.
    Construct(ConstructActivation),
    /// Multi-tick unit training.
    Train(TrainActivation),
    /// Multi-tick stat research.
    UnitUpgrade(UnitUpgradeActivation),
    /// Multi-tick building transformation.
    BuildingUpgrade(BuildingUpgradeActivation),
}

impl ActivatedCapability {
    /// Advance one tick. Returns `true` exactly when the activity
    /// completes; the caller pops the actor's command on that transition.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        match self {
            Self::Move(activation) => activation.increment_step(model),
            Self::Mine(activation) => activation.increment_step(model),
            Self::Convey(activation) => activation.increment_step(model),
            Self::Patrol(activation) => activation.increment_step(model),
            Self::StandGround(activation) => activation.increment_step(model),
            Self::Repair(activation) => activation.increment_step(model),
            Self::Attack(activation) => activation.increment_step(model),
            Self::Shelter(activation) => activation.increment_step(model),
            Self::Cancel(activation) => activation.increment_step(model),
            Self::Construct(activation) => activation.increment_step(model),
            Self::Train(activation) => activation.increment_step(model),
            Self::UnitUpgrade(activation) => activation.increment_step(model),
            Self::BuildingUpgrade(activation) => activation.increment_step(model),
        }
    }

    /// Cancel the activity: refund exactly the committed resources, undo
    /// side effects, and release any counterpart commands. Safe against
    /// double cancellation.
    pub fn cancel(&mut self, model: &mut GameModel) {
        match self {
            Self::Construct(activation) => activation.cancel(model),
            Self::Train(activation) => activation.cancel(model),
            Self::UnitUpgrade(activation) => activation.cancel(model),
            Self::BuildingUpgrade(activation) => activation.cancel(model),
            // One-shot activations commit nothing.
            _ => {}
        }
    }

    /// Progress scaled to `max`, for UI progress bars. One-shot
    /// activations report zero.
    #[must_use]
    pub fn percent_complete(&self, max: u32) -> u32 {
        match self {
            Self::Construct(activation) => scaled(activation.step, activation.total_steps, max),
            Self::Train(activation) => scaled(activation.step, activation.total_steps, max),
            Self::UnitUpgrade(activation) => scaled(activation.step, activation.total_steps, max),
            Self::BuildingUpgrade(activation) => {
                scaled(activation.step, activation.total_steps, max)
            }
            _ => 0,
        }
    }

    /// The capability that created this activation.
    #[must_use]
    pub fn capability(&self) -> CapabilityId {
        match self {
            Self::Move(activation) => activation.capability,
            Self::Mine(activation) => activation.capability,
            Self::Convey(activation) => activation.capability,
            Self::Patrol(activation) => activation.capability,
            Self::StandGround(activation) => activation.capability,
            Self::Repair(activation) => activation.capability,
            Self::Attack(activation) => activation.capability,
            Self::Shelter(activation) => activation.capability,
            Self::Cancel(activation) => activation.capability,
            Self::Construct(activation) => activation.capability,
            Self::Train(activation) => activation.capability,
            Self::UnitUpgrade(activation) => activation.capability,
            Self::BuildingUpgrade(activation) => activation.capability,
        }
    }

    /// The acting asset.
    #[must_use]
    pub fn actor(&self) -> AssetId {
        match self {
            Self::Move(activation) => activation.actor,
            Self::Mine(activation) => activation.actor,
            Self::Convey(activation) => activation.actor,
            Self::Patrol(activation) => activation.actor,
            Self::StandGround(activation) => activation.actor,
            Self::Repair(activation) => activation.actor,
            Self::Attack(activation) => activation.actor,
            Self::Shelter(activation) => activation.actor,
            Self::Cancel(activation) => activation.actor,
            Self::Construct(activation) => activation.builder,
            Self::Train(activation) => activation.building,
            Self::UnitUpgrade(activation) => activation.actor,
            Self::BuildingUpgrade(activation) => activation.actor,
        }
    }

    /// The target asset, if the activation has one.
    #[must_use]
    pub fn target(&self) -> Option<AssetId> {
        match self {
            Self::Move(activation) => activation.target,
            Self::Mine(activation) => Some(activation.target),
            Self::Convey(activation) => Some(activation.target),
            Self::Patrol(activation) => Some(activation.target),
            Self::StandGround(_) | Self::Cancel(_) => None,
            Self::Repair(activation) => Some(activation.target),
            Self::Attack(activation) => Some(activation.target),
            Self::Shelter(activation) => Some(activation.target),
            Self::Construct(activation) => Some(activation.building),
            Self::Train(activation) => Some(activation.trainee),
            Self::UnitUpgrade(_) => None,
            Self::BuildingUpgrade(_) => None,
        }
    }

    /// Progress in ticks. One-shot activations report zero.
    #[must_use]
    pub fn step(&self) -> u32 {
        match self {
            Self::Construct(activation) => activation.step,
            Self::Train(activation) => activation.step,
            Self::UnitUpgrade(activation) => activation.step,
            Self::BuildingUpgrade(activation) => activation.step,
            _ => 0,
        }
    }

    /// Total ticks for completion. One-shot activations report one.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        match self {
            Self::Construct(activation) => activation.total_steps,
            Self::Train(activation) => activation.total_steps,
            Self::UnitUpgrade(activation) => activation.total_steps,
            Self::BuildingUpgrade(activation) => activation.total_steps,
            _ => 1,
        }
    }

    /// Resources committed at creation time; what cancel refunds.
    #[must_use]
    pub fn committed_cost(&self) -> ResourceCost {
        match self {
            Self::Construct(activation) => activation.cost,
            Self::Train(activation) => activation.cost,
            Self::UnitUpgrade(activation) => activation.cost,
            Self::BuildingUpgrade(activation) => activation.cost,
            _ => ResourceCost::FREE,
        }
    }

    /// Overwrite progress after a save-restore replay of `apply`, fixing
    /// up interpolated state such as construction hit points.
    pub fn restore_step(&mut self, step: u32, model: &mut GameModel) {
        match self {
            Self::Construct(activation) => activation.restore_step(step, model),
            Self::Train(activation) => activation.restore_step(step, model),
            Self::UnitUpgrade(activation) => activation.step = step.min(activation.total_steps),
            Self::BuildingUpgrade(activation) => {
                activation.step = step.min(activation.total_steps);
            }
            // One-shot activations have no persistent progress.
            _ => {}
        }
    }
}

fn scaled(step: u32, total: u32, max: u32) -> u32 {
    if total == 0 {
        max
    } else {
        step.saturating_mul(max) / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_scaling() {
        assert_eq!(scaled(0, 100, 100), 0);
        assert_eq!(scaled(50, 100, 100), 50);
        assert_eq!(scaled(100, 100, 100), 100);
        assert_eq!(scaled(1, 3, 100), 33);
        assert_eq!(scaled(3, 3, 100), 100);
        // Degenerate totals read as complete rather than dividing by zero.
        assert_eq!(scaled(0, 0, 100), 100);
    }
}
