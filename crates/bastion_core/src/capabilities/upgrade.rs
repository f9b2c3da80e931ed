//! Research and building-upgrade capabilities.
//!
//! Both families operate on the per-player asset *type*, not on individual
//! assets: applying one removes its capability bit from the researching
//! type so it cannot be started twice, completion applies the effect to
//! the type, and cancellation restores the bit and refunds the cost.

use serde::{Deserialize, Serialize};

use crate::activated::ActivatedCapability;
use crate::asset::{AssetAction, AssetCommand, AssetId};
use crate::asset_type::{AssetTypeKind, PlayerColor, ResourceCost, UPDATE_FREQUENCY};
use crate::capabilities::build::interpolate_hit_points;
use crate::capability::{Capability, CapabilityId, CapabilityRegistry, Target, TargetKind};
use crate::events::EventKind;
use crate::game::GameModel;

/// Register the research and building-upgrade singletons.
pub fn register(registry: &mut CapabilityRegistry) {
    for id in RESEARCH_IDS {
        let _ = registry.register(Box::new(UnitUpgradeCapability { id }));
    }
    let buildings = [
        (
            CapabilityId::BuildKeep,
            AssetTypeKind::TownHall,
            AssetTypeKind::Keep,
        ),
        (
            CapabilityId::BuildCastle,
            AssetTypeKind::Keep,
            AssetTypeKind::Castle,
        ),
        (
            CapabilityId::BuildGuardTower,
            AssetTypeKind::ScoutTower,
            AssetTypeKind::GuardTower,
        ),
        (
            CapabilityId::BuildCannonTower,
            AssetTypeKind::ScoutTower,
            AssetTypeKind::CannonTower,
        ),
    ];
    for (id, from, to) in buildings {
        let _ = registry.register(Box::new(BuildingUpgradeCapability { id, from, to }));
    }
}

const RESEARCH_IDS: [CapabilityId; 12] = [
    CapabilityId::WeaponUpgrade1,
    CapabilityId::WeaponUpgrade2,
    CapabilityId::WeaponUpgrade3,
    CapabilityId::ArmorUpgrade1,
    CapabilityId::ArmorUpgrade2,
    CapabilityId::ArmorUpgrade3,
    CapabilityId::ArrowUpgrade1,
    CapabilityId::ArrowUpgrade2,
    CapabilityId::ArrowUpgrade3,
    CapabilityId::Longbow,
    CapabilityId::RangerScouting,
    CapabilityId::Marksmanship,
];

/// Stat changes a completed research applies to each affected type.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatDeltas {
    /// Armor change.
    pub armor: i32,
    /// Sight change.
    pub sight: i32,
    /// Speed change.
    pub speed: i32,
    /// Basic damage change.
    pub basic_damage: i32,
    /// Piercing damage change.
    pub piercing_damage: i32,
    /// Range change.
    pub range: i32,
}

/// Data sheet for one research capability.
#[derive(Debug, Clone)]
pub struct ResearchSpec {
    /// Price of the research.
    pub cost: ResourceCost,
    /// Research time in seconds of game time.
    pub research_time: i32,
    /// Earlier tier that must be completed first.
    pub prerequisite: Option<CapabilityId>,
    /// Types receiving the stat deltas.
    pub affected: &'static [AssetTypeKind],
    /// The stat changes.
    pub deltas: StatDeltas,
}

/// The data sheet for a research id; `None` for non-research ids.
#[must_use]
pub fn research_spec(id: CapabilityId) -> Option<ResearchSpec> {
    use AssetTypeKind as K;
    use CapabilityId as C;

    const MELEE: &[AssetTypeKind] = &[K::Footman];
    const INFANTRY: &[AssetTypeKind] = &[K::Peasant, K::Footman];
    const ARCHERS: &[AssetTypeKind] = &[K::Archer, K::Ranger];

    let spec = match id {
        C::WeaponUpgrade1 => ResearchSpec {
            cost: ResourceCost::new(800, 0, 0),
            research_time: 60,
            prerequisite: None,
            affected: MELEE,
            deltas: StatDeltas {
                basic_damage: 2,
                ..StatDeltas::default()
            },
        },
        C::WeaponUpgrade2 => ResearchSpec {
            cost: ResourceCost::new(2400, 0, 0),
            research_time: 75,
            prerequisite: Some(C::WeaponUpgrade1),
            affected: MELEE,
            deltas: StatDeltas {
                basic_damage: 2,
                ..StatDeltas::default()
            },
        },
        C::WeaponUpgrade3 => ResearchSpec {
            cost: ResourceCost::new(3000, 0, 0),
            research_time: 90,
            prerequisite: Some(C::WeaponUpgrade2),
            affected: MELEE,
            deltas: StatDeltas {
                basic_damage: 2,
                ..StatDeltas::default()
            },
        },
        C::ArmorUpgrade1 => ResearchSpec {
            cost: ResourceCost::new(300, 300, 0),
            research_time: 60,
            prerequisite: None,
            affected: INFANTRY,
            deltas: StatDeltas {
                armor: 2,
                ..StatDeltas::default()
            },
        },
        C::ArmorUpgrade2 => ResearchSpec {
            cost: ResourceCost::new(900, 500, 0),
            research_time: 75,
            prerequisite: Some(C::ArmorUpgrade1),
            affected: INFANTRY,
            deltas: StatDeltas {
                armor: 2,
                ..StatDeltas::default()
            },
        },
        C::ArmorUpgrade3 => ResearchSpec {
            cost: ResourceCost::new(1500, 900, 0),
            research_time: 90,
            prerequisite: Some(C::ArmorUpgrade2),
            affected: INFANTRY,
            deltas: StatDeltas {
                armor: 2,
                ..StatDeltas::default()
            },
        },
        C::ArrowUpgrade1 => ResearchSpec {
            cost: ResourceCost::new(300, 300, 0),
            research_time: 60,
            prerequisite: None,
            affected: ARCHERS,
            deltas: StatDeltas {
                piercing_damage: 1,
                ..StatDeltas::default()
            },
        },
        C::ArrowUpgrade2 => ResearchSpec {
            cost: ResourceCost::new(900, 500, 0),
            research_time: 75,
            prerequisite: Some(C::ArrowUpgrade1),
            affected: ARCHERS,
            deltas: StatDeltas {
                piercing_damage: 1,
                ..StatDeltas::default()
            },
        },
        C::ArrowUpgrade3 => ResearchSpec {
            cost: ResourceCost::new(1500, 900, 0),
            research_time: 90,
            prerequisite: Some(C::ArrowUpgrade2),
            affected: ARCHERS,
            deltas: StatDeltas {
                piercing_damage: 1,
                ..StatDeltas::default()
            },
        },
        C::Longbow => ResearchSpec {
            cost: ResourceCost::new(2000, 0, 0),
            research_time: 60,
            prerequisite: None,
            affected: ARCHERS,
            deltas: StatDeltas {
                range: 1,
                ..StatDeltas::default()
            },
        },
        C::RangerScouting => ResearchSpec {
            cost: ResourceCost::new(1500, 0, 0),
            research_time: 60,
            prerequisite: None,
            affected: ARCHERS,
            deltas: StatDeltas {
                sight: 3,
                ..StatDeltas::default()
            },
        },
        C::Marksmanship => ResearchSpec {
            cost: ResourceCost::new(2500, 0, 0),
            research_time: 60,
            prerequisite: None,
            affected: ARCHERS,
            deltas: StatDeltas {
                piercing_damage: 3,
                ..StatDeltas::default()
            },
        },
        _ => return None,
    };
    Some(spec)
}

// ============================================================================
// Unit upgrades (research)
// ============================================================================

/// Research a stat upgrade at a building.
pub struct UnitUpgradeCapability {
    id: CapabilityId,
}

impl Capability for UnitUpgradeCapability {
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
        let Some(spec) = research_spec(self.id) else {
            return false;
        };
        let player = model.player(building.color);
        model
            .types(building.color)
            .get(building.kind)
            .has_capability(self.id)
            && player.can_afford(spec.cost)
            && spec
                .prerequisite
                .map_or(true, |earlier| player.has_upgrade(earlier))
    }

    fn unmet_requirements(&self, model: &GameModel, actor: AssetId) -> String {
        let Some(building) = model.asset(actor) else {
            return String::new();
        };
        let Some(spec) = research_spec(self.id) else {
            return String::new();
        };
        let player = model.player(building.color);
        let mut unmet = player.unmet_cost(spec.cost);
        if let Some(earlier) = spec.prerequisite {
            if !player.has_upgrade(earlier) {
                unmet.push_str(earlier.name());
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
        let Some((color, kind)) = model
            .asset(actor)
            .map(|building| (building.color, building.kind))
        else {
            return false;
        };
        let Some(spec) = research_spec(self.id) else {
            return false;
        };
        model.player_mut(color).spend(spec.cost);
        // No second start while this researches anywhere.
        model.types_mut(color).get_mut(kind).remove_capability(self.id);

        let total_steps = spec.research_time.max(1) as u32 * UPDATE_FREQUENCY;
        if let Some(building) = model.asset_mut(actor) {
            building.clear_commands();
            building.push_command(AssetCommand {
                action: AssetAction::Capability,
                capability: Some(self.id),
                target: None,
                activated: Some(ActivatedCapability::UnitUpgrade(UnitUpgradeActivation {
                    capability: self.id,
                    actor,
                    color,
                    host_kind: kind,
                    total_steps,
                    step: 0,
                    cost: spec.cost,
                    refunded: false,
                })),
            });
        }
        model.post_acknowledge(actor);
        true
    }
}

/// Multi-tick research state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitUpgradeActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The researching building.
    pub actor: AssetId,
    /// The researching player.
    pub color: PlayerColor,
    /// The building type whose capability bit was degraded.
    pub host_kind: AssetTypeKind,
    /// Ticks to completion.
    pub total_steps: u32,
    /// Ticks elapsed.
    pub step: u32,
    /// Resources committed at apply time.
    pub cost: ResourceCost,
    /// Guard against double refunds.
    pub refunded: bool,
}

impl UnitUpgradeActivation {
    /// Advance research one tick.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        self.step += 1;
        if self.step < self.total_steps {
            return false;
        }

        model.player_mut(self.color).mark_upgrade(self.capability);
        if let Some(spec) = research_spec(self.capability) {
            let types = model.types_mut(self.color);
            for &kind in spec.affected {
                let ty = types.get_mut(kind);
                ty.armor += spec.deltas.armor;
                ty.sight += spec.deltas.sight;
                ty.speed += spec.deltas.speed;
                ty.basic_damage += spec.deltas.basic_damage;
                ty.piercing_damage += spec.deltas.piercing_damage;
                ty.range += spec.deltas.range;
            }
        }
        model.post_event(self.actor, EventKind::WorkComplete);
        true
    }

    /// Refund and restore the degraded capability bit. Safe to call twice.
    pub fn cancel(&mut self, model: &mut GameModel) {
        if self.refunded {
            return;
        }
        self.refunded = true;
        model.player_mut(self.color).refund(self.cost);
        model
            .types_mut(self.color)
            .get_mut(self.host_kind)
            .add_capability(self.capability);
    }
}

// ============================================================================
// Building upgrades
// ============================================================================

/// Transform a building into its upgraded kind.
pub struct BuildingUpgradeCapability {
    id: CapabilityId,
    from: AssetTypeKind,
    to: AssetTypeKind,
}

impl Capability for BuildingUpgradeCapability {
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
        if building.kind != self.from {
            return false;
        }
        let types = model.types(building.color);
        types.get(building.kind).has_capability(self.id)
            && model.player(building.color).can_afford(types.get(self.to).cost)
            && model.requirements_met(building.color, self.to)
    }

    fn unmet_requirements(&self, model: &GameModel, actor: AssetId) -> String {
        let Some(building) = model.asset(actor) else {
            return String::new();
        };
        let upgrade_type = model.types(building.color).get(self.to);
        let mut unmet = model.player(building.color).unmet_cost(upgrade_type.cost);
        for requirement in &upgrade_type.requirements {
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
        let Some((color, hit_points)) = model
            .asset(actor)
            .map(|building| (building.color, building.hit_points))
        else {
            return false;
        };
        let upgrade_type = model.types(color).get(self.to).clone();
        model.player_mut(color).spend(upgrade_type.cost);
        model.types_mut(color).get_mut(self.from).remove_capability(self.id);

        let total_steps = upgrade_type.build_time.max(1) as u32 * UPDATE_FREQUENCY;
        if let Some(building) = model.asset_mut(actor) {
            building.clear_commands();
            building.push_command(AssetCommand {
                action: AssetAction::Capability,
                capability: Some(self.id),
                target: None,
                activated: Some(ActivatedCapability::BuildingUpgrade(
                    BuildingUpgradeActivation {
                        capability: self.id,
                        actor,
                        color,
                        original_kind: self.from,
                        upgrade_kind: self.to,
                        original_hit_points: hit_points,
                        total_steps,
                        step: 0,
                        cost: upgrade_type.cost,
                        refunded: false,
                    },
                )),
            });
        }
        model.post_acknowledge(actor);
        true
    }
}

/// Multi-tick building transformation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingUpgradeActivation {
    /// Originating capability.
    pub capability: CapabilityId,
    /// The upgrading building.
    pub actor: AssetId,
    /// The owning player.
    pub color: PlayerColor,
    /// Kind before the upgrade.
    pub original_kind: AssetTypeKind,
    /// Kind after the upgrade.
    pub upgrade_kind: AssetTypeKind,
    /// Hit points to restore on cancellation.
    pub original_hit_points: i32,
    /// Ticks to completion.
    pub total_steps: u32,
    /// Ticks elapsed.
    pub step: u32,
    /// Resources committed at apply time.
    pub cost: ResourceCost,
    /// Guard against double refunds.
    pub refunded: bool,
}

impl BuildingUpgradeActivation {
    /// Advance the upgrade one tick, interpolating toward the upgraded
    /// type's maximum hit points.
    pub fn increment_step(&mut self, model: &mut GameModel) -> bool {
        self.step += 1;
        let max_hp = model
            .types(self.color)
            .get(self.upgrade_kind)
            .hit_points;
        let hp = interpolate_hit_points(max_hp, self.step, self.total_steps);
        if let Some(building) = model.asset_mut(self.actor) {
            building.hit_points = hp;
        }

        if self.step < self.total_steps {
            return false;
        }

        // Other buildings of the original kind may upgrade again.
        model
            .types_mut(self.color)
            .get_mut(self.original_kind)
            .add_capability(self.capability);
        model.change_asset_kind(self.actor, self.upgrade_kind);
        if let Some(building) = model.asset_mut(self.actor) {
            building.hit_points = max_hp;
        }
        model.post_event(self.actor, EventKind::WorkComplete);
        true
    }

    /// Refund, restore the capability bit and the pre-upgrade hit points.
    /// Safe to call twice.
    pub fn cancel(&mut self, model: &mut GameModel) {
        if self.refunded {
            return;
        }
        self.refunded = true;
        model.player_mut(self.color).refund(self.cost);
        model
            .types_mut(self.color)
            .get_mut(self.original_kind)
            .add_capability(self.capability);
        if let Some(building) = model.asset_mut(self.actor) {
            building.hit_points = self.original_hit_points;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_research_id_has_a_spec() {
        for id in RESEARCH_IDS {
            assert!(research_spec(id).is_some(), "{} missing", id.name());
        }
        assert!(research_spec(CapabilityId::Move).is_none());
    }

    #[test]
    fn test_tiers_chain() {
        let tier2 = research_spec(CapabilityId::WeaponUpgrade2).unwrap();
        assert_eq!(tier2.prerequisite, Some(CapabilityId::WeaponUpgrade1));
        let tier3 = research_spec(CapabilityId::ArrowUpgrade3).unwrap();
        assert_eq!(tier3.prerequisite, Some(CapabilityId::ArrowUpgrade2));
    }
}
