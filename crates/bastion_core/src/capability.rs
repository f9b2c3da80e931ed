//! The capability registry and strategy trait.
//!
//! A capability is a named, globally registered rule-set for initiating and
//! applying a player action. One stateless singleton exists per
//! [`CapabilityId`]; per-invocation progress lives in
//! [`crate::activated::ActivatedCapability`].
//!
//! The registry is built once at process start and shared behind a
//! `OnceLock`, replacing the static self-registration idiom of older
//! engines. Lookup is by name at load time and by id at runtime.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::game::GameModel;
use crate::position::PixelPosition;

/// Identifier for every registered capability.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CapabilityId {
    /// Walk to a location.
    Move,
    /// Repair a damaged building.
    Repair,
    /// Gather gold, lumber or stone; branches on the target.
    Mine,
    /// Deliver carried resources to a repository.
    Convey,
    /// Walk back and forth between two points.
    Patrol,
    /// Hold position, engaging enemies in range.
    StandGround,
    /// Fight a target.
    Attack,
    /// Garrison into a shelter.
    Shelter,
    /// Cancel the current activity.
    Cancel,
    /// Place a wall segment.
    BuildWall,
    /// Construct a farm.
    BuildFarm,
    /// Construct a town hall.
    BuildTownHall,
    /// Construct a barracks.
    BuildBarracks,
    /// Construct a lumber mill.
    BuildLumberMill,
    /// Construct a blacksmith.
    BuildBlacksmith,
    /// Construct a scout tower.
    BuildScoutTower,
    /// Construct a neutral gold mine over a vein.
    BuildGoldMine,
    /// Train a peasant.
    TrainPeasant,
    /// Train a footman.
    TrainFootman,
    /// Train an archer.
    TrainArcher,
    /// Train a ranger.
    TrainRanger,
    /// Upgrade a town hall to a keep.
    BuildKeep,
    /// Upgrade a keep to a castle.
    BuildCastle,
    /// Upgrade a scout tower to a guard tower.
    BuildGuardTower,
    /// Upgrade a scout tower to a cannon tower.
    BuildCannonTower,
    /// Melee damage research, tier 1.
    WeaponUpgrade1,
    /// Melee damage research, tier 2.
    WeaponUpgrade2,
    /// Melee damage research, tier 3.
    WeaponUpgrade3,
    /// Armor research, tier 1.
    ArmorUpgrade1,
    /// Armor research, tier 2.
    ArmorUpgrade2,
    /// Armor research, tier 3.
    ArmorUpgrade3,
    /// Arrow damage research, tier 1.
    ArrowUpgrade1,
    /// Arrow damage research, tier 2.
    ArrowUpgrade2,
    /// Arrow damage research, tier 3.
    ArrowUpgrade3,
    /// Archery range research.
    Longbow,
    /// Ranger sight research; also enables forest concealment.
    RangerScouting,
    /// Archery damage research.
    Marksmanship,
}

impl CapabilityId {
    /// Every capability in registration order; the position is the numeric
    /// id used at runtime.
    pub const ALL: [Self; 37] = [
        Self::Move,
        Self::Repair,
        Self::Mine,
        Self::Convey,
        Self::Patrol,
        Self::StandGround,
        Self::Attack,
        Self::Shelter,
        Self::Cancel,
        Self::BuildWall,
        Self::BuildFarm,
        Self::BuildTownHall,
        Self::BuildBarracks,
        Self::BuildLumberMill,
        Self::BuildBlacksmith,
        Self::BuildScoutTower,
        Self::BuildGoldMine,
        Self::TrainPeasant,
        Self::TrainFootman,
        Self::TrainArcher,
        Self::TrainRanger,
        Self::BuildKeep,
        Self::BuildCastle,
        Self::BuildGuardTower,
        Self::BuildCannonTower,
        Self::WeaponUpgrade1,
        Self::WeaponUpgrade2,
        Self::WeaponUpgrade3,
        Self::ArmorUpgrade1,
        Self::ArmorUpgrade2,
        Self::ArmorUpgrade3,
        Self::ArrowUpgrade1,
        Self::ArrowUpgrade2,
        Self::ArrowUpgrade3,
        Self::Longbow,
        Self::RangerScouting,
        Self::Marksmanship,
    ];

    /// Registered name, also used in save records.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Move => "Move",
            Self::Repair => "Repair",
            Self::Mine => "Mine",
            Self::Convey => "Convey",
            Self::Patrol => "Patrol",
            Self::StandGround => "StandGround",
            Self::Attack => "Attack",
            Self::Shelter => "Shelter",
            Self::Cancel => "Cancel",
            Self::BuildWall => "BuildWall",
            Self::BuildFarm => "BuildFarm",
            Self::BuildTownHall => "BuildTownHall",
            Self::BuildBarracks => "BuildBarracks",
            Self::BuildLumberMill => "BuildLumberMill",
            Self::BuildBlacksmith => "BuildBlacksmith",
            Self::BuildScoutTower => "BuildScoutTower",
            Self::BuildGoldMine => "BuildGoldMine",
            Self::TrainPeasant => "TrainPeasant",
            Self::TrainFootman => "TrainFootman",
            Self::TrainArcher => "TrainArcher",
            Self::TrainRanger => "TrainRanger",
            Self::BuildKeep => "BuildKeep",
            Self::BuildCastle => "BuildCastle",
            Self::BuildGuardTower => "BuildGuardTower",
            Self::BuildCannonTower => "BuildCannonTower",
            Self::WeaponUpgrade1 => "WeaponUpgrade1",
            Self::WeaponUpgrade2 => "WeaponUpgrade2",
            Self::WeaponUpgrade3 => "WeaponUpgrade3",
            Self::ArmorUpgrade1 => "ArmorUpgrade1",
            Self::ArmorUpgrade2 => "ArmorUpgrade2",
            Self::ArmorUpgrade3 => "ArmorUpgrade3",
            Self::ArrowUpgrade1 => "ArrowUpgrade1",
            Self::ArrowUpgrade2 => "ArrowUpgrade2",
            Self::ArrowUpgrade3 => "ArrowUpgrade3",
            Self::Longbow => "Longbow",
            Self::RangerScouting => "RangerScouting",
            Self::Marksmanship => "Marksmanship",
        }
    }

    /// Parse a registered name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }
}

/// What a capability expects as its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    /// No target; the actor acts on itself.
    None,
    /// A map location.
    Terrain,
    /// Another asset.
    Asset,
    /// Either a location or an asset.
    TerrainOrAsset,
}

/// A capability request's target.
///
/// Terrain targets are wrapped into transient marker assets before they
/// reach a command stack, so by the time a capability is applied the asset
/// id is usually set and `location` mirrors that asset's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Target asset, when the capability acts on one.
    pub asset: Option<AssetId>,
    /// Target location in pixels.
    pub location: PixelPosition,
}

impl Target {
    /// A target referring to nothing (self-targeted capabilities).
    pub const NONE: Self = Self {
        asset: None,
        location: PixelPosition::new(0, 0),
    };

    /// Target an asset.
    #[must_use]
    pub const fn asset(id: AssetId, location: PixelPosition) -> Self {
        Self {
            asset: Some(id),
            location,
        }
    }

    /// Target a location.
    #[must_use]
    pub const fn terrain(location: PixelPosition) -> Self {
        Self {
            asset: None,
            location,
        }
    }
}

/// A registered, stateless capability strategy.
pub trait Capability: Send + Sync {
    /// This capability's id.
    fn id(&self) -> CapabilityId;

    /// Registered name.
    fn name(&self) -> &'static str {
        self.id().name()
    }

    /// What this capability targets.
    fn target_kind(&self) -> TargetKind;

    /// Pure predicate: could the actor start this capability right now?
    /// Used to light up UI affordances and gate automatic AI requests.
    fn can_initiate(&self, model: &GameModel, actor: AssetId) -> bool;

    /// Human-readable unmet-requirement list for UI annotation, in the
    /// `"Lumber:100 Gold:50"` style. Empty when nothing is missing.
    fn unmet_requirements(&self, model: &GameModel, actor: AssetId) -> String {
        let _ = (model, actor);
        String::new()
    }

    /// Predicate evaluated at activation time. Re-checked even after a
    /// successful `can_initiate` because state may have changed since -
    /// resources spent by another command, the target killed.
    fn can_apply(&self, model: &GameModel, actor: AssetId, target: &Target) -> bool;

    /// Side-effecting application: rewrites the actor's command stack with
    /// a capability command carrying a fresh activated capability. Returns
    /// `false` if rules forbid this exact transition.
    fn apply(&self, model: &mut GameModel, actor: AssetId, target: &Target) -> bool;
}

/// The global capability table.
pub struct CapabilityRegistry {
    by_name: HashMap<String, CapabilityId>,
    capabilities: BTreeMap<CapabilityId, Box<dyn Capability>>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            capabilities: BTreeMap::new(),
        }
    }

    /// Register a capability. Returns `false` and leaves the registry
    /// unchanged if one with the same name already exists.
    pub fn register(&mut self, capability: Box<dyn Capability>) -> bool {
        let name = capability.name().to_string();
        if self.by_name.contains_key(&name) {
            return false;
        }
        self.by_name.insert(name, capability.id());
        self.capabilities.insert(capability.id(), capability);
        true
    }

    /// Look up by id.
    #[must_use]
    pub fn find(&self, id: CapabilityId) -> Option<&dyn Capability> {
        self.capabilities.get(&id).map(Box::as_ref)
    }

    /// Look up by registered name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&dyn Capability> {
        self.by_name.get(name).and_then(|&id| self.find(id))
    }

    /// Number of registered capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Build the standard registry with every stock capability.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        crate::capabilities::register_standard(&mut registry);
        registry
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide registry, built on first use.
#[must_use]
pub fn registry() -> &'static CapabilityRegistry {
    static REGISTRY: OnceLock<CapabilityRegistry> = OnceLock::new();
    REGISTRY.get_or_init(CapabilityRegistry::standard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for id in CapabilityId::ALL {
            assert_eq!(CapabilityId::from_name(id.name()), Some(id));
        }
    }

    #[test]
    fn test_standard_registry_is_complete() {
        let registry = CapabilityRegistry::standard();
        assert_eq!(registry.len(), CapabilityId::ALL.len());
        for id in CapabilityId::ALL {
            let capability = registry.find(id).expect("registered");
            assert_eq!(capability.id(), id);
            assert!(registry.find_by_name(id.name()).is_some());
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = CapabilityRegistry::standard();
        let count = registry.len();
        // Re-registering any stock capability must fail by name.
        crate::capabilities::register_standard(&mut registry);
        assert_eq!(registry.len(), count);
    }
}
