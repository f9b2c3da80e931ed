//! Asset type definitions and the per-player type store.
//!
//! An [`AssetType`] is the stat block and capability set shared by every
//! asset of one kind owned by one player. Upgrades deliberately mutate the
//! *type*, not individual assets: researching an upgrade removes its
//! capability bit from the researching building's type so it cannot be
//! started twice, and completed upgrades apply stat deltas to every affected
//! type of that player.
//!
//! The standard stat tables live here as pure data; scenarios may override
//! individual entries from RON (file IO stays in the headless crate).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityId;

/// Player identity. `None` owns neutral assets such as gold mines.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum PlayerColor {
    /// The colorless neutral player.
    #[default]
    None,
    /// Blue player.
    Blue,
    /// Red player.
    Red,
    /// Green player.
    Green,
    /// Purple player.
    Purple,
    /// Orange player.
    Orange,
    /// Yellow player.
    Yellow,
    /// Black player.
    Black,
    /// White player.
    White,
}

impl PlayerColor {
    /// Every color including neutral, in index order.
    pub const ALL: [Self; 9] = [
        Self::None,
        Self::Blue,
        Self::Red,
        Self::Green,
        Self::Purple,
        Self::Orange,
        Self::Yellow,
        Self::Black,
        Self::White,
    ];

    /// Dense index for per-player arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::None => 0,
            Self::Blue => 1,
            Self::Red => 2,
            Self::Green => 3,
            Self::Purple => 4,
            Self::Orange => 5,
            Self::Yellow => 6,
            Self::Black => 7,
            Self::White => 8,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Blue => "Blue",
            Self::Red => "Red",
            Self::Green => "Green",
            Self::Purple => "Purple",
            Self::Orange => "Orange",
            Self::Yellow => "Yellow",
            Self::Black => "Black",
            Self::White => "White",
        }
    }

    /// Parse a display name back to a color.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// A carriable/spendable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Mined from gold mines.
    Gold,
    /// Harvested from forest tiles.
    Lumber,
    /// Quarried from rock tiles.
    Stone,
}

/// A gold/lumber/stone price tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceCost {
    /// Gold component.
    pub gold: i32,
    /// Lumber component.
    pub lumber: i32,
    /// Stone component.
    pub stone: i32,
}

impl ResourceCost {
    /// A free cost.
    pub const FREE: Self = Self {
        gold: 0,
        lumber: 0,
        stone: 0,
    };

    /// Create a cost.
    #[must_use]
    pub const fn new(gold: i32, lumber: i32, stone: i32) -> Self {
        Self {
            gold,
            lumber,
            stone,
        }
    }

    /// Whether every component is zero.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.gold == 0 && self.lumber == 0 && self.stone == 0
    }
}

/// Kind tag for every asset in the simulation.
///
/// `None` is the type of transient markers, missiles, and corpses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum AssetTypeKind {
    /// Transient marker/missile/corpse type.
    #[default]
    None,
    /// Worker unit.
    Peasant,
    /// Melee soldier.
    Footman,
    /// Ranged soldier.
    Archer,
    /// Upgraded ranged soldier.
    Ranger,
    /// Neutral gold source.
    GoldMine,
    /// Primary repository and peasant trainer.
    TownHall,
    /// Upgraded town hall.
    Keep,
    /// Final town hall upgrade.
    Castle,
    /// Food producer.
    Farm,
    /// Soldier trainer.
    Barracks,
    /// Lumber repository and archery research.
    LumberMill,
    /// Melee research building.
    Blacksmith,
    /// Basic tower, upgradeable.
    ScoutTower,
    /// Arrow tower.
    GuardTower,
    /// Cannon tower.
    CannonTower,
    /// Defensive wall segment.
    Wall,
}

impl AssetTypeKind {
    /// Every kind in declaration order.
    pub const ALL: [Self; 17] = [
        Self::None,
        Self::Peasant,
        Self::Footman,
        Self::Archer,
        Self::Ranger,
        Self::GoldMine,
        Self::TownHall,
        Self::Keep,
        Self::Castle,
        Self::Farm,
        Self::Barracks,
        Self::LumberMill,
        Self::Blacksmith,
        Self::ScoutTower,
        Self::GuardTower,
        Self::CannonTower,
        Self::Wall,
    ];

    /// Display name, also used in save records and scenario files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Peasant => "Peasant",
            Self::Footman => "Footman",
            Self::Archer => "Archer",
            Self::Ranger => "Ranger",
            Self::GoldMine => "GoldMine",
            Self::TownHall => "TownHall",
            Self::Keep => "Keep",
            Self::Castle => "Castle",
            Self::Farm => "Farm",
            Self::Barracks => "Barracks",
            Self::LumberMill => "LumberMill",
            Self::Blacksmith => "Blacksmith",
            Self::ScoutTower => "ScoutTower",
            Self::GuardTower => "GuardTower",
            Self::CannonTower => "CannonTower",
            Self::Wall => "Wall",
        }
    }

    /// Parse a display name back to a kind.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Whether assets of this kind accept conveyed gold.
    #[must_use]
    pub const fn accepts_gold(self) -> bool {
        matches!(self, Self::TownHall | Self::Keep | Self::Castle)
    }

    /// Whether assets of this kind accept conveyed lumber.
    #[must_use]
    pub const fn accepts_lumber(self) -> bool {
        matches!(
            self,
            Self::TownHall | Self::Keep | Self::Castle | Self::LumberMill
        )
    }

    /// Whether assets of this kind accept conveyed stone.
    #[must_use]
    pub const fn accepts_stone(self) -> bool {
        matches!(self, Self::TownHall | Self::Keep | Self::Castle)
    }
}

/// Stat block and capability set for one asset kind of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetType {
    /// Which kind this block describes.
    pub kind: AssetTypeKind,
    /// Maximum hit points.
    pub hit_points: i32,
    /// Flat damage reduction against basic damage.
    pub armor: i32,
    /// Sight radius in tiles.
    pub sight: i32,
    /// Sight radius while under construction.
    pub construction_sight: i32,
    /// Footprint edge length in tiles.
    pub size: i32,
    /// Movement speed; zero for immobile assets.
    pub speed: i32,
    /// Purchase cost.
    pub cost: ResourceCost,
    /// Food eaten by each living asset of this kind.
    pub food_consumption: i32,
    /// Food provided by each living asset of this kind.
    pub food_production: i32,
    /// Build/train time in seconds of game time.
    pub build_time: i32,
    /// Ticks of the attack animation before the blow lands.
    pub attack_steps: u32,
    /// Ticks of recovery after a blow.
    pub reload_steps: u32,
    /// Armor-reducible damage component.
    pub basic_damage: i32,
    /// Armor-ignoring damage component.
    pub piercing_damage: i32,
    /// Attack range in tiles; 1 is melee.
    pub range: i32,
    /// How many units this asset can shelter; zero for none.
    pub shelter_capacity: usize,
    /// Capabilities assets of this type can initiate.
    pub capabilities: BTreeSet<CapabilityId>,
    /// Building kinds the owner must have before acquiring this type.
    pub requirements: Vec<AssetTypeKind>,
}

impl AssetType {
    /// Whether this type carries the given capability bit.
    #[must_use]
    pub fn has_capability(&self, capability: CapabilityId) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Set a capability bit. Used when an upgrade is cancelled.
    pub fn add_capability(&mut self, capability: CapabilityId) {
        self.capabilities.insert(capability);
    }

    /// Clear a capability bit. Used while an upgrade is researching.
    pub fn remove_capability(&mut self, capability: CapabilityId) {
        self.capabilities.remove(&capability);
    }

    /// Whether this type can move.
    #[must_use]
    pub const fn is_mobile(&self) -> bool {
        self.speed > 0
    }

    /// Total ticks of one full attack cycle.
    #[must_use]
    pub const fn attack_cycle(&self) -> u32 {
        self.attack_steps + self.reload_steps
    }
}

/// Per-player mutable collection of asset types.
///
/// Every player gets their own copy of the standard table so that upgrades
/// researched by one player never leak to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTypeStore {
    types: BTreeMap<AssetTypeKind, AssetType>,
}

impl AssetTypeStore {
    /// Build the standard type table.
    #[must_use]
    pub fn standard() -> Self {
        let mut types = BTreeMap::new();
        for ty in standard_asset_types() {
            types.insert(ty.kind, ty);
        }
        Self { types }
    }

    /// Look up a type block.
    ///
    /// # Panics
    ///
    /// Panics if the kind is missing, which indicates a corrupted store -
    /// the standard table covers every [`AssetTypeKind`].
    #[must_use]
    pub fn get(&self, kind: AssetTypeKind) -> &AssetType {
        self.types
            .get(&kind)
            .unwrap_or_else(|| panic!("asset type store missing {}", kind.name()))
    }

    /// Mutable lookup for upgrade application.
    pub fn get_mut(&mut self, kind: AssetTypeKind) -> &mut AssetType {
        self.types
            .get_mut(&kind)
            .unwrap_or_else(|| panic!("asset type store missing {}", kind.name()))
    }

    /// Replace one type block (scenario overrides).
    pub fn insert(&mut self, ty: AssetType) {
        self.types.insert(ty.kind, ty);
    }

    /// Iterate blocks in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetType> {
        self.types.values()
    }
}

impl Default for AssetTypeStore {
    fn default() -> Self {
        Self::standard()
    }
}

/// Ticks per second of game time.
pub const UPDATE_FREQUENCY: u32 = 20;

/// The standard stat tables.
///
/// Numbers are game data, not invariants; scenarios may override them. The
/// capability sets, however, encode which orders each kind can take and the
/// tests rely on them.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn standard_asset_types() -> Vec<AssetType> {
    use AssetTypeKind as K;
    use CapabilityId as C;

    let unit_caps = |extra: &[C]| -> BTreeSet<C> {
        let mut caps: BTreeSet<C> =
            [C::Move, C::Attack, C::StandGround, C::Patrol, C::Cancel].into();
        caps.extend(extra.iter().copied());
        caps
    };

    vec![
        // Transient markers, missiles and corpses. Speed is the missile
        // travel speed.
        AssetType {
            kind: K::None,
            hit_points: 1,
            armor: 0,
            sight: 0,
            construction_sight: 0,
            size: 1,
            speed: 40,
            cost: ResourceCost::FREE,
            food_consumption: 0,
            food_production: 0,
            build_time: 0,
            attack_steps: 0,
            reload_steps: 0,
            basic_damage: 0,
            piercing_damage: 0,
            range: 0,
            shelter_capacity: 0,
            capabilities: BTreeSet::new(),
            requirements: Vec::new(),
        },
        AssetType {
            kind: K::Peasant,
            hit_points: 30,
            armor: 0,
            sight: 4,
            construction_sight: 2,
            size: 1,
            speed: 10,
            cost: ResourceCost::new(400, 0, 0),
            food_consumption: 1,
            food_production: 0,
            build_time: 45,
            attack_steps: 12,
            reload_steps: 4,
            basic_damage: 6,
            piercing_damage: 0,
            range: 1,
            shelter_capacity: 0,
            // Only peasants take shelter; soldiers fight in the open.
            capabilities: unit_caps(&[
                C::Repair,
                C::Mine,
                C::Convey,
                C::Shelter,
                C::BuildFarm,
                C::BuildTownHall,
                C::BuildBarracks,
                C::BuildLumberMill,
                C::BuildBlacksmith,
                C::BuildScoutTower,
                C::BuildGoldMine,
                C::BuildWall,
            ]),
            requirements: Vec::new(),
        },
        AssetType {
            kind: K::Footman,
            hit_points: 60,
            armor: 2,
            sight: 4,
            construction_sight: 1,
            size: 1,
            speed: 10,
            cost: ResourceCost::new(600, 0, 0),
            food_consumption: 1,
            food_production: 0,
            build_time: 60,
            attack_steps: 12,
            reload_steps: 6,
            basic_damage: 6,
            piercing_damage: 3,
            range: 1,
            shelter_capacity: 0,
            capabilities: unit_caps(&[]),
            requirements: Vec::new(),
        },
        AssetType {
            kind: K::Archer,
            hit_points: 40,
            armor: 0,
            sight: 5,
            construction_sight: 1,
            size: 1,
            speed: 10,
            cost: ResourceCost::new(500, 50, 0),
            food_consumption: 1,
            food_production: 0,
            build_time: 70,
            attack_steps: 10,
            reload_steps: 8,
            basic_damage: 3,
            piercing_damage: 6,
            range: 4,
            shelter_capacity: 0,
            capabilities: unit_caps(&[]),
            requirements: vec![K::LumberMill],
        },
        AssetType {
            kind: K::Ranger,
            hit_points: 50,
            armor: 0,
            sight: 6,
            construction_sight: 1,
            size: 1,
            speed: 11,
            cost: ResourceCost::new(500, 100, 0),
            food_consumption: 1,
            food_production: 0,
            build_time: 70,
            attack_steps: 10,
            reload_steps: 8,
            basic_damage: 3,
            piercing_damage: 7,
            range: 4,
            shelter_capacity: 0,
            capabilities: unit_caps(&[]),
            requirements: vec![K::LumberMill],
        },
        AssetType {
            kind: K::GoldMine,
            hit_points: 25500,
            armor: 20,
            sight: 0,
            construction_sight: 0,
            size: 4,
            speed: 0,
            cost: ResourceCost::new(0, 600, 400),
            food_consumption: 0,
            food_production: 0,
            build_time: 75,
            attack_steps: 0,
            reload_steps: 0,
            basic_damage: 0,
            piercing_damage: 0,
            range: 0,
            shelter_capacity: 0,
            capabilities: BTreeSet::new(),
            requirements: Vec::new(),
        },
        AssetType {
            kind: K::TownHall,
            hit_points: 1200,
            armor: 20,
            sight: 4,
            construction_sight: 2,
            size: 4,
            speed: 0,
            cost: ResourceCost::new(1200, 800, 150),
            food_consumption: 0,
            food_production: 1,
            build_time: 120,
            attack_steps: 0,
            reload_steps: 0,
            basic_damage: 0,
            piercing_damage: 0,
            range: 0,
            shelter_capacity: 0,
            capabilities: [C::TrainPeasant, C::BuildKeep, C::Cancel].into(),
            requirements: Vec::new(),
        },
        AssetType {
            kind: K::Keep,
            hit_points: 1400,
            armor: 20,
            sight: 6,
            construction_sight: 2,
            size: 4,
            speed: 0,
            cost: ResourceCost::new(2000, 1000, 200),
            food_consumption: 0,
            food_production: 1,
            build_time: 90,
            attack_steps: 0,
            reload_steps: 0,
            basic_damage: 0,
            piercing_damage: 0,
            range: 0,
            shelter_capacity: 0,
            capabilities: [C::TrainPeasant, C::BuildCastle, C::Cancel].into(),
            requirements: vec![K::Barracks],
        },
        AssetType {
            kind: K::Castle,
            hit_points: 1600,
            armor: 20,
            sight: 9,
            construction_sight: 2,
            size: 4,
            speed: 0,
            cost: ResourceCost::new(2500, 1200, 300),
            food_consumption: 0,
            food_production: 1,
            build_time: 90,
            attack_steps: 0,
            reload_steps: 0,
            basic_damage: 0,
            piercing_damage: 0,
            range: 0,
            shelter_capacity: 0,
            capabilities: [C::TrainPeasant, C::Cancel].into(),
            requirements: vec![K::Blacksmith],
        },
        AssetType {
            kind: K::Farm,
            hit_points: 400,
            armor: 20,
            sight: 3,
            construction_sight: 2,
            size: 2,
            speed: 0,
            cost: ResourceCost::new(0, 250, 0),
            food_consumption: 0,
            food_production: 4,
            build_time: 45,
            attack_steps: 0,
            reload_steps: 0,
            basic_damage: 0,
            piercing_damage: 0,
            range: 0,
            shelter_capacity: 0,
            capabilities: BTreeSet::new(),
            requirements: Vec::new(),
        },
        AssetType {
            kind: K::Barracks,
            hit_points: 800,
            armor: 20,
            sight: 3,
            construction_sight: 2,
            size: 3,
            speed: 0,
            cost: ResourceCost::new(700, 450, 0),
            food_consumption: 0,
            food_production: 0,
            build_time: 60,
            attack_steps: 0,
            reload_steps: 0,
            basic_damage: 0,
            piercing_damage: 0,
            range: 0,
            shelter_capacity: 0,
            capabilities: [
                C::TrainFootman,
                C::TrainArcher,
                C::TrainRanger,
                C::Cancel,
            ]
            .into(),
            requirements: vec![K::TownHall],
        },
        AssetType {
            kind: K::LumberMill,
            hit_points: 600,
            armor: 20,
            sight: 3,
            construction_sight: 2,
            size: 3,
            speed: 0,
            cost: ResourceCost::new(600, 450, 0),
            food_consumption: 0,
            food_production: 0,
            build_time: 60,
            attack_steps: 0,
            reload_steps: 0,
            basic_damage: 0,
            piercing_damage: 0,
            range: 0,
            shelter_capacity: 0,
            capabilities: [
                C::ArrowUpgrade1,
                C::ArrowUpgrade2,
                C::ArrowUpgrade3,
                C::Longbow,
                C::RangerScouting,
                C::Marksmanship,
                C::Cancel,
            ]
            .into(),
            requirements: vec![K::TownHall],
        },
        AssetType {
            kind: K::Blacksmith,
            hit_points: 775,
            armor: 20,
            sight: 3,
            construction_sight: 2,
            size: 3,
            speed: 0,
            cost: ResourceCost::new(800, 450, 100),
            food_consumption: 0,
            food_production: 0,
            build_time: 60,
            attack_steps: 0,
            reload_steps: 0,
            basic_damage: 0,
            piercing_damage: 0,
            range: 0,
            shelter_capacity: 0,
            capabilities: [
                C::WeaponUpgrade1,
                C::WeaponUpgrade2,
                C::WeaponUpgrade3,
                C::ArmorUpgrade1,
                C::ArmorUpgrade2,
                C::ArmorUpgrade3,
                C::Cancel,
            ]
            .into(),
            requirements: vec![K::Barracks],
        },
        AssetType {
            kind: K::ScoutTower,
            hit_points: 100,
            armor: 20,
            sight: 9,
            construction_sight: 2,
            size: 2,
            speed: 0,
            cost: ResourceCost::new(550, 200, 0),
            food_consumption: 0,
            food_production: 0,
            build_time: 55,
            attack_steps: 0,
            reload_steps: 0,
            basic_damage: 0,
            piercing_damage: 0,
            range: 0,
            shelter_capacity: 4,
            capabilities: [C::BuildGuardTower, C::BuildCannonTower, C::Cancel].into(),
            requirements: vec![K::TownHall],
        },
        AssetType {
            kind: K::GuardTower,
            hit_points: 130,
            armor: 20,
            sight: 9,
            construction_sight: 2,
            size: 2,
            speed: 0,
            cost: ResourceCost::new(500, 150, 0),
            food_consumption: 0,
            food_production: 0,
            build_time: 55,
            attack_steps: 10,
            reload_steps: 20,
            basic_damage: 4,
            piercing_damage: 12,
            range: 6,
            shelter_capacity: 4,
            capabilities: [C::Attack, C::StandGround, C::Cancel].into(),
            requirements: vec![K::LumberMill],
        },
        AssetType {
            kind: K::CannonTower,
            hit_points: 160,
            armor: 20,
            sight: 9,
            construction_sight: 2,
            size: 2,
            speed: 0,
            cost: ResourceCost::new(1000, 300, 100),
            food_consumption: 0,
            food_production: 0,
            build_time: 55,
            attack_steps: 10,
            reload_steps: 40,
            basic_damage: 50,
            piercing_damage: 0,
            range: 7,
            shelter_capacity: 4,
            capabilities: [C::Attack, C::StandGround, C::Cancel].into(),
            requirements: vec![K::Blacksmith],
        },
        AssetType {
            kind: K::Wall,
            hit_points: 40,
            armor: 20,
            sight: 0,
            construction_sight: 1,
            size: 1,
            speed: 0,
            cost: ResourceCost::new(0, 0, 100),
            food_consumption: 0,
            food_production: 0,
            build_time: 25,
            attack_steps: 0,
            reload_steps: 0,
            basic_damage: 0,
            piercing_damage: 0,
            range: 0,
            shelter_capacity: 0,
            capabilities: BTreeSet::new(),
            requirements: Vec::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_store_covers_every_kind() {
        let store = AssetTypeStore::standard();
        for kind in AssetTypeKind::ALL {
            assert_eq!(store.get(kind).kind, kind);
        }
    }

    #[test]
    fn test_capability_bit_round_trip() {
        let mut store = AssetTypeStore::standard();
        let blacksmith = store.get_mut(AssetTypeKind::Blacksmith);
        assert!(blacksmith.has_capability(CapabilityId::WeaponUpgrade1));
        blacksmith.remove_capability(CapabilityId::WeaponUpgrade1);
        assert!(!blacksmith.has_capability(CapabilityId::WeaponUpgrade1));
        blacksmith.add_capability(CapabilityId::WeaponUpgrade1);
        assert!(blacksmith.has_capability(CapabilityId::WeaponUpgrade1));
    }

    #[test]
    fn test_kind_name_round_trip() {
        for kind in AssetTypeKind::ALL {
            assert_eq!(AssetTypeKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_repositories() {
        assert!(AssetTypeKind::TownHall.accepts_gold());
        assert!(AssetTypeKind::LumberMill.accepts_lumber());
        assert!(!AssetTypeKind::LumberMill.accepts_gold());
        assert!(!AssetTypeKind::Barracks.accepts_stone());
    }
}
