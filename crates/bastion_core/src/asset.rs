//! Assets and the arena that owns them.
//!
//! Every unit, building, resource node, and transient marker is an
//! [`Asset`] stored in the [`AssetArena`] under a stable integer id. All
//! references elsewhere - player asset lists, command targets, capability
//! actors - are id lookups into the arena, so deleting an asset is simply
//! removing its slot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::activated::ActivatedCapability;
use crate::asset_type::{AssetTypeKind, PlayerColor, ResourceKind};
use crate::capability::CapabilityId;
use crate::position::{Direction, PixelPosition, TilePosition};

/// Unique identifier for assets.
pub type AssetId = u64;

/// The action tag driving per-tick dispatch for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AssetAction {
    /// Idle; the command stack is empty.
    #[default]
    None,
    /// Being built; the activated capability lives on this command.
    Construct,
    /// Builder waiting at a construction site.
    Build,
    /// Repairing a damaged building.
    Repair,
    /// Moving along a route.
    Walk,
    /// Holding position, engaging enemies in range.
    StandGround,
    /// Fighting a target.
    Attack,
    /// Chopping a forest tile.
    HarvestLumber,
    /// Quarrying a rock tile.
    QuarryStone,
    /// Mining inside a gold mine.
    MineGold,
    /// Carrying gold to a repository.
    ConveyGold,
    /// Carrying lumber to a repository.
    ConveyLumber,
    /// Carrying stone to a repository.
    ConveyStone,
    /// Garrisoning into a shelter.
    Shelter,
    /// Corpse delay before removal.
    Death,
    /// Corpse marker fading out.
    Decay,
    /// Deferred or in-flight capability.
    Capability,
}

/// One entry in an asset's command stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCommand {
    /// Action tag dispatched by the tick.
    pub action: AssetAction,
    /// Capability to resolve, for [`AssetAction::Capability`] commands.
    pub capability: Option<CapabilityId>,
    /// Target asset (real or transient marker).
    pub target: Option<AssetId>,
    /// In-flight capability state machine, at most one per entry.
    pub activated: Option<ActivatedCapability>,
}

impl AssetCommand {
    /// A bare command with just an action tag.
    #[must_use]
    pub const fn new(action: AssetAction) -> Self {
        Self {
            action,
            capability: None,
            target: None,
            activated: None,
        }
    }

    /// A command with an action and a target.
    #[must_use]
    pub const fn with_target(action: AssetAction, target: AssetId) -> Self {
        Self {
            action,
            capability: None,
            target: Some(target),
            activated: None,
        }
    }
}

/// A mutable game entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Stable arena id.
    pub id: AssetId,
    /// Owning player.
    pub color: PlayerColor,
    /// Type kind; stats live in the owner's type store.
    pub kind: AssetTypeKind,
    /// Pixel position; tile-aligned except mid-transit.
    pub position: PixelPosition,
    /// Facing direction.
    pub direction: Direction,
    /// Current hit points.
    pub hit_points: i32,
    /// Carried resource, if any. Gold, lumber and stone are mutually
    /// exclusive by construction.
    pub carried: Option<(ResourceKind, i32)>,
    /// Progress within the current action.
    pub step: u32,
    /// Command stack; the last element is the current command.
    commands: Vec<AssetCommand>,
    /// Units garrisoned inside this asset.
    pub sheltered: Vec<AssetId>,
    /// The shelter this asset is garrisoned in, if any.
    pub sheltered_in: Option<AssetId>,
    /// Damage payload for missile assets; zero otherwise.
    pub missile_damage: i32,
    /// Gold remaining inside a gold mine; zero otherwise.
    pub mine_gold: i32,
    /// Cycle this asset was created on.
    pub creation_cycle: u64,
}

impl Asset {
    /// Create an asset at a tile center. The id is assigned by the arena.
    #[must_use]
    pub fn new(color: PlayerColor, kind: AssetTypeKind, tile: TilePosition) -> Self {
        Self {
            id: 0,
            color,
            kind,
            position: tile.center(),
            direction: Direction::South,
            hit_points: 1,
            carried: None,
            step: 0,
            commands: Vec::new(),
            sheltered: Vec::new(),
            sheltered_in: None,
            missile_damage: 0,
            mine_gold: 0,
            creation_cycle: 0,
        }
    }

    /// The tile containing this asset's anchor position.
    #[must_use]
    pub fn tile_position(&self) -> TilePosition {
        self.position.tile()
    }

    /// Snap the asset onto a tile center.
    pub fn set_tile_position(&mut self, tile: TilePosition) {
        self.position = tile.center();
    }

    /// Whether the asset still has hit points.
    #[must_use]
    pub const fn alive(&self) -> bool {
        self.hit_points > 0
    }

    /// Action tag of the current command, or `None` when idle.
    #[must_use]
    pub fn action(&self) -> AssetAction {
        self.commands
            .last()
            .map_or(AssetAction::None, |command| command.action)
    }

    /// The currently executing command.
    #[must_use]
    pub fn current_command(&self) -> Option<&AssetCommand> {
        self.commands.last()
    }

    /// Mutable access to the currently executing command.
    pub fn current_command_mut(&mut self) -> Option<&mut AssetCommand> {
        self.commands.last_mut()
    }

    /// The command below the current one, consulted for interruption and
    /// continuation decisions.
    #[must_use]
    pub fn next_command(&self) -> Option<&AssetCommand> {
        let len = self.commands.len();
        if len >= 2 {
            self.commands.get(len - 2)
        } else {
            None
        }
    }

    /// Push a command onto the stack; it becomes current.
    pub fn push_command(&mut self, command: AssetCommand) {
        self.commands.push(command);
        self.step = 0;
    }

    /// Pop the current command.
    pub fn pop_command(&mut self) -> Option<AssetCommand> {
        let popped = self.commands.pop();
        self.step = 0;
        popped
    }

    /// Drop every queued command.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
        self.step = 0;
    }

    /// Number of stacked commands. Gold mines use this as their active
    /// miner count.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Whether any stacked command references `target`.
    #[must_use]
    pub fn references(&self, target: AssetId) -> bool {
        self.commands
            .iter()
            .any(|command| command.target == Some(target))
    }

    /// Targets of every stacked command, bottom to top.
    #[must_use]
    pub fn command_targets(&self) -> Vec<AssetId> {
        self.commands
            .iter()
            .filter_map(|command| command.target)
            .collect()
    }

    /// Remove every stacked command whose target is `target`.
    pub fn remove_commands_targeting(&mut self, target: AssetId) {
        self.commands.retain(|command| command.target != Some(target));
    }

    /// Whether this asset is a transient marker/missile/corpse candidate
    /// for pruning.
    #[must_use]
    pub fn is_stale_marker(&self) -> bool {
        self.kind == AssetTypeKind::None && self.action() == AssetAction::None
    }

    /// Amount of carried gold.
    #[must_use]
    pub fn gold(&self) -> i32 {
        match self.carried {
            Some((ResourceKind::Gold, amount)) => amount,
            _ => 0,
        }
    }

    /// Amount of carried lumber.
    #[must_use]
    pub fn lumber(&self) -> i32 {
        match self.carried {
            Some((ResourceKind::Lumber, amount)) => amount,
            _ => 0,
        }
    }

    /// Amount of carried stone.
    #[must_use]
    pub fn stone(&self) -> i32 {
        match self.carried {
            Some((ResourceKind::Stone, amount)) => amount,
            _ => 0,
        }
    }
}

/// Storage for all assets in the simulation.
///
/// Uses a `HashMap` for O(1) lookup by id, with deterministic iteration via
/// sorted keys when the tick processes assets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetArena {
    assets: HashMap<AssetId, Asset>,
    next_id: AssetId,
}

impl AssetArena {
    /// Create an empty arena. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert an asset, assigning the next id. Returns the id.
    pub fn insert(&mut self, mut asset: Asset) -> AssetId {
        let id = self.next_id;
        self.next_id += 1;
        asset.id = id;
        self.assets.insert(id, asset);
        id
    }

    /// Remove an asset by id.
    pub fn remove(&mut self, id: AssetId) -> Option<Asset> {
        self.assets.remove(&id)
    }

    /// Get an asset by id.
    #[must_use]
    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }

    /// Get a mutable reference to an asset by id.
    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut Asset> {
        self.assets.get_mut(&id)
    }

    /// Whether an asset exists.
    #[must_use]
    pub fn contains(&self, id: AssetId) -> bool {
        self.assets.contains_key(&id)
    }

    /// Number of assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Sorted asset ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<AssetId> {
        let mut ids: Vec<_> = self.assets.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all assets (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &Asset)> {
        self.assets.iter()
    }

    /// The id the next insert will take.
    #[must_use]
    pub const fn next_id(&self) -> AssetId {
        self.next_id
    }

    /// Rewind the id allocator so the next insert reuses `id`. Returns the
    /// previous counter; pass it to [`Self::restore_counter`] afterwards.
    ///
    /// Used only during save restoration so reconstructed assets keep their
    /// saved ids.
    pub fn rewind(&mut self, id: AssetId) -> AssetId {
        let previous = self.next_id;
        self.next_id = id;
        previous
    }

    /// Restore the id counter after a rewound insert, never moving it
    /// backwards.
    pub fn restore_counter(&mut self, previous: AssetId) {
        self.next_id = self.next_id.max(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peasant() -> Asset {
        Asset::new(
            PlayerColor::Blue,
            AssetTypeKind::Peasant,
            TilePosition::new(2, 3),
        )
    }

    #[test]
    fn test_action_tracks_stack_top() {
        let mut asset = peasant();
        assert_eq!(asset.action(), AssetAction::None);

        asset.push_command(AssetCommand::new(AssetAction::StandGround));
        asset.push_command(AssetCommand::new(AssetAction::Walk));
        assert_eq!(asset.action(), AssetAction::Walk);
        assert_eq!(
            asset.next_command().map(|command| command.action),
            Some(AssetAction::StandGround)
        );

        asset.pop_command();
        assert_eq!(asset.action(), AssetAction::StandGround);
        asset.pop_command();
        assert_eq!(asset.action(), AssetAction::None);
    }

    #[test]
    fn test_push_resets_step() {
        let mut asset = peasant();
        asset.step = 9;
        asset.push_command(AssetCommand::new(AssetAction::Walk));
        assert_eq!(asset.step, 0);
    }

    #[test]
    fn test_carried_accessors_are_exclusive() {
        let mut asset = peasant();
        asset.carried = Some((ResourceKind::Lumber, 100));
        assert_eq!(asset.lumber(), 100);
        assert_eq!(asset.gold(), 0);
        assert_eq!(asset.stone(), 0);
    }

    #[test]
    fn test_arena_assigns_sequential_ids() {
        let mut arena = AssetArena::new();
        let first = arena.insert(peasant());
        let second = arena.insert(peasant());
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(arena.sorted_ids(), vec![1, 2]);
    }

    #[test]
    fn test_arena_rewind_for_restore() {
        let mut arena = AssetArena::new();
        arena.insert(peasant());
        arena.insert(peasant());

        let previous = arena.rewind(7);
        let restored = arena.insert(peasant());
        arena.restore_counter(previous);

        assert_eq!(restored, 7);
        // Counter continues past both the rewound id and the old counter.
        let next = arena.insert(peasant());
        assert_eq!(next, 8);
    }

    #[test]
    fn test_stale_marker_detection() {
        let mut marker = Asset::new(
            PlayerColor::None,
            AssetTypeKind::None,
            TilePosition::new(0, 0),
        );
        assert!(marker.is_stale_marker());
        marker.push_command(AssetCommand::new(AssetAction::Decay));
        assert!(!marker.is_stale_marker());
    }
}
