//! Per-player economy, ownership and event state.
//!
//! `PlayerData` is a ledger, not an owner: the asset list holds ids whose
//! canonical home is the arena. All resource mutation funnels through the
//! increment/decrement methods so refunds stay exact.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::asset_type::{PlayerColor, ResourceCost};
use crate::capability::CapabilityId;
use crate::events::GameEvent;

/// Per-color player state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    /// This player's color.
    pub color: PlayerColor,
    gold: i32,
    lumber: i32,
    stone: i32,
    /// Food eaten by living assets.
    pub food_consumption: i32,
    /// Food provided by living assets.
    pub food_production: i32,
    /// Ids of owned assets. Non-owning; pruned as assets die.
    pub asset_ids: Vec<AssetId>,
    /// Upgrades this player has completed.
    upgrades: BTreeSet<CapabilityId>,
    /// Pending game events for this player's consumers.
    game_events: Vec<GameEvent>,
    /// Ticks accumulated toward the next healing pulse.
    pub heal_timer: u32,
    /// Units this player has lost.
    pub units_lost: u32,
    /// Buildings this player has lost.
    pub buildings_lost: u32,
    /// Enemy assets this player has destroyed.
    pub assets_destroyed: u32,
}

impl PlayerData {
    /// Create a player with a starting stockpile.
    #[must_use]
    pub fn new(color: PlayerColor, gold: i32, lumber: i32, stone: i32) -> Self {
        Self {
            color,
            gold,
            lumber,
            stone,
            food_consumption: 0,
            food_production: 0,
            asset_ids: Vec::new(),
            upgrades: BTreeSet::new(),
            game_events: Vec::new(),
            heal_timer: 0,
            units_lost: 0,
            buildings_lost: 0,
            assets_destroyed: 0,
        }
    }

    /// Current gold stockpile.
    #[must_use]
    pub const fn gold(&self) -> i32 {
        self.gold
    }

    /// Current lumber stockpile.
    #[must_use]
    pub const fn lumber(&self) -> i32 {
        self.lumber
    }

    /// Current stone stockpile.
    #[must_use]
    pub const fn stone(&self) -> i32 {
        self.stone
    }

    /// Add gold.
    pub fn increment_gold(&mut self, amount: i32) {
        self.gold += amount;
    }

    /// Remove gold.
    pub fn decrement_gold(&mut self, amount: i32) {
        self.gold -= amount;
    }

    /// Add lumber.
    pub fn increment_lumber(&mut self, amount: i32) {
        self.lumber += amount;
    }

    /// Remove lumber.
    pub fn decrement_lumber(&mut self, amount: i32) {
        self.lumber -= amount;
    }

    /// Add stone.
    pub fn increment_stone(&mut self, amount: i32) {
        self.stone += amount;
    }

    /// Remove stone.
    pub fn decrement_stone(&mut self, amount: i32) {
        self.stone -= amount;
    }

    /// Whether the stockpile covers a cost.
    #[must_use]
    pub const fn can_afford(&self, cost: ResourceCost) -> bool {
        self.gold >= cost.gold && self.lumber >= cost.lumber && self.stone >= cost.stone
    }

    /// Deduct a cost. Callers must have checked [`Self::can_afford`].
    pub fn spend(&mut self, cost: ResourceCost) {
        self.gold -= cost.gold;
        self.lumber -= cost.lumber;
        self.stone -= cost.stone;
    }

    /// Return a previously spent cost to the stockpile.
    pub fn refund(&mut self, cost: ResourceCost) {
        self.gold += cost.gold;
        self.lumber += cost.lumber;
        self.stone += cost.stone;
    }

    /// Human-readable list of the unmet parts of a cost, in the
    /// `"Gold:50 Lumber:100"` style consumed by UI affordances.
    #[must_use]
    pub fn unmet_cost(&self, cost: ResourceCost) -> String {
        let mut unmet = String::new();
        if self.gold < cost.gold {
            unmet.push_str(&format!("Gold:{} ", cost.gold - self.gold));
        }
        if self.lumber < cost.lumber {
            unmet.push_str(&format!("Lumber:{} ", cost.lumber - self.lumber));
        }
        if self.stone < cost.stone {
            unmet.push_str(&format!("Stone:{} ", cost.stone - self.stone));
        }
        unmet
    }

    /// Whether food production exceeds consumption, enabling healing.
    #[must_use]
    pub const fn has_food_surplus(&self) -> bool {
        self.food_production > self.food_consumption
    }

    /// Whether an upgrade has been completed.
    #[must_use]
    pub fn has_upgrade(&self, upgrade: CapabilityId) -> bool {
        self.upgrades.contains(&upgrade)
    }

    /// Record a completed upgrade.
    pub fn mark_upgrade(&mut self, upgrade: CapabilityId) {
        self.upgrades.insert(upgrade);
    }

    /// Register ownership of an asset.
    pub fn add_asset(&mut self, id: AssetId) {
        self.asset_ids.push(id);
    }

    /// Drop ownership of an asset.
    pub fn remove_asset(&mut self, id: AssetId) {
        self.asset_ids.retain(|&owned| owned != id);
    }

    /// Queue an event for this player's consumers.
    pub fn push_event(&mut self, event: GameEvent) {
        self.game_events.push(event);
    }

    /// Read the pending events. Cleared only by
    /// [`Self::clear_game_events`].
    #[must_use]
    pub fn game_events(&self) -> &[GameEvent] {
        &self.game_events
    }

    /// Drop all pending events.
    pub fn clear_game_events(&mut self) {
        self.game_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn test_spend_and_refund_are_inverse() {
        let mut player = PlayerData::new(PlayerColor::Blue, 500, 300, 100);
        let cost = ResourceCost::new(200, 100, 50);

        assert!(player.can_afford(cost));
        player.spend(cost);
        assert_eq!(player.gold(), 300);
        assert_eq!(player.lumber(), 200);
        assert_eq!(player.stone(), 50);

        player.refund(cost);
        assert_eq!(player.gold(), 500);
        assert_eq!(player.lumber(), 300);
        assert_eq!(player.stone(), 100);
    }

    #[test]
    fn test_unmet_cost_message() {
        let player = PlayerData::new(PlayerColor::Blue, 0, 150, 0);
        let message = player.unmet_cost(ResourceCost::new(50, 100, 25));
        assert_eq!(message, "Gold:50 Stone:25 ");
    }

    #[test]
    fn test_food_surplus() {
        let mut player = PlayerData::new(PlayerColor::Red, 0, 0, 0);
        player.food_production = 4;
        player.food_consumption = 4;
        assert!(!player.has_food_surplus());
        player.food_production = 5;
        assert!(player.has_food_surplus());
    }

    #[test]
    fn test_event_queue_cleared_explicitly() {
        let mut player = PlayerData::new(PlayerColor::Blue, 0, 0, 0);
        player.push_event(GameEvent::new(3, EventKind::Ready));
        assert_eq!(player.game_events().len(), 1);
        player.clear_game_events();
        assert!(player.game_events().is_empty());
    }
}
