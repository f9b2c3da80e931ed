//! Game events produced by the simulation tick.
//!
//! Events are the one-way channel from the core to its consumers (UI, AI,
//! sound). The tick appends to every player's queue; consumers drain with
//! `PlayerData::clear_game_events`. The core never reads them back.

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A build/repair/research activity finished.
    WorkComplete,
    /// An asset was selected.
    Selection,
    /// An order was accepted.
    Acknowledge,
    /// A trained unit is ready.
    Ready,
    /// An asset died.
    Death,
    /// An asset took damage.
    Attacked,
    /// A ranged attacker launched a missile.
    MissileFire,
    /// A missile reached its target.
    MissileHit,
    /// A lumber harvest increment completed.
    Harvest,
    /// A stone quarry increment completed.
    Quarry,
    /// A melee swing connected.
    MeleeHit,
    /// A building was placed.
    PlaceAction,
    /// Periodic UI button refresh hint.
    ButtonTick,
    /// A gold bonus was granted.
    WinXGold,
    /// Scripted enemies spawned.
    SpawnEnemies,
    /// A text message should be shown.
    SendText,
}

/// An event tied to the asset that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// The asset this event refers to.
    pub asset: AssetId,
    /// What happened.
    pub kind: EventKind,
}

impl GameEvent {
    /// Create a new event.
    #[must_use]
    pub const fn new(asset: AssetId, kind: EventKind) -> Self {
        Self { asset, kind }
    }
}
