//! # Bastion Core
//!
//! Deterministic asset/capability simulation core for Bastion RTS.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO in the simulation hot path
//! - No system randomness (one seeded PRNG, serialized with the model)
//! - Integer math throughout
//!
//! This separation enables:
//! - Lockstep multiplayer (identical simulation across clients)
//! - Headless server and CI builds
//! - Replay and save systems
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`asset`] - assets, command stacks, the id arena
//! - [`asset_type`] - per-player stat blocks and capability sets
//! - [`capability`] / [`capabilities`] - the capability registry and library
//! - [`activated`] - per-invocation capability state machines
//! - [`game`] - the game model and the per-cycle tick
//! - [`visibility`] - per-player fog of war
//! - [`terrain`] / [`occupancy`] / [`router`] - the map layers and routing

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod activated;
pub mod asset;
pub mod asset_type;
pub mod capabilities;
pub mod capability;
pub mod error;
pub mod events;
pub mod game;
pub mod occupancy;
pub mod player;
pub mod position;
pub mod rng;
pub mod router;
pub mod save;
pub mod scenario;
pub mod terrain;
pub mod visibility;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::activated::ActivatedCapability;
    pub use crate::asset::{Asset, AssetAction, AssetArena, AssetCommand, AssetId};
    pub use crate::asset_type::{
        AssetType, AssetTypeKind, AssetTypeStore, PlayerColor, ResourceCost, ResourceKind,
        UPDATE_FREQUENCY,
    };
    pub use crate::capability::{
        registry, Capability, CapabilityId, CapabilityRegistry, Target, TargetKind,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::events::{EventKind, GameEvent};
    pub use crate::game::GameModel;
    pub use crate::player::PlayerData;
    pub use crate::position::{Direction, PixelPosition, TilePosition, TILE_SIZE};
    pub use crate::rng::GameRng;
    pub use crate::scenario::Scenario;
    pub use crate::terrain::{TerrainMap, TerrainTile};
    pub use crate::visibility::{TileVisibility, VisibilityMap};
}
