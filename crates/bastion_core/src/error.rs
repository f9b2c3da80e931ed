//! Error types for the game simulation.
//!
//! The simulation hot path never returns errors: rule violations surface as
//! boolean refusals at the capability layer and inconsistencies degrade the
//! asset to idle. These errors cover the API boundary - unknown ids,
//! malformed save records, scenario data problems.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid asset reference.
    #[error("Asset not found: {0}")]
    AssetNotFound(u64),

    /// A capability name that is not registered.
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    /// A capability request was rejected by its application rules.
    #[error("Capability '{capability}' refused for asset {actor}")]
    CapabilityRefused {
        /// Capability name.
        capability: String,
        /// Acting asset id.
        actor: u64,
    },

    /// Malformed save record.
    #[error("Bad save record at line {line}: {message}")]
    SaveFormat {
        /// 1-based line number in the save stream.
        line: usize,
        /// Error message.
        message: String,
    },

    /// Failed to read or write a save stream.
    #[error("Save stream error: {0}")]
    SaveIo(#[from] std::io::Error),

    /// Scenario data could not be loaded.
    #[error("Failed to load scenario: {0}")]
    ScenarioLoad(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Desync detected between two runs that should be identical.
    #[error("Desync detected at cycle {cycle}: local hash {local_hash}, remote hash {remote_hash}")]
    DesyncDetected {
        /// Cycle where the desync occurred.
        cycle: u64,
        /// Local model hash.
        local_hash: u64,
        /// Remote model hash.
        remote_hash: u64,
    },
}
