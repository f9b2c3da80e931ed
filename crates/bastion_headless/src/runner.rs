//! Scenario loading and headless game runs.

use std::path::Path;

use serde::Serialize;

use bastion_core::prelude::*;
use bastion_core::scenario::{self, Scenario};

/// Load a scenario from a RON file, or the built-in skirmish when no path
/// is given.
pub fn load_scenario(path: Option<&Path>) -> Result<Scenario> {
    match path {
        None => Ok(scenario::skirmish()),
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                GameError::ScenarioLoad(format!("{}: {e}", path.display()))
            })?;
            Scenario::from_ron(&text)
        }
    }
}

/// Per-player slice of a run report.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerReport {
    /// Player color name.
    pub color: String,
    /// Final gold.
    pub gold: i32,
    /// Final lumber.
    pub lumber: i32,
    /// Final stone.
    pub stone: i32,
    /// Living assets at the end of the run.
    pub assets: usize,
    /// Units lost over the run.
    pub units_lost: u32,
    /// Buildings lost over the run.
    pub buildings_lost: u32,
    /// Game events accumulated (never cleared by the runner).
    pub events: usize,
}

/// Result of one headless run, serialized to JSON for CI consumers.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// RNG seed used.
    pub seed: u64,
    /// Cycles simulated.
    pub ticks: u64,
    /// Final state hash; two runs of the same scenario must agree.
    pub final_hash: u64,
    /// Total assets alive at the end.
    pub assets: usize,
    /// Per-player summaries, in color order.
    pub players: Vec<PlayerReport>,
}

/// Drive a scenario for a number of ticks and summarize the outcome.
pub fn run_scenario(setup: &Scenario, ticks: u64) -> Result<RunReport> {
    let mut model = setup.build()?;
    for _ in 0..ticks {
        model.tick();
    }
    Ok(report(setup, ticks, &model))
}

fn report(setup: &Scenario, ticks: u64, model: &GameModel) -> RunReport {
    let mut players = Vec::new();
    for color in PlayerColor::ALL {
        let player = model.player(color);
        let living = player
            .asset_ids
            .iter()
            .filter(|&&id| model.asset(id).map_or(false, |asset| asset.alive()))
            .count();
        if player.asset_ids.is_empty() && player.game_events().is_empty() {
            continue;
        }
        players.push(PlayerReport {
            color: color.name().to_string(),
            gold: player.gold(),
            lumber: player.lumber(),
            stone: player.stone(),
            assets: living,
            units_lost: player.units_lost,
            buildings_lost: player.buildings_lost,
            events: player.game_events().len(),
        });
    }
    RunReport {
        scenario: setup.name.clone(),
        seed: setup.seed,
        ticks,
        final_hash: model.state_hash(),
        assets: model.arena().len(),
        players,
    }
}

/// Run a scenario `runs` times for `ticks` cycles each and verify every
/// run lands on the same state hash. Returns the shared hash.
pub fn verify_scenario(setup: &Scenario, ticks: u64, runs: usize) -> Result<u64> {
    let mut hashes = Vec::with_capacity(runs);
    for _ in 0..runs.max(2) {
        let mut model = setup.build()?;
        for _ in 0..ticks {
            model.tick();
        }
        hashes.push(model.state_hash());
    }
    let first = hashes[0];
    if let Some(position) = hashes.iter().position(|&hash| hash != first) {
        return Err(GameError::DesyncDetected {
            cycle: ticks,
            local_hash: first,
            remote_hash: hashes[position],
        });
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_reports_players() {
        let setup = scenario::skirmish();
        let report = run_scenario(&setup, 20).unwrap();
        assert_eq!(report.ticks, 20);
        assert!(report.players.iter().any(|p| p.color == "Blue"));
        assert!(report.players.iter().any(|p| p.color == "Red"));
    }

    #[test]
    fn test_verify_passes_on_clean_scenario() {
        let setup = scenario::skirmish();
        let hash_a = verify_scenario(&setup, 40, 3).unwrap();
        let hash_b = verify_scenario(&setup, 40, 2).unwrap();
        assert_eq!(hash_a, hash_b);
    }

    #[test]
    fn test_missing_scenario_file_errors() {
        let result = load_scenario(Some(Path::new("/nonexistent/arena.ron")));
        assert!(result.is_err());
    }
}
