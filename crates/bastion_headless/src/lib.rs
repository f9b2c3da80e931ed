//! Headless runner library: scenario loading, run reports, and batch
//! verification used by the CLI and by CI.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod runner;

pub use runner::{load_scenario, run_scenario, verify_scenario, PlayerReport, RunReport};
