//! Scenario file loading through the runner, end to end.

use std::io::Write;

use bastion_core::scenario;
use bastion_headless::{load_scenario, run_scenario};

#[test]
fn test_ron_scenario_file_round_trips_through_runner() {
    let text = scenario::skirmish().to_ron().unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();

    let setup = load_scenario(Some(file.path())).unwrap();
    assert_eq!(setup.name, "skirmish");

    let report = run_scenario(&setup, 50).unwrap();
    assert_eq!(report.ticks, 50);
    assert!(report.assets >= 7);
}

#[test]
fn test_same_file_same_hash() {
    let text = scenario::skirmish().to_ron().unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();

    let setup = load_scenario(Some(file.path())).unwrap();
    let first = run_scenario(&setup, 80).unwrap();
    let second = run_scenario(&setup, 80).unwrap();
    assert_eq!(first.final_hash, second.final_hash);
}
