//! Loading and running stage files from disk.

use std::io::Write;

use tactics_headless::{run_stage, scenario, RunConfig, ScenarioError};

const DUEL: &str = r#"StageData(
    name: "Duel",
    map: (
        width: 5,
        height: 1,
        tiles: [(cost: 0), (cost: 100)],
        layers: [[1, 1, 1, 1, 1]],
    ),
    units: [
        (name: "Hero", faction: Ally, class: mid, pos: (x: 0, y: 0), brain: input),
        (name: "Brute", faction: Foe, class: close, pos: (x: 4, y: 0)),
    ],
    config: (seed: 3),
)"#;

fn write_stage(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(text.as_bytes()).expect("write stage");
    file
}

#[test]
fn test_stage_file_plays_to_an_outcome() {
    let file = write_stage(DUEL);
    let data = scenario::load(file.path()).expect("valid stage file");
    assert_eq!(data.name, "Duel");

    let report = run_stage(&data, &RunConfig::default()).expect("stage builds");
    assert!(report.outcome.is_some(), "{}", report.summary());
    assert_eq!(report.survivors.len(), 1);
    let json = serde_json::to_string(&report).expect("report encodes");
    assert!(json.contains("\"stage\":\"Duel\""));
}

#[test]
fn test_resolve_prefers_files() {
    let file = write_stage(DUEL);
    let path = file.path().to_str().expect("utf-8 temp path");
    assert_eq!(scenario::resolve(path).expect("file stage").name, "Duel");
}

#[test]
fn test_broken_file_reports_parse_error() {
    let file = write_stage("StageData(name: \"Half\"");
    assert!(matches!(scenario::load(file.path()), Err(ScenarioError::ParseError(_))));
}

#[test]
fn test_missing_file_reports_read_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.ron");
    assert!(matches!(scenario::load(&missing), Err(ScenarioError::ReadError(_))));
}
