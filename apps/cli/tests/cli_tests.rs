//! go2-cli 端到端测试

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn cli(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("go2-cli").unwrap();
    cmd.arg("--config").arg(config).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_presets_lists_all_presets() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir.path().join("config.toml"))
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("beginner"))
        .stdout(predicate::str::contains("sport"))
        .stdout(predicate::str::contains("normal").and(predicate::str::contains("*")));
}

#[test]
fn test_actions_lists_snake_case_names() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir.path().join("config.toml"))
        .arg("actions")
        .assert()
        .success()
        .stdout(predicate::str::contains("toggle_free_avoid"))
        .stdout(predicate::str::contains("enter_pose_mode"));
}

#[test]
fn test_config_set_preset_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("go2").join("config.toml");

    cli(&path)
        .args(["config", "set-preset", "sport"])
        .assert()
        .success();
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("preset = \"sport\""));

    cli(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("preset:     sport"));
}

#[test]
fn test_config_rejects_incomplete_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    cli(&path)
        .args(["config", "set-connection", "--method", "local-sta"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("IP or serial number required"));
    assert!(!path.exists());
}

#[test]
fn test_simulate_builtin_scenario_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli(&dir.path().join("config.toml"))
        .args(["simulate", "--ticks", "6", "--rate", "30", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    // 6 帧前进 + 3 帧松杆
    assert_eq!(lines.len(), 9);
    assert!(lines[5]["vx"].as_f64().unwrap() > 0.0);
    // 松杆：第一帧零速度发送，其余被抑制
    assert_eq!(lines[6]["is_zero"], true);
    assert_eq!(lines[6]["should_send"], true);
    assert_eq!(lines[8]["should_send"], false);
}

#[test]
fn test_simulate_script_reports_gate_errors() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("scenario.json");
    fs::write(
        &script,
        r#"{
            "name": "no-enable",
            "steps": [
                { "type": "input", "ly": 1.0, "repeat": 2 },
                { "type": "action", "name": "stop_move" }
            ]
        }"#,
    )
    .unwrap();

    cli(&dir.path().join("config.toml"))
        .args(["simulate", "--rate", "200", "--script"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("rejected:   2"));
}

#[test]
fn test_simulate_rejects_unknown_action_in_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("bad.json");
    fs::write(
        &script,
        r#"{ "steps": [ { "type": "action", "name": "moonwalk" } ] }"#,
    )
    .unwrap();

    cli(&dir.path().join("config.toml"))
        .args(["simulate", "--script"])
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action 'moonwalk'"));
}
