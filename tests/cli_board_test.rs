//! Integration tests for board commands via CLI.
//!
//! These tests verify that board commands work correctly through the CLI:
//! - `cork board create/list/show/add/remove` manage placements
//! - `cork board replay` runs gesture scripts and persists only final positions
//! - `--dry-run` leaves storage untouched

mod common;

use common::TestEnv;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::PathBuf;

/// Board 1 with card "Seven" placed at (50, 80).
fn board_with_card() -> (TestEnv, i64, i64) {
    let env = TestEnv::init();
    let board = env.create_board("Main");
    let card = env.create_card("Seven", "");
    env.cork()
        .args([
            "board",
            "add",
            &board.to_string(),
            &card.to_string(),
            "-x",
            "50",
            "-y",
            "80",
        ])
        .assert()
        .success();
    (env, board, card)
}

fn write_script(env: &TestEnv, script: &Value) -> PathBuf {
    let path = env.data_path().join("script.json");
    std::fs::write(&path, serde_json::to_string_pretty(script).unwrap()).unwrap();
    path
}

fn mouse(phase: &str, x: f64, y: f64, target: Option<Value>) -> Value {
    let mut event = json!({
        "op": "pointer",
        "phase": phase,
        "pointer_id": 1,
        "screen": {"x": x, "y": y},
        "kind": {"device": "mouse", "button": "primary"}
    });
    if let Some(target) = target {
        event["target"] = target;
    }
    event
}

fn placement(board: &Value, card: i64) -> (i64, i64) {
    let entry = board["cards"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["card_id"] == card)
        .unwrap();
    (entry["x"].as_i64().unwrap(), entry["y"].as_i64().unwrap())
}

// === Create / List / Show ===

#[test]
fn test_board_create_and_list() {
    let env = TestEnv::init();
    env.create_board("Main");
    env.create_board("Side");

    let list = env.json(&["board", "list"]);
    assert_eq!(list["count"], 2);
    assert_eq!(list["boards"][0]["name"], "Main");
    assert_eq!(list["boards"][0]["card_count"], 0);
}

#[test]
fn test_board_show_positions() {
    let (env, board, card) = board_with_card();
    let shown = env.json(&["board", "show", &board.to_string()]);
    assert_eq!(shown["board"]["name"], "Main");
    assert_eq!(placement(&shown, card), (50, 80));

    env.cork()
        .args(["-H", "board", "show", &board.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 Seven at (50, 80)"));
}

#[test]
fn test_board_show_missing() {
    let env = TestEnv::init();
    env.cork()
        .args(["board", "show", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// === Add / Remove ===

#[test]
fn test_board_add_defaults_to_origin() {
    let env = TestEnv::init();
    let board = env.create_board("Main");
    let card = env.create_card("Card", "");

    let added = env.json(&["board", "add", &board.to_string(), &card.to_string()]);
    assert_eq!(added["placed"], true);
    assert_eq!(added["position"], json!({"x": 0, "y": 0}));
}

#[test]
fn test_board_add_twice_fails() {
    let (env, board, card) = board_with_card();
    env.cork()
        .args(["board", "add", &board.to_string(), &card.to_string()])
        .assert()
        .failure();
}

#[test]
fn test_board_remove_keeps_card() {
    let (env, board, card) = board_with_card();
    env.cork()
        .args(["board", "remove", &board.to_string(), &card.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"placed\":false"));

    let shown = env.json(&["board", "show", &board.to_string()]);
    assert_eq!(shown["cards"].as_array().unwrap().len(), 0);
    env.cork()
        .args(["card", "show", &card.to_string()])
        .assert()
        .success();
}

// === Replay ===

#[test]
fn test_replay_drag_commits_final_position() {
    let (env, board, card) = board_with_card();
    let script = write_script(
        &env,
        &json!({
            "mode": "add",
            "steps": [
                mouse("down", 60.0, 90.0, Some(json!({"type": "card", "id": card}))),
                mouse("move", 70.0, 90.0, None),
                mouse("move", 90.0, 80.0, None),
                mouse("up", 90.0, 80.0, None)
            ]
        }),
    );

    let result = env.json(&["board", "replay", &board.to_string(), script.to_str().unwrap()]);
    assert_eq!(result["steps"], 4);
    assert_eq!(result["gesture_state"], "idle");
    let commits: Vec<_> = result["actions"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["action"] == "commit_position")
        .collect();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0]["position"], json!({"x": 80, "y": 70}));

    let shown = env.json(&["board", "show", &board.to_string()]);
    assert_eq!(placement(&shown, card), (80, 70));
}

#[test]
fn test_replay_dry_run_leaves_storage() {
    let (env, board, card) = board_with_card();
    let script = write_script(
        &env,
        &json!({
            "mode": "add",
            "steps": [
                mouse("down", 60.0, 90.0, Some(json!({"type": "card", "id": card}))),
                mouse("move", 160.0, 90.0, None),
                mouse("up", 160.0, 90.0, None)
            ]
        }),
    );

    let result = env.json(&[
        "board",
        "replay",
        &board.to_string(),
        script.to_str().unwrap(),
        "--dry-run",
    ]);
    assert_eq!(result["dry_run"], true);
    assert_eq!(placement(&result, card), (150, 80));

    let shown = env.json(&["board", "show", &board.to_string()]);
    assert_eq!(placement(&shown, card), (50, 80));
}

#[test]
fn test_replay_click_in_add_mode_creates_card() {
    let (env, board, _) = board_with_card();
    let script = write_script(
        &env,
        &json!({
            "mode": "add",
            "steps": [
                mouse("down", 300.0, 200.0, None),
                mouse("up", 302.0, 201.0, None)
            ]
        }),
    );

    let result = env.json(&["board", "replay", &board.to_string(), script.to_str().unwrap()]);
    let created = result["created"].as_array().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["title"], "Untitled");
    let new_id = created[0]["id"].as_i64().unwrap();

    let shown = env.json(&["board", "show", &board.to_string()]);
    assert_eq!(placement(&shown, new_id), (300, 200));
}

#[test]
fn test_replay_pan_and_wheel_only_move_viewport() {
    let (env, board, card) = board_with_card();
    let script = write_script(
        &env,
        &json!({
            "steps": [
                mouse("down", 100.0, 100.0, None),
                mouse("move", 150.0, 120.0, None),
                mouse("up", 150.0, 120.0, None),
                {"op": "wheel", "screen": {"x": 0.0, "y": 0.0}, "delta_y": -200.0}
            ]
        }),
    );

    let result = env.json(&["board", "replay", &board.to_string(), script.to_str().unwrap()]);
    assert_eq!(result["mode"], "pan");
    assert!(result["viewport"]["scale"].as_f64().unwrap() > 1.0);
    assert!(
        result["actions"]
            .as_array()
            .unwrap()
            .iter()
            .all(|a| a["action"] == "viewport_changed")
    );

    let shown = env.json(&["board", "show", &board.to_string()]);
    assert_eq!(placement(&shown, card), (50, 80));
}

#[test]
fn test_replay_zoom_respects_configured_bounds() {
    let (env, board, _) = board_with_card();
    let script = write_script(
        &env,
        &json!({
            "steps": [
                {"op": "wheel", "screen": {"x": 0.0, "y": 0.0}, "delta_y": -100000.0}
            ]
        }),
    );

    let result = env.json(&[
        "--config",
        "max-scale=1.5",
        "board",
        "replay",
        &board.to_string(),
        script.to_str().unwrap(),
    ]);
    assert_eq!(result["viewport"]["scale"], 1.5);
}

#[test]
fn test_replay_unfinished_gesture_reported() {
    let (env, board, card) = board_with_card();
    let script = write_script(
        &env,
        &json!({
            "mode": "add",
            "steps": [
                mouse("down", 60.0, 90.0, Some(json!({"type": "card", "id": card}))),
                mouse("move", 90.0, 90.0, None)
            ]
        }),
    );

    env.cork()
        .args(["-H", "board", "replay", &board.to_string(), script.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Gesture still in progress: dragging-card"));

    let shown = env.json(&["board", "show", &board.to_string()]);
    assert_eq!(placement(&shown, card), (50, 80));
}

#[test]
fn test_replay_bad_script() {
    let (env, board, _) = board_with_card();
    let path = env.data_path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    env.cork()
        .args(["board", "replay", &board.to_string(), path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON error"));
}
