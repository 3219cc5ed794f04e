//! Integration tests for configuration resolution and `fishtank config`.

mod common;

use common::{TestEnv, parse_json};
use predicates::prelude::*;

#[test]
fn test_config_path_points_into_config_home() {
    let env = TestEnv::new();

    let output = env.fishtank().args(["config", "path"]).assert().success();
    let json = parse_json(&output.get_output().stdout);

    assert_eq!(
        json["path"],
        env.default_config_path().display().to_string()
    );
    assert_eq!(json["exists"], false);
}

#[test]
fn test_config_path_human_marks_missing_file() {
    let env = TestEnv::new();

    env.fishtank()
        .args(["-H", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(not created)"));
}

#[test]
fn test_config_show_defaults() {
    let env = TestEnv::new();

    let output = env
        .fishtank()
        .env_remove("FISHTANK_DOCKER_BIN")
        .env_remove("FISHTANK_TMUX_BIN")
        .args(["config", "show"])
        .assert()
        .success();
    let json = parse_json(&output.get_output().stdout);

    let settings = &json["settings"];
    assert_eq!(settings["host"], "127.0.0.1");
    assert_eq!(settings["port"], 3001);
    assert_eq!(settings["pollIntervalMs"], 2000);
    assert_eq!(settings["commandTimeoutMs"], 5000);
    assert_eq!(settings["staleAfterSecs"], 30);
    assert_eq!(settings["removeGracePolls"], 0);
    assert_eq!(settings["logTailLines"], 50);
    assert_eq!(settings["dockerBin"], "docker");
    assert_eq!(settings["tmuxBin"], "tmux");
    assert_eq!(json["sources"]["port"], "default");
    assert!(json["path"].is_null());
}

#[test]
fn test_config_file_and_env_precedence() {
    let env = TestEnv::new();
    env.write_config("port 4000\nstale-after-secs 90\n");

    let output = env
        .fishtank()
        .env("FISHTANK_PORT", "5000")
        .args(["config", "show"])
        .assert()
        .success();
    let json = parse_json(&output.get_output().stdout);

    // `config show` has no --port of its own, so the env var is ignored here
    assert_eq!(json["settings"]["port"], 4000);
    assert_eq!(json["settings"]["staleAfterSecs"], 90);
    assert_eq!(json["sources"]["port"], "file");
    assert_eq!(json["sources"]["docker-bin"], "cli");
}

#[test]
fn test_explicit_config_flag() {
    let env = TestEnv::new();
    let path = env.write_config_at("other.kdl", "log-tail-lines 7\n");

    let output = env
        .fishtank()
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success();
    let json = parse_json(&output.get_output().stdout);

    assert_eq!(json["settings"]["logTailLines"], 7);
    assert_eq!(json["path"], path.display().to_string());
}

#[test]
fn test_missing_explicit_config_fails() {
    let env = TestEnv::new();

    env.fishtank()
        .args(["config", "show", "--config", "/nonexistent/fishtank.kdl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn test_invalid_config_fails_with_json_error() {
    let env = TestEnv::new();
    env.write_config("poll-interval-ms 1\n");

    let output = env.fishtank().arg("snapshot").assert().failure().code(1);
    let json = parse_json(&output.get_output().stderr);

    assert!(json["error"].as_str().unwrap().contains("poll-interval-ms"));
}

#[test]
fn test_unknown_config_key_fails_for_humans() {
    let env = TestEnv::new();
    env.write_config("prot 3001\n");

    env.fishtank()
        .args(["-H", "snapshot"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: "))
        .stderr(predicate::str::contains("unknown key 'prot'"));
}

#[test]
fn test_config_show_human_lists_sources() {
    let env = TestEnv::new();
    env.write_config("port 4000\n");

    env.fishtank()
        .args(["-H", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("port = 4000 (file)"))
        .stdout(predicate::str::contains("host = 127.0.0.1 (default)"));
}
