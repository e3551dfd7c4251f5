use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

// Minimal valid config for the sim backend; the store lives in `dir`.
fn write_valid_config(dir: &Path) -> PathBuf {
    let store = dir.join("position.txt");
    let toml = format!(
        r#"
[mqtt]
server = "localhost"
base_topic = "desk"

[storage]
position_file = '{}'
"#,
        store.display()
    );
    let path = dir.join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn deskctl(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("deskctl").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd.env_remove("DESK_TEST_ENCODER_DEAD");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn goto_json(cfg: &Path, percent: u8) -> serde_json::Value {
    let out = deskctl(cfg)
        .args(["--json", "goto", "--percent", &percent.to_string()])
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8(out.stdout).unwrap();
    let line = stdout.lines().last().expect("one JSON line");
    serde_json::from_str(line).unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "encoder: OK", "stdout")]
#[case(&["goto", "--percent", "150"], 2, "150", "stderr")]
#[case(&["goto"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());

    let assert = deskctl(&cfg).args(args).assert().code(exit_code);
    match stream {
        "stdout" => assert.stdout(predicate::str::contains(needle)),
        _ => assert.stderr(predicate::str::contains(needle)),
    };
}

#[test]
fn goto_reaches_target_and_persists_position() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());

    let v = goto_json(&cfg, 50);
    assert_eq!(v["requested"], 50);
    assert_eq!(v["moved"], true);
    assert_eq!(v["percent"], 50);

    let raw = v["raw"].as_i64().unwrap();
    let stored: i64 = fs::read_to_string(dir.path().join("position.txt"))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(stored, raw);
}

#[test]
fn second_goto_to_same_height_does_not_move() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());

    let first = goto_json(&cfg, 30);
    assert_eq!(first["moved"], true);
    assert_eq!(first["percent"], 30);
    let second = goto_json(&cfg, 30);
    assert_eq!(second["moved"], false);
    assert_eq!(second["percent"], 30);
    assert_eq!(second["raw"], first["raw"]);
}

#[test]
fn missing_config_exits_with_config_code() {
    let dir = tempdir().unwrap();
    deskctl(&dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config could not be loaded"));
}

#[test]
fn invalid_motion_config_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        "[mqtt]\nserver = \"localhost\"\nbase_topic = \"desk\"\n[motion]\nmax_pos = 0\n",
    )
    .unwrap();
    deskctl(&path)
        .args(["goto", "--percent", "10"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_pos"));
}

#[test]
fn dead_encoder_refuses_to_start() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    deskctl(&cfg)
        .env("DESK_TEST_ENCODER_DEAD", "1")
        .args(["goto", "--percent", "40"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("did not answer after 10 attempts"));
    assert!(!dir.path().join("position.txt").exists());
}

#[test]
fn dead_encoder_json_error_names_the_reason() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    let out = deskctl(&cfg)
        .env("DESK_TEST_ENCODER_DEAD", "1")
        .args(["--json", "self-check"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let line = stderr
        .lines()
        .rev()
        .find(|l| l.contains("\"reason\""))
        .expect("json error line");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "EncoderUnresponsive");
    assert_eq!(v["details"]["attempts"], 10);
}

#[test]
fn run_publishes_initial_status_and_stops_after_duration() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    deskctl(&cfg)
        .args(["run", "--duration-s", "1"])
        .write_stdin("")
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("desk/status OFF"))
        .stdout(predicate::str::contains("desk/position 0"))
        .stdout(predicate::str::contains("desk/raw_position 0"));
}
