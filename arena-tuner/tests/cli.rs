use std::process::{Command, Output};

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "arena-tuner-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn tuner(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_arena-tuner"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to launch arena-tuner")
}

#[test]
fn presets_mode_lists_bundled_matchups() {
    let output = tuner(&["--mode", "presets"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["mirror", "bruiser", "healer_vs_attacker"] {
        assert!(stdout.contains(name), "missing {name} in {stdout}");
    }
}

#[test]
fn presets_listing_can_be_written_to_a_file() {
    let output_path = temp_path("presets");
    let status = Command::new(env!("CARGO_BIN_EXE_arena-tuner"))
        .args(["--mode", "presets", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    assert!(content.contains("Available matchups"));
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn balanced_mirror_exits_cleanly_with_json_report() {
    let output = tuner(&[
        "--matchup", "mirror", "--agent", "none", "--seed", "7", "--matches", "400", "--report",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["reason"], "balanced");
    assert_eq!(report["iterations_run"], 1);
    assert_eq!(report["seed"], 7);
}

#[test]
fn unbalanced_session_exits_with_status_two() {
    let output = tuner(&[
        "--matchup",
        "bruiser",
        "--agent",
        "none",
        "--seed",
        "7",
        "--matches",
        "50",
        "--max-iterations",
        "2",
        "--report",
        "csv",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 4);
}

#[test]
fn batch_mode_reports_health_trace_as_csv() {
    let output = tuner(&[
        "--mode", "batch", "--matchup", "mirror", "--seed", "3", "--matches", "40", "--report",
        "csv",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    assert_eq!(
        lines.next(),
        Some("turn,mean_health_a,mean_health_b,matches_running")
    );
    assert_eq!(lines.next(), Some("1,100.000,100.000,40"));
}

#[test]
fn duel_mode_prints_turn_log() {
    let output = tuner(&["--mode", "duel", "--matchup", "bruiser", "--seed", "1"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Bruiser vs Sparrer"));
    assert!(stdout.contains("Result after"));
}

#[test]
fn unknown_matchup_fails() {
    let output = tuner(&["--matchup", "does-not-exist", "--agent", "none"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown matchup"));
}
