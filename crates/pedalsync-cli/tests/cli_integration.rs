//! CLI Integration Tests
//!
//! These tests run the `pedalsync` binary against a temporary database and
//! config file. Ride replays use the paused clock, so they finish instantly.
//!
//! ```
//! cargo test --package pedalsync-cli --test cli_integration
//! ```

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("data.db")
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_pedalsync"))
            .arg("--database")
            .arg(self.db())
            .arg("--config")
            .arg(self.config())
            .args(args)
            .env_remove("PEDALSYNC_USER")
            .env_remove("PEDALSYNC_DB")
            .env_remove("PEDALSYNC_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to run pedalsync binary")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "pedalsync {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }

    fn run_json(&self, args: &[&str]) -> serde_json::Value {
        serde_json::from_str(&self.run_ok(args)).expect("stdout should be JSON")
    }
}

/// Ten one-second readings at a steady 18 km/h.
fn steady_script() -> String {
    steady_script_of(10)
}

fn steady_script_of(seconds: u32) -> String {
    let mut script = String::from("speed,distance,cycles,rpm,delay_ms\n");
    for i in 1..=seconds {
        script.push_str(&format!("18.0,{:.3},{},65,1000\n", i as f64 * 0.005, i * 2));
    }
    script
}

fn ride(sandbox: &Sandbox, script: &Path, extra: &[&str]) -> serde_json::Value {
    let script = script.to_str().unwrap();
    let mut args = vec!["ride", "--script", script, "--format", "json", "-q"];
    args.extend_from_slice(extra);
    sandbox.run_json(&args)
}

// =============================================================================
// Help and argument handling
// =============================================================================

#[test]
fn test_help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_pedalsync"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["ride", "sessions", "summary", "profile", "config"] {
        assert!(stdout.contains(command), "help should list {}", command);
    }
}

#[test]
fn test_no_color_env_values() {
    let sandbox = Sandbox::new();
    for value in ["1", "true", "yes", "0", "false", ""] {
        let output = Command::new(env!("CARGO_BIN_EXE_pedalsync"))
            .arg("--database")
            .arg(sandbox.db())
            .arg("--config")
            .arg(sandbox.config())
            .args(["sessions", "--format", "json"])
            .env_remove("PEDALSYNC_USER")
            .env_remove("PEDALSYNC_DB")
            .env_remove("PEDALSYNC_CONFIG")
            .env("NO_COLOR", value)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "NO_COLOR={:?} failed: {}",
            value,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn test_ride_without_source_fails() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["ride"]);
    assert!(!output.status.success());
}

#[test]
fn test_ride_rejects_bad_weight() {
    let sandbox = Sandbox::new();
    let script = sandbox.write("ride.csv", &steady_script());
    let output = sandbox.run(&[
        "ride",
        "--script",
        script.to_str().unwrap(),
        "--weight=-3",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Weight"));
}

// =============================================================================
// Rides
// =============================================================================

#[test]
fn test_ride_produces_record() {
    let sandbox = Sandbox::new();
    let script = sandbox.write("ride.csv", &steady_script());

    let record = ride(&sandbox, &script, &["--user", "amy"]);
    assert_eq!(record["user_id"], "amy");
    assert_eq!(record["cycles"], 20);
    assert!((record["distance"].as_f64().unwrap() - 0.05).abs() < 1e-9);
    assert_eq!(record["avg_speed"], 18.0);

    // Ten scripted seconds on the paused clock.
    let duration = record["duration_secs"].as_u64().unwrap();
    assert!((9..=11).contains(&duration), "duration was {}", duration);
    assert!(record["calories"].as_u64().unwrap() > 0);
}

#[test]
fn test_hardware_reset_restarts_counters() {
    let sandbox = Sandbox::new();
    let script = sandbox.write(
        "reset.csv",
        "speed,distance,cycles\n\
         20,1.0,50\n\
         20,2.0,100\n\
         20,0,0\n\
         20,0.5,20\n",
    );

    let record = ride(&sandbox, &script, &[]);
    assert_eq!(record["cycles"], 20);
    assert!((record["distance"].as_f64().unwrap() - 0.5).abs() < 1e-9);
}

#[test]
fn test_simulated_ride() {
    let sandbox = Sandbox::new();
    let record = sandbox.run_json(&["ride", "--simulate", "2", "--format", "json", "-q"]);

    assert_eq!(record["user_id"], "rider");
    let duration = record["duration_secs"].as_u64().unwrap();
    assert!((119..=121).contains(&duration), "duration was {}", duration);
    assert!(record["distance"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_ride_csv_output() {
    let sandbox = Sandbox::new();
    let script = sandbox.write("ride.csv", &steady_script());
    let stdout = sandbox.run_ok(&[
        "ride",
        "--script",
        script.to_str().unwrap(),
        "--format",
        "csv",
        "-q",
    ]);

    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("session_id,user_id"));
}

// =============================================================================
// Stored data
// =============================================================================

#[test]
fn test_sessions_hide_rides_without_distance() {
    let sandbox = Sandbox::new();
    let moving = sandbox.write("moving.csv", &steady_script());
    let parked = sandbox.write("parked.json", r#"[{"speed": 0, "distance": 0, "cycles": 0}]"#);

    ride(&sandbox, &moving, &[]);
    ride(&sandbox, &parked, &[]);

    let sessions = sandbox.run_json(&["sessions", "--format", "json"]);
    assert_eq!(sessions.as_array().unwrap().len(), 1);

    let all = sandbox.run_json(&["sessions", "--all", "--format", "json"]);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let csv = sandbox.run_ok(&["sessions", "--format", "csv"]);
    assert_eq!(csv.lines().count(), 2);
}

#[test]
fn test_summary_totals() {
    let sandbox = Sandbox::new();
    let script = sandbox.write("ride.csv", &steady_script());
    ride(&sandbox, &script, &[]);
    ride(&sandbox, &script, &[]);

    let summary = sandbox.run_json(&["summary", "--format", "json"]);
    assert_eq!(summary["sessions"], 2);
    assert_eq!(summary["total_cycles"], 40);

    let other = sandbox.run_json(&["summary", "--user", "nobody", "--format", "json"]);
    assert_eq!(other["sessions"], 0);
}

#[test]
fn test_profile_weight_feeds_rides() {
    let sandbox = Sandbox::new();
    sandbox.run_ok(&["profile", "set-weight", "90", "-q"]);

    let shown = sandbox.run_ok(&["profile", "show"]);
    assert!(shown.contains("90.0 kg"));

    let script = sandbox.write("ride.csv", &steady_script_of(60));
    let heavy = ride(&sandbox, &script, &[]);
    let light = ride(&sandbox, &script, &["--weight", "45"]);
    assert!(heavy["calories"].as_u64().unwrap() > light["calories"].as_u64().unwrap());
}

#[test]
fn test_profile_rejects_invalid_weight() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["profile", "set-weight", "0"]);
    assert!(!output.status.success());
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn test_config_init_and_show() {
    let sandbox = Sandbox::new();

    let path = sandbox.run_ok(&["config", "path"]);
    assert_eq!(path.trim(), sandbox.config().display().to_string());

    sandbox.run_ok(&["config", "init", "-q"]);
    assert!(sandbox.config().exists());

    // A second init needs --force.
    assert!(!sandbox.run(&["config", "init"]).status.success());
    sandbox.run_ok(&["config", "init", "--force", "-q"]);

    let shown = sandbox.run_ok(&["config", "show"]);
    assert!(shown.contains("sync_interval_secs = 5"));
}

#[test]
fn test_config_user_is_default_rider() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.config(), "user = \"casey\"\n").unwrap();

    let script = sandbox.write("ride.csv", &steady_script());
    let record = ride(&sandbox, &script, &[]);
    assert_eq!(record["user_id"], "casey");
}
