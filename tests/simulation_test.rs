use std::process::{Command, Output};

fn run_simulation(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_roundabout_sim"))
        .args(args)
        .env("RUST_LOG", "warn,roundabout_sim=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Pull the number after `label` out of the log
fn logged_count(log: &str, label: &str) -> usize {
    log.lines()
        .find_map(|line| line.split(label).nth(1))
        .and_then(|rest| rest.trim().split_whitespace().next())
        .and_then(|value| value.parse().ok())
        .unwrap_or_else(|| panic!("Missing '{}' in log: {}", label, log))
}

/// Test that the simulation runs in headless mode without crashing
#[test]
fn test_headless_simulation_runs() {
    let output = run_simulation(&["--ticks", "200", "--seed", "1"]);

    assert!(
        output.status.success(),
        "Simulation failed to run in headless mode. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );
}

/// Test that simulation statistics are logged
#[test]
fn test_simulation_statistics_logged() {
    let output = run_simulation(&["--ticks", "2400", "--seed", "7", "--report-every", "0"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let generated = logged_count(&stderr, "Vehicles generated:");
    let completed = logged_count(&stderr, "Vehicles completed:");
    let on_road = logged_count(&stderr, "Vehicles on the road:");

    // 20 vehicles per minute over two minutes
    assert_eq!(generated, 40);
    assert!(completed > 0, "No vehicle completed its trip");
    assert_eq!(generated, completed + on_road);
    assert!(stderr.contains("Average travel time:"));
}

/// Test that the summary and map are printed
#[test]
fn test_summary_and_map_printed() {
    let output = run_simulation(&["--ticks", "400", "--seed", "3", "--report-every", "200", "--map"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Initial state:"));
    assert!(stdout.contains("--- After tick 200 ---"));
    assert!(stdout.contains("=== Final State ==="));
    assert!(stdout.contains("=== Roundabout Map ==="));
    assert!(stdout.contains("Lanes: 4, radius: 15 m"));
}

/// Test that command-line settings are clamped into range
#[test]
fn test_out_of_range_settings_are_clamped() {
    let output = run_simulation(&["--ticks", "20", "--lanes", "99", "--radius", "3"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Roundabout reset: 24 lanes, 10 m radius"),
        "Settings were not clamped. stderr: {}",
        stderr
    );
}

/// Test that a settings file is read
#[test]
fn test_settings_file() {
    let path = std::env::temp_dir().join(format!("roundabout_sim_{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "lanes": 6, "radius": 30, "stop_time": 0 }"#).unwrap();

    let output = run_simulation(&["--ticks", "100", "--settings", path.to_str().unwrap()]);
    std::fs::remove_file(&path).ok();
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Roundabout reset: 6 lanes, 30 m radius, light every 0 s"));
}

/// Test that a broken settings file is reported
#[test]
fn test_invalid_settings_file_fails() {
    let path = std::env::temp_dir().join(format!("roundabout_sim_bad_{}.json", std::process::id()));
    std::fs::write(&path, "lanes = 6").unwrap();

    let output = run_simulation(&["--ticks", "10", "--settings", path.to_str().unwrap()]);
    std::fs::remove_file(&path).ok();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid settings JSON"), "stderr: {}", stderr);
}
