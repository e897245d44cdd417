use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "homestretch-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_homestretch-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("exhausted-runaway"));
}

#[test]
fn cli_runs_scenarios_and_writes_json() {
    let exe = env!("CARGO_BIN_EXE_homestretch-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--scenarios",
            "mid-distance-pace-chaser,exhausted-runaway",
            "--seeds",
            "1,0x2",
            "--samples",
            "2",
            "--policy",
            "enhanced",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Homestretch Scenario Tester"));

    let content = std::fs::read_to_string(output_path).expect("read output");
    let parsed: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let runs = parsed.as_array().expect("array");
    assert_eq!(runs.len(), 4);
    assert!(runs.iter().all(|run| run["passed"] == true));
    assert!(runs.iter().all(|run| run["policy"] == "enhanced"));
}

#[test]
fn cli_runs_custom_config_as_csv() {
    let exe = env!("CARGO_BIN_EXE_homestretch-tester");
    let config_path = temp_path("config.json");
    std::fs::write(
        &config_path,
        r#"{"horse": {"strategy": "late_surger"}, "course": {"distance": 2400}, "samples": 3}"#,
    )
    .expect("write config");
    let output_path = temp_path("custom.csv");
    let status = Command::new(exe)
        .args(["--scenarios", "", "--report", "csv", "--config"])
        .arg(&config_path)
        .arg("--output")
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("custom,1337,game,true,3"));
}

#[test]
fn cli_rejects_bad_seed_tokens() {
    let exe = env!("CARGO_BIN_EXE_homestretch-tester");
    let output = Command::new(exe)
        .args(["--seeds", "12,not-a-seed", "--samples", "1"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unrecognized seed token"));
}
