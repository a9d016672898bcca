use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let status = dir.path().join("pi_battery");
    fs::write(&status, "").unwrap();
    let toml = format!(
        "[sensor]\nsettle_ms = 0\n\n[sampling]\nperiod_ms = 10\n\n[status]\nfile = '{}'\n\n[calibration]\nfile = '{}'\n",
        status.display(),
        dir.path().join("calibration_data").display()
    );
    let path = dir.path().join("batmon.toml");
    fs::write(&path, toml).unwrap();
    path
}

/// Every tick prints one JSON object with the full battery state.
#[rstest]
fn jsonl_state_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("batmon")
        .unwrap()
        .env_remove("BATMON_SIM_FAIL")
        .env_remove("BATMON_SIM_BUS_MV")
        .env_remove("BATMON_SIM_SHUNT_MV")
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--ticks", "3"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);

    for (i, v) in lines.iter().enumerate() {
        assert_eq!(v["tick"], (i + 1) as u64);
        for key in [
            "ts",
            "bus_voltage_mv",
            "bus_voltage_avg_mv",
            "shunt_voltage_mv",
            "current_a",
            "power_w",
            "soc_pct",
            "charge_full_uah",
            "charge_now_uah",
            "current_now_ua",
            "battery_remain_sec",
        ] {
            assert!(v.get(key).is_some(), "missing {key} in {v}");
        }
        assert_eq!(v["status"], "Discharging");
        assert_eq!(v["soc_pct"], 82);
        assert_eq!(v["published"], true);
    }
}

/// With --json, failures are reported as a JSON object on stdout.
#[rstest]
#[case(&["self-check"], "Timeout", 3)]
#[case(&["run", "--once"], "Hardware", 3)]
fn jsonl_error_schema(#[case] args: &[&str], #[case] reason: &str, #[case] code: i32) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("batmon")
        .unwrap()
        .env("BATMON_SIM_FAIL", "1")
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(args)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(code));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let last = stdout.lines().last().expect("an error line");
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], reason);
    assert_eq!(v["exit_code"], code);
    assert!(v["message"].as_str().unwrap().starts_with("What happened:"));
}
