use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::{TempDir, tempdir};

/// Config for the simulated sensor with files inside `dir`. The status file
/// is pre-created since the sink never creates its target.
fn write_valid_config(dir: &TempDir) -> PathBuf {
    let status = dir.path().join("pi_battery");
    fs::write(&status, "").unwrap();
    let toml = format!(
        r#"
[sensor]
settle_ms = 0

[sampling]
period_ms = 10

[status]
file = '{}'

[calibration]
file = '{}'
"#,
        status.display(),
        dir.path().join("calibration_data").display()
    );
    let path = dir.path().join("batmon.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn batmon() -> Command {
    let mut cmd = Command::cargo_bin("batmon").unwrap();
    for key in ["BATMON_SIM_BUS_MV", "BATMON_SIM_SHUNT_MV", "BATMON_SIM_FAIL", "RUST_LOG"] {
        cmd.env_remove(key);
    }
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--once"], 0, "82 %  Discharging", "stdout")]
#[case(&["run", "--once", "--ticks", "2"], 2, "cannot be used with", "stderr")]
#[case(&["run", "--period-ms", "0", "--once"], 2, "--period-ms must be >= 1", "stderr")]
#[case(&["frobnicate"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = batmon();
    cmd.arg("--config").arg(&cfg).args(args);

    let assert = cmd.assert().code(exit_code);
    let pred = predicate::str::contains(needle);
    if stream == "stdout" {
        assert.stdout(pred);
    } else {
        assert.stderr(pred);
    }
}

#[test]
fn run_once_writes_status_block() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    batmon()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--once"])
        .assert()
        .success();

    let block = fs::read_to_string(dir.path().join("pi_battery")).unwrap();
    assert!(block.starts_with("voltage_min_design=9300000\nvoltage_now=11800000\n"));
    assert!(block.contains("\ncharge_full_design=7800000\ncharge_full=7800000\n"));
    assert!(block.contains("\ncharge_now=6396000\ncapacity=82\ncharging=0\n"));
    // Well below the full-voltage window, so nothing was learned or saved.
    assert!(!dir.path().join("calibration_data").exists());
}

#[test]
fn charging_pack_sets_charging_flag() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    batmon()
        .env("BATMON_SIM_SHUNT_MV", "2.0")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--once"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Charging"));

    let block = fs::read_to_string(dir.path().join("pi_battery")).unwrap();
    assert!(block.ends_with("charging=1\n"));
}

#[test]
fn missing_status_target_is_not_fatal() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let missing = dir.path().join("no_such_device");

    batmon()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--once", "--debug", "--status-file"])
        .arg(&missing)
        .assert()
        .success()
        .stdout(predicate::str::contains("Data NOT written to"));
    assert!(!missing.exists());
}

#[test]
fn debug_block_reports_capacities() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    batmon()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--once", "--debug"])
        .assert()
        .success()
        .stdout(
            predicate::str::is_match(r"^--- \[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\] ---\n")
                .unwrap()
                .and(predicate::str::contains("Design capacity:     7800 mAh (2600 mAh * 3)"))
                .and(predicate::str::contains("Status:              Discharging"))
                .and(predicate::str::contains("Data written to")),
        );
}

#[test]
fn invalid_config_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[battery]\ncells = 0\n").unwrap();

    batmon()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("battery.cells must be >= 1"));
}

#[test]
fn self_check_decodes_one_sample() {
    batmon()
        .env("BATMON_SIM_BUS_MV", "12000")
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("OK: bus 12000 mV"));
}

#[test]
fn calibration_defaults_when_file_missing() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("calibration_data");

    batmon()
        .args(["calibration", "--file"])
        .arg(&missing)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("(defaults)")
                .and(predicate::str::contains("Learned capacity:    7800000 uAh"))
                .and(predicate::str::contains("Last calibration:    never")),
        );
}

#[test]
fn calibration_reads_persisted_state() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("calibration_data");
    fs::write(
        &file,
        "DYNAMIC_CHARGE_FULL=7000000\nLAST_CALIBRATION_TIME=1700000000\n",
    )
    .unwrap();

    batmon()
        .args(["calibration", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("(file)")
                .and(predicate::str::contains("Learned capacity:    7000000 uAh (7000 mAh)"))
                .and(predicate::str::contains("Last calibration:    1700000000")),
        );
}

#[test]
fn inspect_reports_power_supply_view() {
    let dir = tempdir().unwrap();
    let block = dir.path().join("block");
    fs::write(
        &block,
        "voltage_min_design=9300000\nvoltage_now=11800000\ncurrent_now=500024\n\
         charge_full_design=7800000\ncharge_full=7800000\ncharge_now=6396000\n\
         capacity=82\ncharging=0\n",
    )
    .unwrap();

    batmon()
        .arg("inspect")
        .arg(&block)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("status:              Discharging")
                .and(predicate::str::contains("capacity_level:      High"))
                .and(predicate::str::contains("ac_online:           0")),
        );
}

#[test]
fn inspect_rejects_malformed_block() {
    let dir = tempdir().unwrap();
    let block = dir.path().join("block");
    fs::write(&block, "capacity=82\nbogus line\n").unwrap();

    batmon()
        .arg("inspect")
        .arg(&block)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Status block rejected"));
}
