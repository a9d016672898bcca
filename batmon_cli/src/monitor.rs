//! Hardware assembly and the subcommands built on it.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use batmon_config::Config;
use batmon_core::calibration::CalibrationState;
use batmon_core::error::{BatmonError, Result};
use batmon_core::hw_error::map_hw_error;
use batmon_core::runner::{self, RunParams, RunSummary};
use batmon_core::util::UAH_PER_MAH;
use batmon_core::{
    BatteryCfg, BatteryEstimator, EstimatorCfg, FileCalibrationStore, FileStatusSink,
    PowerSupplyView, Scaling, decode,
};
use batmon_traits::PowerSensor;
use eyre::WrapErr;
use serde_json::json;

use crate::report::{render_debug, state_json, state_line};

/// Options of the `run` subcommand after parsing.
#[derive(Debug, Clone, Default)]
pub struct RunOpts {
    pub once: bool,
    pub ticks: Option<u64>,
    pub debug: bool,
    pub period_ms: Option<u64>,
    pub status_file: Option<PathBuf>,
    pub calibration_file: Option<PathBuf>,
}

/// Environment knobs for the simulated sensor.
pub const SIM_BUS_MV_ENV: &str = "BATMON_SIM_BUS_MV";
pub const SIM_SHUNT_MV_ENV: &str = "BATMON_SIM_SHUNT_MV";
pub const SIM_FAIL_ENV: &str = "BATMON_SIM_FAIL";

fn config_err(msg: impl Into<String>) -> eyre::Report {
    eyre::Report::new(BatmonError::Config(msg.into()))
}

/// Open the INA219 on the configured bus.
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open_sensor(cfg: &Config) -> Result<Box<dyn PowerSensor + Send>> {
    let s = &cfg.sensor;
    let sensor = batmon_hardware::HardwareSensor::open(
        s.i2c_bus,
        s.address,
        s.calibration,
        s.read_retries,
    )
    .map_err(|e| eyre::Report::new(map_hw_error(&e)))
    .wrap_err_with(|| format!("open INA219 on /dev/i2c-{} at {:#04x}", s.i2c_bus, s.address))?;
    tracing::info!(bus = s.i2c_bus, address = s.address, "INA219 opened");
    Ok(Box::new(sensor))
}

/// Simulated INA219, tunable through `BATMON_SIM_*`.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open_sensor(cfg: &Config) -> Result<Box<dyn PowerSensor + Send>> {
    let bus_mv = env_f64(SIM_BUS_MV_ENV)?.unwrap_or(11_800.0);
    let shunt_mv = env_f64(SIM_SHUNT_MV_ENV)?.unwrap_or(-5.0);
    let mut sensor = batmon_hardware::SimulatedSensor::new(bus_mv, shunt_mv)
        .with_lsb(cfg.sensor.current_lsb_ma, cfg.sensor.power_lsb_w);
    if std::env::var(SIM_FAIL_ENV).is_ok_and(|v| v == "1") {
        sensor = sensor.failing();
    }
    tracing::info!(bus_mv, shunt_mv, "using simulated INA219");
    Ok(Box::new(sensor))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn env_f64(key: &str) -> Result<Option<f64>> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .map(Some)
            .ok_or_else(|| config_err(format!("{key} must be a number, got {v:?}"))),
        Err(_) => Ok(None),
    }
}

/// `batmon run`
pub fn run_monitor(
    cfg: &Config,
    opts: &RunOpts,
    json_mode: bool,
    shutdown: &AtomicBool,
) -> Result<RunSummary> {
    let mut params: RunParams = cfg.into();
    if let Some(ms) = opts.period_ms {
        if ms == 0 {
            return Err(config_err("--period-ms must be >= 1"));
        }
        params.period = std::time::Duration::from_millis(ms);
    }
    params.max_ticks = if opts.once { Some(1) } else { opts.ticks };

    let cal_path = opts
        .calibration_file
        .clone()
        .unwrap_or_else(|| cfg.calibration.file.clone());
    let status_path = opts
        .status_file
        .clone()
        .unwrap_or_else(|| cfg.status.file.clone());

    let est_cfg: EstimatorCfg = cfg.into();
    let mut estimator = BatteryEstimator::builder()
        .with_config(est_cfg)
        .with_store(FileCalibrationStore::new(&cal_path))
        .build()?;
    let battery = estimator.config().battery.clone();

    let sensor = open_sensor(cfg)?;
    let mut sink = FileStatusSink::new(&status_path);
    let target = status_path.display().to_string();
    tracing::info!(
        status_file = %target,
        calibration_file = %cal_path.display(),
        full_uah = estimator.calibration_state().dynamic_full_capacity_uah,
        "monitor starting"
    );

    let summary = runner::run(
        sensor,
        &mut estimator,
        &mut sink,
        |tick| {
            if opts.debug {
                print!("{}", render_debug(tick, &battery, &target));
            }
            if json_mode {
                println!(
                    "{}",
                    state_json(tick.index, tick.unix_secs, tick.state, tick.published)
                );
            } else if !opts.debug {
                println!("{}", state_line(tick.state));
            }
        },
        &params,
        shutdown,
    )?;

    if params.max_ticks.is_some() && summary.ticks == 0 {
        return Err(eyre::Report::new(BatmonError::Hardware(format!(
            "no sample produced in {} attempt(s)",
            summary.attempts
        ))));
    }
    Ok(summary)
}

/// `batmon self-check`
pub fn self_check(cfg: &Config, json_mode: bool) -> Result<()> {
    let mut sensor = open_sensor(cfg)?;
    sensor
        .configure()
        .map_err(|e| eyre::Report::new(map_hw_error(e.as_ref())))
        .wrap_err("configure sensor")?;
    let raw = sensor
        .read_registers()
        .map_err(|e| eyre::Report::new(map_hw_error(e.as_ref())))
        .wrap_err("read sensor registers")?;
    let scaling: Scaling = (&cfg.sensor).into();
    let s = decode(raw, &scaling);
    if json_mode {
        println!(
            "{}",
            json!({
                "ok": true,
                "bus_voltage_mv": s.bus_voltage_mv,
                "shunt_voltage_mv": s.shunt_voltage_mv,
                "current_a": s.current_a,
                "power_w": s.power_w,
            })
        );
    } else {
        println!(
            "OK: bus {} mV, shunt {:.2} mV, current {:.4} A, power {:.3} W",
            s.bus_voltage_mv, s.shunt_voltage_mv, s.current_a, s.power_w
        );
    }
    Ok(())
}

/// `batmon calibration`
pub fn show_calibration(cfg: &Config, file: Option<&Path>, json_mode: bool) -> Result<()> {
    let path = file.unwrap_or(cfg.calibration.file.as_path());
    let battery: BatteryCfg = (&cfg.battery).into();
    let design = battery.design_capacity_uah();
    let (persisted, source) = match batmon_config::load_calibration_file(path) {
        Ok(Some(p)) => (Some(p), "file"),
        Ok(None) => (None, "defaults"),
        Err(e) => {
            tracing::warn!(error = %e, "calibration file unreadable; showing defaults");
            (None, "defaults")
        }
    };
    let state = CalibrationState::from_persisted(persisted, design);

    if json_mode {
        println!(
            "{}",
            json!({
                "file": path.display().to_string(),
                "source": source,
                "dynamic_charge_full_uah": state.dynamic_full_capacity_uah,
                "design_capacity_uah": design,
                "last_calibration_time": state.last_calibration_time,
            })
        );
        return Ok(());
    }
    println!("Calibration file:    {} ({source})", path.display());
    println!(
        "Learned capacity:    {} uAh ({} mAh)",
        state.dynamic_full_capacity_uah,
        state.dynamic_full_capacity_uah / UAH_PER_MAH
    );
    println!(
        "Design capacity:     {design} uAh ({} mAh)",
        design / UAH_PER_MAH
    );
    match state.last_calibration_time {
        0 => println!("Last calibration:    never"),
        t => println!("Last calibration:    {t}"),
    }
    Ok(())
}

/// `batmon inspect`
pub fn inspect(path: &Path, json_mode: bool) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read status block {}", path.display()))?;
    let mut view = PowerSupplyView::new();
    view.apply(&text)
        .map_err(eyre::Report::new)
        .wrap_err_with(|| format!("status block {} rejected", path.display()))?;
    let b = view.block();

    if json_mode {
        println!(
            "{}",
            json!({
                "status": view.supply_status().as_str(),
                "capacity_level": view.capacity_level().as_str(),
                "ac_online": view.ac_online(),
                "capacity": b.capacity_pct,
                "voltage_now": b.voltage_now_uv,
                "voltage_min_design": b.voltage_min_design_uv,
                "current_now": b.current_now_ua,
                "charge_full_design": b.charge_full_design_uah,
                "charge_full": b.charge_full_uah,
                "charge_now": b.charge_now_uah,
            })
        );
        return Ok(());
    }
    println!("status:              {}", view.supply_status());
    println!("capacity:            {} %", b.capacity_pct);
    println!("capacity_level:      {}", view.capacity_level());
    println!("ac_online:           {}", u8::from(view.ac_online()));
    println!("voltage_now:         {} uV", b.voltage_now_uv);
    println!("voltage_min_design:  {} uV", b.voltage_min_design_uv);
    println!("current_now:         {} uA", b.current_now_ua);
    println!("charge_full_design:  {} uAh", b.charge_full_design_uah);
    println!("charge_full:         {} uAh", b.charge_full_uah);
    println!("charge_now:          {} uAh", b.charge_now_uah);
    Ok(())
}
