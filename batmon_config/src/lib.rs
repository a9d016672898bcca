#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and calibration-file codec for the battery monitor.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section is optional; defaults describe a 3S Li-ion pack behind an
//!   INA219 at 0x41 on I2C bus 2.
//! - The calibration file is a tiny `KEY=value` document. The parser is
//!   line-tolerant: junk lines are skipped instead of failing the whole load.
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CALIBRATION_FILE: &str = "/var/lib/batmon/calibration_data";
pub const DEFAULT_STATUS_FILE: &str = "/dev/pi_battery";

/// Key under which the learned full capacity (uAh) is persisted.
pub const KEY_DYNAMIC_CHARGE_FULL: &str = "DYNAMIC_CHARGE_FULL";
/// Key under which the unix time of the last calibration is persisted.
pub const KEY_LAST_CALIBRATION_TIME: &str = "LAST_CALIBRATION_TIME";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BatteryCfg {
    /// Cells in series
    pub cells: u32,
    pub cell_capacity_mah: u32,
    /// Per-cell voltage treated as 100%
    pub cell_voltage_high_mv: u32,
    /// Per-cell voltage treated as 0%
    pub cell_voltage_low_mv: u32,
    /// Snap to 100% at or above this SoC while not discharging
    pub full_clamp_pct: u8,
    /// Per-cell band below full voltage in which calibration may run
    pub hysteresis_mv_per_cell: u32,
}

impl Default for BatteryCfg {
    fn default() -> Self {
        Self {
            cells: 3,
            cell_capacity_mah: 2600,
            cell_voltage_high_mv: 4128,
            cell_voltage_low_mv: 3100,
            full_clamp_pct: 99,
            hysteresis_mv_per_cell: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorCfg {
    pub i2c_bus: u8,
    /// 7-bit slave address. TOML accepts hex literals (`0x41`).
    pub address: u16,
    /// Value written to the INA219 calibration register
    pub calibration: u16,
    pub current_lsb_ma: f64,
    pub power_lsb_w: f64,
    /// Delay after configuring the sensor before the first read (ms)
    pub settle_ms: u64,
    /// Extra attempts on a failed register read
    pub read_retries: u8,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            i2c_bus: 2,
            address: 0x41,
            calibration: 26868,
            current_lsb_ma: 0.1524,
            power_lsb_w: 0.003048,
            settle_ms: 1000,
            read_retries: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AveragingCfg {
    /// Samples required before the average replaces the raw value
    pub window: usize,
    /// Ring buffer capacity per signal
    pub max_history: usize,
}

impl Default for AveragingCfg {
    fn default() -> Self {
        Self {
            window: 20,
            max_history: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplingCfg {
    pub period_ms: u64,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self { period_ms: 2000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Minimum seconds between two capacity recalibrations
    pub interval_s: u64,
    pub file: PathBuf,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            interval_s: 3600,
            file: PathBuf::from(DEFAULT_CALIBRATION_FILE),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StatusCfg {
    /// Shunt voltage (mV) below which the pack is discharging
    pub discharge_threshold_mv: f64,
    /// Shunt voltage (mV) above which the pack is charging
    pub charge_threshold_mv: f64,
    /// current_now reported while clamped to full (uA)
    pub full_current_ua: u64,
    pub file: PathBuf,
}

impl Default for StatusCfg {
    fn default() -> Self {
        Self {
            discharge_threshold_mv: -3.0,
            charge_threshold_mv: 0.2,
            full_current_ua: 1000,
            file: PathBuf::from(DEFAULT_STATUS_FILE),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub battery: BatteryCfg,
    pub sensor: SensorCfg,
    pub averaging: AveragingCfg,
    pub sampling: SamplingCfg,
    pub calibration: CalibrationCfg,
    pub status: StatusCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Battery
        let b = &self.battery;
        if b.cells == 0 {
            eyre::bail!("battery.cells must be >= 1");
        }
        if b.cells > 16 {
            eyre::bail!("battery.cells is unreasonably large (>16)");
        }
        if b.cell_capacity_mah == 0 {
            eyre::bail!("battery.cell_capacity_mah must be > 0");
        }
        if b.cell_voltage_low_mv == 0 {
            eyre::bail!("battery.cell_voltage_low_mv must be > 0");
        }
        if b.cell_voltage_high_mv <= b.cell_voltage_low_mv {
            eyre::bail!("battery.cell_voltage_high_mv must be > battery.cell_voltage_low_mv");
        }
        if b.full_clamp_pct > 100 {
            eyre::bail!("battery.full_clamp_pct must be in [0, 100]");
        }
        if b.hysteresis_mv_per_cell >= b.cell_voltage_high_mv {
            eyre::bail!("battery.hysteresis_mv_per_cell must be < battery.cell_voltage_high_mv");
        }

        // Sensor
        if self.sensor.address > 0x7F {
            eyre::bail!("sensor.address must be a 7-bit address (<= 0x7F)");
        }
        if !(self.sensor.current_lsb_ma.is_finite() && self.sensor.current_lsb_ma > 0.0) {
            eyre::bail!("sensor.current_lsb_ma must be > 0");
        }
        if !(self.sensor.power_lsb_w.is_finite() && self.sensor.power_lsb_w > 0.0) {
            eyre::bail!("sensor.power_lsb_w must be > 0");
        }
        if self.sensor.settle_ms > 60_000 {
            eyre::bail!("sensor.settle_ms is unreasonably large (>60s)");
        }

        // Averaging
        if self.averaging.window == 0 {
            eyre::bail!("averaging.window must be >= 1");
        }
        if self.averaging.max_history < self.averaging.window {
            eyre::bail!("averaging.max_history must be >= averaging.window");
        }
        if self.averaging.max_history > 100_000 {
            eyre::bail!("averaging.max_history is unreasonably large (>100000)");
        }

        // Sampling
        if self.sampling.period_ms == 0 {
            eyre::bail!("sampling.period_ms must be >= 1");
        }

        // Status thresholds
        let s = &self.status;
        if !s.discharge_threshold_mv.is_finite() || !s.charge_threshold_mv.is_finite() {
            eyre::bail!("status thresholds must be finite numbers");
        }
        if s.discharge_threshold_mv > s.charge_threshold_mv {
            eyre::bail!("status.discharge_threshold_mv must be <= status.charge_threshold_mv");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}

/// Calibration state as found on disk. Either field may be missing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistedCalibration {
    /// Learned full capacity in uAh
    pub dynamic_charge_full_uah: Option<u64>,
    /// Unix seconds of the last recalibration
    pub last_calibration_time: Option<u64>,
}

/// Parse calibration file contents.
///
/// Blank lines and `#` comments are skipped. Lines that are not `KEY=integer`
/// for a known key are ignored one by one; the rest of the file still loads.
/// A zero capacity is treated as absent.
pub fn parse_calibration(text: &str) -> PersistedCalibration {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'=')
        .comment(Some(b'#'))
        .quoting(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut out = PersistedCalibration::default();
    for rec in rdr.records() {
        let Ok(record) = rec else { continue };
        if record.len() != 2 {
            continue;
        }
        let (key, value) = (&record[0], &record[1]);
        let Ok(v) = value.parse::<u64>() else {
            continue;
        };
        match key {
            KEY_DYNAMIC_CHARGE_FULL if v > 0 => out.dynamic_charge_full_uah = Some(v),
            KEY_LAST_CALIBRATION_TIME => out.last_calibration_time = Some(v),
            _ => {}
        }
    }
    out
}

/// Render the calibration file body for the given values.
pub fn render_calibration(dynamic_charge_full_uah: u64, last_calibration_time: u64) -> String {
    format!(
        "{KEY_DYNAMIC_CHARGE_FULL}={dynamic_charge_full_uah}\n{KEY_LAST_CALIBRATION_TIME}={last_calibration_time}\n"
    )
}

/// Load the calibration file. A missing file yields `Ok(None)`.
pub fn load_calibration_file(path: &Path) -> eyre::Result<Option<PersistedCalibration>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(parse_calibration(&String::from_utf8_lossy(&bytes)))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(eyre::eyre!("read calibration file {:?}: {}", path, e)),
    }
}
