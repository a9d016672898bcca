//! `From` implementations bridging `batmon_config` types to `batmon_core` types.

use crate::config::{AveragingCfg, BatteryCfg, CalibrationCfg, EstimatorCfg, StatusCfg};
use crate::decode::Scaling;
use crate::runner::RunParams;
use std::time::Duration;

// ── BatteryCfg ───────────────────────────────────────────────────────────────

impl From<&batmon_config::BatteryCfg> for BatteryCfg {
    fn from(c: &batmon_config::BatteryCfg) -> Self {
        Self {
            cells: c.cells,
            cell_capacity_mah: c.cell_capacity_mah,
            cell_voltage_high_mv: c.cell_voltage_high_mv,
            cell_voltage_low_mv: c.cell_voltage_low_mv,
            full_clamp_pct: c.full_clamp_pct,
            hysteresis_mv_per_cell: c.hysteresis_mv_per_cell,
        }
    }
}

// ── AveragingCfg ─────────────────────────────────────────────────────────────

impl From<&batmon_config::AveragingCfg> for AveragingCfg {
    fn from(c: &batmon_config::AveragingCfg) -> Self {
        Self {
            window: c.window,
            max_history: c.max_history,
        }
    }
}

// ── StatusCfg ────────────────────────────────────────────────────────────────

impl From<&batmon_config::StatusCfg> for StatusCfg {
    fn from(c: &batmon_config::StatusCfg) -> Self {
        Self {
            discharge_threshold_mv: c.discharge_threshold_mv,
            charge_threshold_mv: c.charge_threshold_mv,
            full_current_ua: c.full_current_ua,
        }
    }
}

// ── CalibrationCfg ───────────────────────────────────────────────────────────

impl From<&batmon_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &batmon_config::CalibrationCfg) -> Self {
        Self {
            interval_s: c.interval_s,
        }
    }
}

// ── Scaling ──────────────────────────────────────────────────────────────────

impl From<&batmon_config::SensorCfg> for Scaling {
    fn from(c: &batmon_config::SensorCfg) -> Self {
        Self {
            current_lsb_ma: c.current_lsb_ma,
            power_lsb_w: c.power_lsb_w,
        }
    }
}

// ── EstimatorCfg ─────────────────────────────────────────────────────────────

impl From<&batmon_config::Config> for EstimatorCfg {
    fn from(c: &batmon_config::Config) -> Self {
        Self {
            battery: (&c.battery).into(),
            averaging: (&c.averaging).into(),
            status: (&c.status).into(),
            calibration: (&c.calibration).into(),
        }
    }
}

// ── RunParams ────────────────────────────────────────────────────────────────

impl From<&batmon_config::Config> for RunParams {
    fn from(c: &batmon_config::Config) -> Self {
        Self {
            period: Duration::from_millis(c.sampling.period_ms),
            settle: Duration::from_millis(c.sensor.settle_ms),
            max_ticks: None,
            scaling: (&c.sensor).into(),
        }
    }
}
