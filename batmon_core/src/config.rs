//! Configuration types for the estimation engine.
//!
//! These are the runtime structs consumed by `BatteryEstimator`. They are
//! separate from the TOML-deserialized config in `batmon_config`; see
//! `conversions` for the mapping.

use crate::util::UAH_PER_MAH;

/// Pack description and the linear voltage model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryCfg {
    /// Cells in series.
    pub cells: u32,
    /// Nominal capacity per cell (mAh).
    pub cell_capacity_mah: u32,
    /// Per-cell voltage mapped to 100% (mV).
    pub cell_voltage_high_mv: u32,
    /// Per-cell voltage mapped to 0% (mV).
    pub cell_voltage_low_mv: u32,
    /// SoC at or above which a non-discharging pack is reported as full.
    pub full_clamp_pct: u8,
    /// Per-cell band below full voltage in which recalibration is allowed (mV).
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

impl BatteryCfg {
    /// Pack voltage treated as full (mV).
    #[inline]
    pub fn full_mv(&self) -> u64 {
        u64::from(self.cells) * u64::from(self.cell_voltage_high_mv)
    }

    /// Pack voltage treated as empty (mV).
    #[inline]
    pub fn empty_mv(&self) -> u64 {
        u64::from(self.cells) * u64::from(self.cell_voltage_low_mv)
    }

    #[inline]
    pub fn hysteresis_mv(&self) -> u64 {
        u64::from(self.cells) * u64::from(self.hysteresis_mv_per_cell)
    }

    /// Lowest raw bus voltage at which calibration may fire (mV).
    #[inline]
    pub fn calibration_floor_mv(&self) -> u64 {
        self.full_mv().saturating_sub(self.hysteresis_mv())
    }

    /// Nominal design capacity of the pack (uAh).
    #[inline]
    pub fn design_capacity_uah(&self) -> u64 {
        u64::from(self.cells) * u64::from(self.cell_capacity_mah) * UAH_PER_MAH
    }
}

/// Moving-average configuration shared by all tracked signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AveragingCfg {
    /// Samples needed before the average replaces the raw value.
    pub window: usize,
    /// Ring buffer capacity.
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

/// Thresholds for status classification and the near-full clamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusCfg {
    /// Raw shunt voltage strictly below this is Discharging (mV).
    pub discharge_threshold_mv: f64,
    /// Raw shunt voltage strictly above this is Charging (mV).
    pub charge_threshold_mv: f64,
    /// `current_now` reported while clamped to full (uA).
    pub full_current_ua: u64,
}

impl Default for StatusCfg {
    fn default() -> Self {
        Self {
            discharge_threshold_mv: -3.0,
            charge_threshold_mv: 0.2,
            full_current_ua: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationCfg {
    /// Minimum seconds between two recalibrations.
    pub interval_s: u64,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self { interval_s: 3600 }
    }
}

/// Everything `BatteryEstimator` needs, built once at start-up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimatorCfg {
    pub battery: BatteryCfg,
    pub averaging: AveragingCfg,
    pub status: StatusCfg,
    pub calibration: CalibrationCfg,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_voltages_for_default_pack() {
        let b = BatteryCfg::default();
        assert_eq!(b.full_mv(), 12_384);
        assert_eq!(b.empty_mv(), 9_300);
        assert_eq!(b.hysteresis_mv(), 150);
        assert_eq!(b.calibration_floor_mv(), 12_234);
        assert_eq!(b.design_capacity_uah(), 7_800_000);
    }
}
