//! Per-tick orchestration of averaging, SoC, calibration and status.

use std::marker::PhantomData;

use batmon_traits::{Clock, SystemClock};
use tracing::debug;

use crate::average::RollingAverage;
use crate::calibration::{
    CalibrationController, CalibrationOutcome, CalibrationState, CalibrationStore,
    MemoryCalibrationStore,
};
use crate::config::EstimatorCfg;
use crate::decode::Sample;
use crate::error::{BuildError, Result};
use crate::numeric::{round_to_u64, saturate_u32, trunc_to_u64};
use crate::projection::{ChargeReading, remaining_secs};
use crate::soc::soc_percent;
use crate::state::BatteryState;
use crate::status::ChargeStatus;
use crate::util::UA_PER_A;

/// Turns decoded samples into `BatteryState`s.
///
/// Owns the four signal histories and the calibration controller, so all
/// mutation happens through `&mut self` on a single thread.
pub struct BatteryEstimator {
    cfg: EstimatorCfg,
    bus_voltage: RollingAverage,
    shunt_voltage: RollingAverage,
    current: RollingAverage,
    power: RollingAverage,
    calibration: CalibrationController,
    clock: Box<dyn Clock + Send + Sync>,
    last_outcome: Option<CalibrationOutcome>,
}

impl core::fmt::Debug for BatteryEstimator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BatteryEstimator")
            .field("cfg", &self.cfg)
            .field("samples", &self.bus_voltage.len())
            .field("calibration", &self.calibration)
            .field("last_outcome", &self.last_outcome)
            .finish_non_exhaustive()
    }
}

impl BatteryEstimator {
    pub fn builder() -> EstimatorBuilder<Missing> {
        EstimatorBuilder::default()
    }

    /// Compute the state for `sample` at the injected clock's current time.
    pub fn step(&mut self, sample: Sample) -> BatteryState {
        let now = self.clock.unix_secs();
        self.step_at(sample, now)
    }

    /// Same as `step` with an explicit unix timestamp.
    pub fn step_at(&mut self, sample: Sample, now: u64) -> BatteryState {
        let bus_avg = self.bus_voltage.add(f64::from(sample.bus_voltage_mv));
        let shunt_avg = self.shunt_voltage.add(sample.shunt_voltage_mv.abs());
        let current_avg = self.current.add(sample.current_a.abs());
        let power_avg = self.power.add(sample.power_w);

        let bus_voltage_avg_mv = saturate_u32(round_to_u64(bus_avg));
        let soc_pct = soc_percent(bus_voltage_avg_mv, &self.cfg.battery);

        // Reported for this tick even if calibration lowers it below.
        let charge_full_uah = self.calibration.full_capacity_uah();
        let charge_now_uah = charge_full_uah.saturating_mul(u64::from(soc_pct)) / 100;
        let current_now_ua = trunc_to_u64(sample.current_a.abs() * UA_PER_A);
        let current_now_avg_ua = trunc_to_u64(current_avg * UA_PER_A);

        let outcome =
            self.calibration
                .maybe_calibrate(sample.bus_voltage_mv, charge_now_uah, now);
        self.last_outcome = Some(outcome);

        let mut reading = ChargeReading {
            soc_pct,
            charge_full_uah,
            charge_now_uah,
            current_now_ua,
            status: ChargeStatus::classify(sample.shunt_voltage_mv, &self.cfg.status),
        };
        let clamped = reading.apply_full_clamp(
            self.cfg.battery.full_clamp_pct,
            self.cfg.status.full_current_ua,
        );

        let battery_remain_sec = remaining_secs(
            reading.status,
            reading.charge_now_uah,
            reading.charge_full_uah,
            current_now_avg_ua,
        );

        debug!(
            now,
            bus_mv = sample.bus_voltage_mv,
            bus_avg_mv = bus_voltage_avg_mv,
            shunt_mv = sample.shunt_voltage_mv,
            soc = reading.soc_pct,
            charge_now_uah = reading.charge_now_uah,
            current_avg_ua = current_now_avg_ua,
            status = reading.status.as_str(),
            clamped,
            remain_s = battery_remain_sec,
            "tick"
        );

        BatteryState {
            bus_voltage_mv: sample.bus_voltage_mv,
            bus_voltage_avg_mv,
            shunt_voltage_mv: sample.shunt_voltage_mv,
            shunt_voltage_avg_mv: shunt_avg,
            current_a: sample.current_a,
            current_avg_a: current_avg,
            power_w: sample.power_w,
            power_avg_w: power_avg,
            soc_pct: reading.soc_pct,
            charge_full_uah: reading.charge_full_uah,
            charge_now_uah: reading.charge_now_uah,
            current_now_ua: reading.current_now_ua,
            current_now_avg_ua,
            status: reading.status,
            battery_remain_sec,
        }
    }

    pub fn config(&self) -> &EstimatorCfg {
        &self.cfg
    }

    pub fn clock(&self) -> &(dyn Clock + Send + Sync) {
        self.clock.as_ref()
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.calibration.state()
    }

    /// Outcome of the calibration attempt made by the most recent step.
    pub fn last_calibration(&self) -> Option<CalibrationOutcome> {
        self.last_outcome
    }

    /// Number of samples retained in the history buffers.
    pub fn history_len(&self) -> usize {
        self.bus_voltage.len()
    }
}

// Type-state markers for the builder
pub struct Missing;
pub struct Set;

/// Builder for `BatteryEstimator`. The configuration is required; the
/// calibration store defaults to in-memory and the clock to `SystemClock`.
pub struct EstimatorBuilder<C> {
    cfg: Option<EstimatorCfg>,
    store: Option<Box<dyn CalibrationStore + Send>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _c: PhantomData<C>,
}

impl Default for EstimatorBuilder<Missing> {
    fn default() -> Self {
        Self {
            cfg: None,
            store: None,
            clock: None,
            _c: PhantomData,
        }
    }
}

impl EstimatorBuilder<Missing> {
    pub fn with_config(self, cfg: EstimatorCfg) -> EstimatorBuilder<Set> {
        EstimatorBuilder {
            cfg: Some(cfg),
            store: self.store,
            clock: self.clock,
            _c: PhantomData,
        }
    }
}

impl<C> EstimatorBuilder<C> {
    pub fn with_store(mut self, store: impl CalibrationStore + Send + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<BatteryEstimator> {
        let EstimatorBuilder {
            cfg,
            store,
            clock,
            _c: _,
        } = self;

        let cfg = cfg.ok_or_else(|| eyre::Report::new(BuildError::MissingConfig))?;
        validate(&cfg).map_err(eyre::Report::new)?;

        let store = store.unwrap_or_else(|| Box::new(MemoryCalibrationStore::new()));
        let clock = clock.unwrap_or_else(|| Box::new(SystemClock::new()));
        let calibration = CalibrationController::new(&cfg.battery, &cfg.calibration, store);

        Ok(BatteryEstimator {
            bus_voltage: RollingAverage::from_cfg(&cfg.averaging),
            shunt_voltage: RollingAverage::from_cfg(&cfg.averaging),
            current: RollingAverage::from_cfg(&cfg.averaging),
            power: RollingAverage::from_cfg(&cfg.averaging),
            calibration,
            clock,
            last_outcome: None,
            cfg,
        })
    }
}

impl EstimatorBuilder<Set> {
    pub fn build(self) -> Result<BatteryEstimator> {
        self.try_build()
    }
}

fn validate(cfg: &EstimatorCfg) -> std::result::Result<(), BuildError> {
    let b = &cfg.battery;
    if b.cells == 0 {
        return Err(BuildError::InvalidConfig("cells must be >= 1"));
    }
    if b.cell_capacity_mah == 0 {
        return Err(BuildError::InvalidConfig("cell capacity must be > 0"));
    }
    if b.cell_voltage_low_mv == 0 || b.cell_voltage_high_mv <= b.cell_voltage_low_mv {
        return Err(BuildError::InvalidConfig(
            "cell voltages must satisfy high > low > 0",
        ));
    }
    if b.full_clamp_pct > 100 {
        return Err(BuildError::InvalidConfig("full clamp percent out of range"));
    }
    if cfg.averaging.window == 0 {
        return Err(BuildError::InvalidConfig("averaging window must be >= 1"));
    }
    if cfg.averaging.max_history < cfg.averaging.window {
        return Err(BuildError::InvalidConfig(
            "max history must be >= averaging window",
        ));
    }
    let s = &cfg.status;
    if !s.discharge_threshold_mv.is_finite()
        || !s.charge_threshold_mv.is_finite()
        || s.discharge_threshold_mv > s.charge_threshold_mv
    {
        return Err(BuildError::InvalidConfig(
            "status thresholds must be finite with discharge <= charge",
        ));
    }
    Ok(())
}
