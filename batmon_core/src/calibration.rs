//! Dynamic full-capacity calibration.
//!
//! The learned capacity only moves down: when the pack sits near its full
//! voltage but the voltage model says it holds less than the learned full
//! charge, the capacity is pulled 5% of the way toward that observation.
//! Updates are rate limited to one per `interval_s` and persisted through a
//! `CalibrationStore`.

use std::path::{Path, PathBuf};

use batmon_config::PersistedCalibration;
use tracing::{debug, info, warn};

use crate::atomic::write_atomic;
use crate::config::{BatteryCfg, CalibrationCfg};
use crate::error::{BatmonError, Result};

/// Weight of the previous capacity in the smoothing update (out of `SMOOTHING_DEN`).
const SMOOTHING_KEEP: u64 = 19;
const SMOOTHING_DEN: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationState {
    /// Learned full capacity (uAh), always > 0.
    pub dynamic_full_capacity_uah: u64,
    /// Unix seconds of the last update; 0 when never calibrated.
    pub last_calibration_time: u64,
}

impl CalibrationState {
    pub fn new(design_capacity_uah: u64) -> Self {
        Self {
            dynamic_full_capacity_uah: design_capacity_uah.max(1),
            last_calibration_time: 0,
        }
    }

    /// Merge whatever was found on disk over the design defaults.
    pub fn from_persisted(p: Option<PersistedCalibration>, design_capacity_uah: u64) -> Self {
        let mut s = Self::new(design_capacity_uah);
        if let Some(p) = p {
            if let Some(full) = p.dynamic_charge_full_uah.filter(|v| *v > 0) {
                s.dynamic_full_capacity_uah = full;
            }
            if let Some(t) = p.last_calibration_time {
                s.last_calibration_time = t;
            }
        }
        s
    }
}

/// Why a calibration attempt did or did not change the learned capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationOutcome {
    /// Less than the configured interval since the last update.
    TooSoon { elapsed_s: u64 },
    /// Raw bus voltage below the full-charge window.
    BelowFullWindow { voltage_mv: u32, floor_mv: u64 },
    /// Observed charge is not lower than the learned capacity.
    NotLower { charge_now_uah: u64, full_uah: u64 },
    Updated {
        previous_uah: u64,
        new_uah: u64,
        persisted: bool,
    },
}

impl CalibrationOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Persistence seam for `CalibrationState`.
pub trait CalibrationStore {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&mut self) -> Result<Option<PersistedCalibration>>;
    fn save(&mut self, state: &CalibrationState) -> Result<()>;
}

impl<T: CalibrationStore + ?Sized> CalibrationStore for Box<T> {
    fn load(&mut self) -> Result<Option<PersistedCalibration>> {
        (**self).load()
    }
    fn save(&mut self, state: &CalibrationState) -> Result<()> {
        (**self).save(state)
    }
}

/// `KEY=value` file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileCalibrationStore {
    path: PathBuf,
}

impl FileCalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalibrationStore for FileCalibrationStore {
    fn load(&mut self) -> Result<Option<PersistedCalibration>> {
        batmon_config::load_calibration_file(&self.path)
    }

    fn save(&mut self, state: &CalibrationState) -> Result<()> {
        let body = batmon_config::render_calibration(
            state.dynamic_full_capacity_uah,
            state.last_calibration_time,
        );
        write_atomic(&self.path, body.as_bytes()).map_err(|e| {
            eyre::Report::new(BatmonError::Persistence(format!(
                "write {:?}: {e}",
                self.path
            )))
        })
    }
}

/// Keeps the last saved state in memory. Used when no calibration file is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryCalibrationStore {
    saved: Option<CalibrationState>,
}

impl MemoryCalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: CalibrationState) -> Self {
        Self { saved: Some(state) }
    }

    pub fn saved(&self) -> Option<CalibrationState> {
        self.saved
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn load(&mut self) -> Result<Option<PersistedCalibration>> {
        Ok(self.saved.map(|s| PersistedCalibration {
            dynamic_charge_full_uah: Some(s.dynamic_full_capacity_uah),
            last_calibration_time: Some(s.last_calibration_time),
        }))
    }

    fn save(&mut self, state: &CalibrationState) -> Result<()> {
        self.saved = Some(*state);
        Ok(())
    }
}

/// Owns `CalibrationState` and its store; the only place the state is mutated.
pub struct CalibrationController {
    interval_s: u64,
    floor_mv: u64,
    state: CalibrationState,
    store: Box<dyn CalibrationStore + Send>,
}

impl core::fmt::Debug for CalibrationController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CalibrationController")
            .field("interval_s", &self.interval_s)
            .field("floor_mv", &self.floor_mv)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CalibrationController {
    /// Load persisted state, falling back to the design capacity when the
    /// store is empty or unreadable.
    pub fn new(
        battery: &BatteryCfg,
        cfg: &CalibrationCfg,
        mut store: Box<dyn CalibrationStore + Send>,
    ) -> Self {
        let design = battery.design_capacity_uah();
        let persisted = match store.load() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to load calibration; using design capacity");
                None
            }
        };
        let state = CalibrationState::from_persisted(persisted, design);
        debug!(
            full_uah = state.dynamic_full_capacity_uah,
            last = state.last_calibration_time,
            "calibration state loaded"
        );
        Self {
            interval_s: cfg.interval_s,
            floor_mv: battery.calibration_floor_mv(),
            state,
            store,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn full_capacity_uah(&self) -> u64 {
        self.state.dynamic_full_capacity_uah
    }

    /// Run the three guards and, if they all pass, smooth the capacity toward
    /// `charge_now_uah` and persist. A failed save is logged; the in-memory
    /// update stands.
    pub fn maybe_calibrate(
        &mut self,
        raw_voltage_mv: u32,
        charge_now_uah: u64,
        now: u64,
    ) -> CalibrationOutcome {
        let last = self.state.last_calibration_time;
        // A clock behind the last calibration counts as too soon.
        if now < last || now - last < self.interval_s {
            return CalibrationOutcome::TooSoon {
                elapsed_s: now.saturating_sub(last),
            };
        }
        if u64::from(raw_voltage_mv) < self.floor_mv {
            return CalibrationOutcome::BelowFullWindow {
                voltage_mv: raw_voltage_mv,
                floor_mv: self.floor_mv,
            };
        }
        let previous = self.state.dynamic_full_capacity_uah;
        if charge_now_uah >= previous {
            return CalibrationOutcome::NotLower {
                charge_now_uah,
                full_uah: previous,
            };
        }

        let new = previous
            .saturating_mul(SMOOTHING_KEEP)
            .saturating_add(charge_now_uah)
            / SMOOTHING_DEN;
        self.state = CalibrationState {
            dynamic_full_capacity_uah: new.max(1),
            last_calibration_time: now,
        };

        let persisted = match self.store.save(&self.state) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to persist calibration");
                false
            }
        };
        info!(
            previous_uah = previous,
            new_uah = self.state.dynamic_full_capacity_uah,
            charge_now_uah,
            raw_voltage_mv,
            "full capacity recalibrated"
        );
        CalibrationOutcome::Updated {
            previous_uah: previous,
            new_uah: self.state.dynamic_full_capacity_uah,
            persisted,
        }
    }
}
