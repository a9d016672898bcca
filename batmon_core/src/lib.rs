#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Battery-state estimation engine (hardware-agnostic).
//!
//! All sensor access goes through `batmon_traits::PowerSensor`; all wall-clock
//! access goes through `batmon_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Decoding**: INA219 register words to physical units (`decode` module)
//! - **Smoothing**: one ring-buffer moving average per signal (`average` module)
//! - **State of charge**: linear voltage model with ceiling rounding (`soc` module)
//! - **Calibration**: rate-limited, hysteresis-gated learning of full capacity (`calibration` module)
//! - **Status**: charging/discharging/full classification, near-full clamp and
//!   remaining-time projection (`status`, `projection` modules)
//! - **Orchestration**: `BatteryEstimator::step` ties the above together per tick
//! - **Output**: the power-supply status block (`power_supply` module) and the tick loop (`runner`)
//!
//! ## Units
//!
//! Voltages are carried in mV, charges in uAh and currents in uA (integers) once
//! they leave the averagers. Each conversion point uses its own rounding mode:
//! ceiling for SoC, floor for capacity math, half-to-even for the
//! averaged bus voltage and truncation for currents and remaining time.

pub mod atomic;
pub mod average;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod decode;
pub mod error;
pub mod estimator;
pub mod hw_error;
pub mod mocks;
pub mod numeric;
pub mod power_supply;
pub mod projection;
pub mod runner;
pub mod soc;
pub mod state;
pub mod status;
pub mod util;

pub use average::RollingAverage;
pub use calibration::{
    CalibrationController, CalibrationOutcome, CalibrationState, CalibrationStore,
    FileCalibrationStore, MemoryCalibrationStore,
};
pub use config::{AveragingCfg, BatteryCfg, CalibrationCfg, EstimatorCfg, StatusCfg};
pub use decode::{Sample, Scaling, decode};
pub use estimator::{BatteryEstimator, EstimatorBuilder};
pub use power_supply::{BlockError, FileStatusSink, PowerSupplyView, StatusBlock, StatusSink};
pub use runner::{RunParams, RunSummary, Tick};
pub use state::BatteryState;
pub use status::{CapacityLevel, ChargeStatus};
