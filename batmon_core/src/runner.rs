//! Fixed-period tick loop: read, decode, estimate, publish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use batmon_traits::{Clock, PowerSensor, RawRegisters};
use eyre::WrapErr;
use tracing::{info, warn};

use crate::calibration::CalibrationOutcome;
use crate::decode::{Sample, Scaling, decode};
use crate::error::Result;
use crate::estimator::BatteryEstimator;
use crate::hw_error::map_hw_error;
use crate::power_supply::{StatusBlock, StatusSink};
use crate::state::BatteryState;

/// Upper bound on a single sleep so shutdown is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    /// Time between tick starts.
    pub period: Duration,
    /// Wait after configuring the sensor before the first read.
    pub settle: Duration,
    /// Stop after this many read attempts; `None` runs until shutdown.
    pub max_ticks: Option<u64>,
    pub scaling: Scaling,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(2),
            settle: Duration::from_secs(1),
            max_ticks: None,
            scaling: Scaling::default(),
        }
    }
}

/// One produced tick, handed to the observer.
#[derive(Debug)]
pub struct Tick<'a> {
    /// 1-based count of produced ticks.
    pub index: u64,
    pub unix_secs: u64,
    pub raw: RawRegisters,
    pub sample: Sample,
    pub state: &'a BatteryState,
    pub block: &'a StatusBlock,
    pub calibration: Option<CalibrationOutcome>,
    pub published: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Read attempts, including skipped ones.
    pub attempts: u64,
    /// Ticks that produced a state.
    pub ticks: u64,
    pub skipped_reads: u64,
    pub failed_writes: u64,
}

/// Drive `estimator` from `sensor` until `shutdown` is set or
/// `params.max_ticks` attempts have been made.
///
/// A configure failure is returned as an error. Read and publish failures are
/// logged and counted; the loop carries on. The sensor is dropped on return.
pub fn run<S, K, F>(
    mut sensor: S,
    estimator: &mut BatteryEstimator,
    sink: &mut K,
    mut observer: F,
    params: &RunParams,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    S: PowerSensor,
    K: StatusSink + ?Sized,
    F: FnMut(&Tick<'_>),
{
    sensor
        .configure()
        .map_err(|e| eyre::Report::new(map_hw_error(e.as_ref())))
        .wrap_err("configure sensor")?;
    info!(
        period_ms = u64::try_from(params.period.as_millis()).unwrap_or(u64::MAX),
        max_ticks = ?params.max_ticks,
        "sensor configured; monitoring"
    );
    sleep_unless_shutdown(estimator.clock(), params.settle, shutdown);

    let mut summary = RunSummary::default();
    while !shutdown.load(Ordering::Relaxed) {
        if params.max_ticks.is_some_and(|max| summary.attempts >= max) {
            break;
        }
        summary.attempts += 1;

        match sensor.read_registers() {
            Err(e) => {
                let err = map_hw_error(e.as_ref());
                warn!(error = %err, attempt = summary.attempts, "sensor read failed; tick skipped");
                summary.skipped_reads += 1;
            }
            Ok(raw) => {
                let sample = decode(raw, &params.scaling);
                let now = estimator.clock().unix_secs();
                let state = estimator.step_at(sample, now);
                let block = StatusBlock::from_state(&state, &estimator.config().battery);
                let published = match sink.publish(&block) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "status block not published");
                        summary.failed_writes += 1;
                        false
                    }
                };
                summary.ticks += 1;
                observer(&Tick {
                    index: summary.ticks,
                    unix_secs: now,
                    raw,
                    sample,
                    state: &state,
                    block: &block,
                    calibration: estimator.last_calibration(),
                    published,
                });
            }
        }

        if params.max_ticks.is_some_and(|max| summary.attempts >= max) {
            break;
        }
        sleep_unless_shutdown(estimator.clock(), params.period, shutdown);
    }

    info!(
        ticks = summary.ticks,
        skipped = summary.skipped_reads,
        failed_writes = summary.failed_writes,
        "monitor stopped"
    );
    Ok(summary)
}

fn sleep_unless_shutdown(clock: &(dyn Clock + Send + Sync), total: Duration, shutdown: &AtomicBool) {
    let mut left = total;
    while !left.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let step = left.min(SLEEP_SLICE);
        clock.sleep(step);
        left -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EstimatorCfg;
    use crate::mocks::{MemoryStatusSink, ScriptedSensor};
    use batmon_traits::ManualClock;

    fn raw(bus_mv: u16) -> RawRegisters {
        RawRegisters {
            bus: (bus_mv / 4) << 3,
            shunt: (-500i16) as u16,
            current: (-3281i16) as u16,
            power: 1300,
        }
    }

    #[test]
    fn stops_after_max_ticks_without_trailing_sleep() {
        let clock = ManualClock::new(1_000);
        let mut est = BatteryEstimator::builder()
            .with_config(EstimatorCfg::default())
            .with_clock(clock.clone())
            .build()
            .unwrap();
        let mut sink = MemoryStatusSink::new();
        let params = RunParams {
            max_ticks: Some(3),
            ..RunParams::default()
        };
        let stop = AtomicBool::new(false);
        let mut seen = Vec::new();
        let summary = run(
            ScriptedSensor::repeating(raw(11_800), 10),
            &mut est,
            &mut sink,
            |t| seen.push((t.index, t.unix_secs)),
            &params,
            &stop,
        )
        .unwrap();
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.attempts, 3);
        // 1 s settle then 2 s per tick
        assert_eq!(seen, vec![(1, 1_001), (2, 1_003), (3, 1_005)]);
        assert_eq!(clock.unix_secs(), 1_005);
        assert_eq!(sink.blocks().len(), 3);
    }
}
