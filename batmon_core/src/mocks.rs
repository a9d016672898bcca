//! Test and helper mocks for batmon_core

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use batmon_config::PersistedCalibration;
use batmon_traits::{PowerSensor, RawRegisters};

use crate::calibration::{CalibrationState, CalibrationStore};
use crate::error::{BatmonError, Result};
use crate::power_supply::{StatusBlock, StatusSink};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Sensor that replays a fixed script; `None` entries fail the read.
/// Once the script is exhausted every read fails.
#[derive(Debug, Default)]
pub struct ScriptedSensor {
    script: VecDeque<Option<RawRegisters>>,
    fail_configure: bool,
    dropped: Arc<AtomicBool>,
}

impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Option<RawRegisters>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fail_configure: false,
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Same register words on every read, `n` times.
    pub fn repeating(raw: RawRegisters, n: usize) -> Self {
        Self::new(std::iter::repeat_n(Some(raw), n))
    }

    pub fn failing_configure(mut self) -> Self {
        self.fail_configure = true;
        self
    }

    /// Set once this sensor has been dropped.
    pub fn drop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.dropped)
    }
}

impl PowerSensor for ScriptedSensor {
    fn configure(&mut self) -> std::result::Result<(), BoxError> {
        if self.fail_configure {
            return Err("nack on address 0x41".into());
        }
        Ok(())
    }

    fn read_registers(&mut self) -> std::result::Result<RawRegisters, BoxError> {
        match self.script.pop_front() {
            Some(Some(raw)) => Ok(raw),
            Some(None) => Err("i2c read timeout".into()),
            None => Err("script exhausted".into()),
        }
    }
}

impl Drop for ScriptedSensor {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

/// Store whose load and save always fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingCalibrationStore;

impl CalibrationStore for FailingCalibrationStore {
    fn load(&mut self) -> Result<Option<PersistedCalibration>> {
        Err(eyre::Report::new(BatmonError::Persistence(
            "calibration store unavailable".into(),
        )))
    }

    fn save(&mut self, _state: &CalibrationState) -> Result<()> {
        Err(eyre::Report::new(BatmonError::Persistence(
            "read-only filesystem".into(),
        )))
    }
}

/// Collects published blocks; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemoryStatusSink {
    blocks: Arc<std::sync::Mutex<Vec<StatusBlock>>>,
}

impl MemoryStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> Vec<StatusBlock> {
        self.blocks
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }
}

impl StatusSink for MemoryStatusSink {
    fn publish(&mut self, block: &StatusBlock) -> Result<()> {
        let mut guard = self
            .blocks
            .lock()
            .map_err(|_| eyre::eyre!("status sink poisoned"))?;
        guard.push(*block);
        Ok(())
    }
}

/// Sink that rejects every block.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStatusSink;

impl StatusSink for FailingStatusSink {
    fn publish(&mut self, _block: &StatusBlock) -> Result<()> {
        Err(eyre::Report::new(BatmonError::Io(
            "status device not present".into(),
        )))
    }
}
