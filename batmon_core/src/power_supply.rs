//! Power-supply status block.
//!
//! The daemon publishes one block per tick to the `pi_battery` character
//! device. The device accepts at most 1024 bytes in a single write; every
//! newline-terminated line must be `key=integer` with a known key. Lines are
//! applied in order and the first bad line aborts the rest of the block, with
//! earlier lines already applied. `PowerSupplyView` mirrors that receiving side
//! so blocks can be checked without the kernel module loaded.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use eyre::WrapErr;
use thiserror::Error;

use crate::config::BatteryCfg;
use crate::error::Result;
use crate::state::BatteryState;
use crate::status::{CapacityLevel, ChargeStatus};
use crate::util::UV_PER_MV;

/// Largest block the device accepts in one write.
pub const MAX_BLOCK_BYTES: usize = 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("status block is {0} bytes (limit {MAX_BLOCK_BYTES})")]
    TooLarge(usize),
    #[error("line {line}: missing '='")]
    MissingEquals { line: usize },
    #[error("line {line}: {value:?} is not an integer")]
    InvalidValue { line: usize, value: String },
    #[error("line {line}: unknown key in {text:?}")]
    UnknownKey { line: usize, text: String },
}

/// The eight values the device understands, in the order they are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusBlock {
    pub voltage_min_design_uv: i64,
    pub voltage_now_uv: i64,
    pub current_now_ua: i64,
    pub charge_full_design_uah: i64,
    pub charge_full_uah: i64,
    pub charge_now_uah: i64,
    pub capacity_pct: i64,
    pub charging: bool,
}

#[derive(Debug, Clone, Copy)]
enum Key {
    VoltageMinDesign,
    VoltageNow,
    CurrentNow,
    ChargeFullDesign,
    ChargeFull,
    ChargeNow,
    Capacity,
    Charging,
}

// Matched as line prefixes in this order; `charge_full_design` must precede `charge_full`.
const KEYS: [(&str, Key); 8] = [
    ("voltage_min_design", Key::VoltageMinDesign),
    ("voltage_now", Key::VoltageNow),
    ("current_now", Key::CurrentNow),
    ("charge_full_design", Key::ChargeFullDesign),
    ("charge_full", Key::ChargeFull),
    ("charge_now", Key::ChargeNow),
    ("capacity", Key::Capacity),
    ("charging", Key::Charging),
];

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

impl StatusBlock {
    pub fn from_state(state: &BatteryState, battery: &BatteryCfg) -> Self {
        Self {
            voltage_min_design_uv: to_i64(battery.empty_mv().saturating_mul(UV_PER_MV)),
            voltage_now_uv: to_i64(u64::from(state.bus_voltage_mv) * UV_PER_MV),
            current_now_ua: to_i64(state.current_now_ua),
            charge_full_design_uah: to_i64(battery.design_capacity_uah()),
            charge_full_uah: to_i64(state.charge_full_uah),
            charge_now_uah: to_i64(state.charge_now_uah),
            capacity_pct: i64::from(state.soc_pct),
            charging: state.is_charging(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "voltage_min_design={}\nvoltage_now={}\ncurrent_now={}\ncharge_full_design={}\n\
             charge_full={}\ncharge_now={}\ncapacity={}\ncharging={}\n",
            self.voltage_min_design_uv,
            self.voltage_now_uv,
            self.current_now_ua,
            self.charge_full_design_uah,
            self.charge_full_uah,
            self.charge_now_uah,
            self.capacity_pct,
            u8::from(self.charging),
        )
    }

    /// Parse a block the way the device does, starting from all zeros.
    /// Trailing text without a newline is ignored.
    pub fn parse(text: &str) -> std::result::Result<Self, BlockError> {
        check_size(text)?;
        let mut block = Self::default();
        for (idx, line) in terminated_lines(text) {
            block.apply_line(idx, line)?;
        }
        Ok(block)
    }

    fn apply_line(&mut self, idx: usize, line: &str) -> std::result::Result<(), BlockError> {
        let line_no = idx + 1;
        let Some((_, raw)) = line.split_once('=') else {
            return Err(BlockError::MissingEquals { line: line_no });
        };
        let raw = raw.trim_start();
        let value: i64 = raw.parse().map_err(|_| BlockError::InvalidValue {
            line: line_no,
            value: raw.to_string(),
        })?;
        let Some((_, key)) = KEYS.iter().find(|(k, _)| line.starts_with(k)) else {
            return Err(BlockError::UnknownKey {
                line: line_no,
                text: line.to_string(),
            });
        };
        match key {
            Key::VoltageMinDesign => self.voltage_min_design_uv = value,
            Key::VoltageNow => self.voltage_now_uv = value,
            Key::CurrentNow => self.current_now_ua = value,
            Key::ChargeFullDesign => self.charge_full_design_uah = value,
            Key::ChargeFull => self.charge_full_uah = value,
            Key::ChargeNow => self.charge_now_uah = value,
            Key::Capacity => self.capacity_pct = value,
            Key::Charging => self.charging = value != 0,
        }
        Ok(())
    }
}

fn check_size(text: &str) -> std::result::Result<(), BlockError> {
    if text.len() > MAX_BLOCK_BYTES {
        return Err(BlockError::TooLarge(text.len()));
    }
    Ok(())
}

/// Newline-terminated lines with their zero-based index.
fn terminated_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_inclusive('\n')
        .filter_map(|l| l.strip_suffix('\n'))
        .enumerate()
}

/// What the power-supply class would report after the blocks written so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerSupplyView {
    block: StatusBlock,
    status: ChargeStatus,
    level: CapacityLevel,
}

impl Default for PowerSupplyView {
    /// Freshly loaded device: full, on AC, everything else zero.
    fn default() -> Self {
        Self {
            block: StatusBlock {
                charging: true,
                ..StatusBlock::default()
            },
            status: ChargeStatus::Full,
            level: CapacityLevel::Full,
        }
    }
}

impl PowerSupplyView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one write. On error the lines before the bad one stay applied
    /// and the derived status is not recomputed.
    pub fn apply(&mut self, text: &str) -> std::result::Result<(), BlockError> {
        check_size(text)?;
        for (idx, line) in terminated_lines(text) {
            self.block.apply_line(idx, line)?;
        }
        self.status = if self.block.charging {
            if self.block.capacity_pct < 100 {
                ChargeStatus::Charging
            } else {
                ChargeStatus::Full
            }
        } else {
            ChargeStatus::Discharging
        };
        self.level = CapacityLevel::from_capacity(self.block.capacity_pct);
        Ok(())
    }

    pub fn block(&self) -> &StatusBlock {
        &self.block
    }

    pub fn supply_status(&self) -> ChargeStatus {
        self.status
    }

    pub fn capacity_level(&self) -> CapacityLevel {
        self.level
    }

    /// The AC adapter is reported online whenever the charging flag is set.
    pub fn ac_online(&self) -> bool {
        self.block.charging
    }
}

/// Destination for rendered status blocks.
pub trait StatusSink {
    fn publish(&mut self, block: &StatusBlock) -> Result<()>;
}

impl<T: StatusSink + ?Sized> StatusSink for Box<T> {
    fn publish(&mut self, block: &StatusBlock) -> Result<()> {
        (**self).publish(block)
    }
}

/// Writes each block to an existing file or device node in one `write` call.
/// The target is never created.
#[derive(Debug, Clone)]
pub struct FileStatusSink {
    path: PathBuf,
}

impl FileStatusSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatusSink for FileStatusSink {
    fn publish(&mut self, block: &StatusBlock) -> Result<()> {
        let body = block.render();
        let mut f = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .wrap_err_with(|| format!("open status file {:?}", self.path))?;
        let n = f
            .write(body.as_bytes())
            .wrap_err_with(|| format!("write status file {:?}", self.path))?;
        if n != body.len() {
            eyre::bail!(
                "short write to {:?}: {n} of {} bytes",
                self.path,
                body.len()
            );
        }
        Ok(())
    }
}
