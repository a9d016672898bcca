//! Simulated INA219 for development machines and CLI tests.
//!
//! Produces register words that decode back to the configured bus/shunt
//! voltages, optionally drifting the bus voltage on every read so a long
//! run looks like a pack slowly discharging.

use batmon_traits::{PowerSensor, RawRegisters};

use crate::error::HwError;

/// Shunt resistance assumed when deriving the current register (ohm).
const SIM_SHUNT_OHM: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    bus_mv: f64,
    shunt_mv: f64,
    drift_mv_per_read: f64,
    current_lsb_ma: f64,
    power_lsb_w: f64,
    fail_reads: bool,
    configured: bool,
    reads: u64,
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        // A 3S pack around 70% on a light discharge
        Self::new(11_800.0, -5.0)
    }
}

impl SimulatedSensor {
    pub fn new(bus_mv: f64, shunt_mv: f64) -> Self {
        Self {
            bus_mv,
            shunt_mv,
            drift_mv_per_read: 0.0,
            current_lsb_ma: 0.1524,
            power_lsb_w: 0.003048,
            fail_reads: false,
            configured: false,
            reads: 0,
        }
    }

    pub fn with_drift(mut self, mv_per_read: f64) -> Self {
        self.drift_mv_per_read = mv_per_read;
        self
    }

    pub fn with_lsb(mut self, current_lsb_ma: f64, power_lsb_w: f64) -> Self {
        self.current_lsb_ma = current_lsb_ma;
        self.power_lsb_w = power_lsb_w;
        self
    }

    /// Every read fails with a timeout, as if the sensor fell off the bus.
    pub fn failing(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn encode(&self) -> RawRegisters {
        let bus_mv = self.bus_mv.clamp(0.0, 32_764.0);
        let bus = ((bus_mv / 4.0).round() as u16) << 3;

        let shunt_counts = (self.shunt_mv / 0.01).round().clamp(-32_000.0, 32_000.0) as i16;

        let current_a = self.shunt_mv / 1000.0 / SIM_SHUNT_OHM;
        let current_counts = (current_a * 1000.0 / self.current_lsb_ma)
            .round()
            .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;

        let power_w = (bus_mv / 1000.0) * current_a.abs();
        let power_counts = (power_w / self.power_lsb_w)
            .round()
            .clamp(0.0, f64::from(i16::MAX)) as i16;

        RawRegisters {
            bus,
            shunt: shunt_counts as u16,
            current: current_counts as u16,
            power: power_counts as u16,
        }
    }
}

impl PowerSensor for SimulatedSensor {
    fn configure(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.configured = true;
        Ok(())
    }

    fn read_registers(&mut self) -> Result<RawRegisters, Box<dyn std::error::Error + Send + Sync>> {
        if !self.configured {
            return Err(Box::new(HwError::NotConfigured));
        }
        if self.fail_reads {
            return Err(Box::new(HwError::Timeout));
        }
        self.reads = self.reads.saturating_add(1);
        let regs = self.encode();
        self.bus_mv = (self.bus_mv + self.drift_mv_per_read).max(0.0);
        tracing::trace!(?regs, "simulated ina219 read");
        Ok(regs)
    }
}
