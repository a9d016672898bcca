//! INA219 register decoding.

use batmon_traits::RawRegisters;

/// One decoded sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub bus_voltage_mv: u32,
    pub shunt_voltage_mv: f64,
    pub current_a: f64,
    pub power_w: f64,
}

/// LSB weights that follow from the calibration register value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    /// Current register LSB (mA per count).
    pub current_lsb_ma: f64,
    /// Power register LSB (W per count).
    pub power_lsb_w: f64,
}

impl Default for Scaling {
    fn default() -> Self {
        Self {
            current_lsb_ma: 0.1524,
            power_lsb_w: 0.003048,
        }
    }
}

/// Shunt voltage register LSB (mV per count).
const SHUNT_LSB_MV: f64 = 0.01;
/// Bus voltage register LSB (mV per count), data in bits 15..3.
const BUS_LSB_MV: u32 = 4;

pub fn decode(raw: RawRegisters, scaling: &Scaling) -> Sample {
    let bus_voltage_mv = u32::from((raw.bus >> 3) & 0x1FFF) * BUS_LSB_MV;
    let shunt_voltage_mv = f64::from(raw.shunt as i16) * SHUNT_LSB_MV;
    let current_a = f64::from(raw.current as i16) * scaling.current_lsb_ma / 1000.0;
    let power_w = f64::from(raw.power as i16) * scaling.power_lsb_w;
    Sample {
        bus_voltage_mv,
        shunt_voltage_mv,
        current_a,
        power_w,
    }
}
