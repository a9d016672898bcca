use rppal::i2c::I2c;
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::registers::*;
use batmon_traits::RawRegisters;

fn i2c_err(e: rppal::i2c::Error) -> HwError {
    match e {
        rppal::i2c::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => HwError::Timeout,
        rppal::i2c::Error::Io(io) => HwError::Io(io),
        other => HwError::I2c(other.to_string()),
    }
}

/// INA219 on a Linux I2C bus. The bus handle is closed when this is dropped.
pub struct Ina219 {
    i2c: I2c,
    bus: u8,
    address: u16,
    calibration: u16,
}

impl Ina219 {
    pub fn open(bus: u8, address: u16, calibration: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(i2c_err)?;
        i2c.set_slave_address(address).map_err(i2c_err)?;
        debug!(bus, address, "opened ina219");
        Ok(Self {
            i2c,
            bus,
            address,
            calibration,
        })
    }

    fn write_word(&mut self, reg: u8, value: u16) -> Result<()> {
        let [msb, lsb] = word_to_be(value);
        self.i2c.write(&[reg, msb, lsb]).map_err(i2c_err)?;
        Ok(())
    }

    fn read_word(&mut self, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(&[reg], &mut buf).map_err(i2c_err)?;
        Ok(be_to_word(buf))
    }

    /// Calibration first; the current and power registers stay zero without it.
    pub fn configure(&mut self) -> Result<()> {
        self.write_word(REG_CALIBRATION, self.calibration)?;
        self.write_word(REG_CONFIG, CONFIG_WORD)?;
        debug!(
            calibration = self.calibration,
            config = CONFIG_WORD,
            "ina219 configured"
        );
        Ok(())
    }

    pub fn read_all(&mut self) -> Result<RawRegisters> {
        let regs = RawRegisters {
            bus: self.read_word(REG_BUS_VOLTAGE)?,
            shunt: self.read_word(REG_SHUNT_VOLTAGE)?,
            current: self.read_word(REG_CURRENT)?,
            power: self.read_word(REG_POWER)?,
        };
        trace!(?regs, "ina219 raw read");
        Ok(regs)
    }
}

impl Drop for Ina219 {
    fn drop(&mut self) {
        debug!(bus = self.bus, address = self.address, "releasing ina219 i2c handle");
    }
}
