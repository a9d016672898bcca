//! INA219 register map and the fixed configuration word.

pub const REG_CONFIG: u8 = 0x00;
pub const REG_SHUNT_VOLTAGE: u8 = 0x01;
pub const REG_BUS_VOLTAGE: u8 = 0x02;
pub const REG_POWER: u8 = 0x03;
pub const REG_CURRENT: u8 = 0x04;
pub const REG_CALIBRATION: u8 = 0x05;

/// Bus voltage range: 0 = 16 V, 1 = 32 V.
const BRNG_16V: u16 = 0x00;
/// PGA gain /8, +-320 mV shunt range.
const PGA_320MV: u16 = 0x03;
/// 12-bit, 32 samples averaged (17.02 ms conversion).
const ADC_12BIT_32S: u16 = 0x0D;
/// Shunt and bus, continuous.
const MODE_SHUNT_BUS_CONTINUOUS: u16 = 0x07;

/// Configuration register value written once at start-up.
pub const CONFIG_WORD: u16 = (BRNG_16V << 13)
    | (PGA_320MV << 11)
    | (ADC_12BIT_32S << 7)
    | (ADC_12BIT_32S << 3)
    | MODE_SHUNT_BUS_CONTINUOUS;

/// Split a register word into the MSB-first byte pair the INA219 expects.
#[inline]
pub fn word_to_be(word: u16) -> [u8; 2] {
    word.to_be_bytes()
}

#[inline]
pub fn be_to_word(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}
