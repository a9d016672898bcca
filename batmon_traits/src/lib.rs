pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

/// The four INA219 result registers, exactly as read from the bus.
///
/// Words are already assembled MSB-first; sign interpretation and scaling
/// are left to the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawRegisters {
    pub bus: u16,
    pub shunt: u16,
    pub current: u16,
    pub power: u16,
}

pub trait PowerSensor {
    /// Write calibration and configuration registers. Called once before sampling.
    fn configure(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn read_registers(&mut self) -> Result<RawRegisters, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: PowerSensor + ?Sized> PowerSensor for Box<T> {
    fn configure(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).configure()
    }

    fn read_registers(&mut self) -> Result<RawRegisters, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_registers()
    }
}
