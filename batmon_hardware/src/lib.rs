pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod ina219;
pub mod registers;
pub mod sim;

pub use batmon_traits::{PowerSensor, RawRegisters};
pub use sim::SimulatedSensor;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub struct HardwareSensor {
    ina: ina219::Ina219,
    read_retries: u8,
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl HardwareSensor {
    pub fn open(
        i2c_bus: u8,
        address: u16,
        calibration: u16,
        read_retries: u8,
    ) -> Result<Self, error::HwError> {
        let ina = ina219::Ina219::open(i2c_bus, address, calibration)?;
        Ok(HardwareSensor { ina, read_retries })
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl PowerSensor for HardwareSensor {
    fn configure(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.ina.configure().map_err(|e| {
            tracing::error!("ina219 configure error: {}", e);
            Box::new(e) as Box<dyn std::error::Error + Send + Sync>
        })
    }

    fn read_registers(&mut self) -> Result<RawRegisters, Box<dyn std::error::Error + Send + Sync>> {
        let mut attempts = 0;
        loop {
            match self.ina.read_all() {
                Ok(regs) => {
                    tracing::trace!(?regs, "ina219 sample");
                    return Ok(regs);
                }
                Err(e) if attempts < self.read_retries => {
                    attempts += 1;
                    tracing::warn!(retries = attempts, error = %e, "ina219 read failed, retrying");
                }
                Err(e) => {
                    tracing::error!("ina219 read error: {}", e);
                    return Err(Box::new(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_sensor_requires_configure() {
        let mut sensor = SimulatedSensor::default();
        let err = sensor.read_registers().expect_err("not configured yet");
        assert!(err.to_string().contains("not configured"));
        sensor.configure().unwrap();
        assert!(sensor.read_registers().is_ok());
    }

    #[test]
    fn test_failing_sensor_reports_timeout() {
        let mut sensor = SimulatedSensor::default().failing();
        sensor.configure().unwrap();
        let err = sensor.read_registers().expect_err("should fail");
        assert!(err.to_string().to_lowercase().contains("timeout"));
    }
}
