use crate::status::ChargeStatus;

/// Everything computed for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryState {
    pub bus_voltage_mv: u32,
    /// Averaged bus voltage, rounded half to even.
    pub bus_voltage_avg_mv: u32,
    pub shunt_voltage_mv: f64,
    /// Average of |shunt voltage|.
    pub shunt_voltage_avg_mv: f64,
    pub current_a: f64,
    /// Average of |current|.
    pub current_avg_a: f64,
    pub power_w: f64,
    pub power_avg_w: f64,
    pub soc_pct: u8,
    pub charge_full_uah: u64,
    pub charge_now_uah: u64,
    pub current_now_ua: u64,
    pub current_now_avg_ua: u64,
    pub status: ChargeStatus,
    pub battery_remain_sec: u64,
}

impl BatteryState {
    pub fn is_charging(&self) -> bool {
        self.status.is_charging_flag()
    }
}
