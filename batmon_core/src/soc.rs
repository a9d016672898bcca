//! State of charge from the linear voltage model.

use crate::config::BatteryCfg;
use crate::numeric::ceil_div_u64;

/// Map an averaged pack voltage to 0..=100 %.
///
/// At or above `full_mv` is 100, at or below `empty_mv` is 0, and anything in
/// between is interpolated and rounded up.
pub fn soc_percent(avg_voltage_mv: u32, battery: &BatteryCfg) -> u8 {
    let v = u64::from(avg_voltage_mv);
    let full = battery.full_mv();
    let empty = battery.empty_mv();
    if v >= full {
        return 100;
    }
    if v <= empty {
        return 0;
    }
    let pct = ceil_div_u64((v - empty) * 100, full - empty);
    // empty < v < full keeps pct within 1..=100
    pct.min(100) as u8
}
