//! Per-tick output: the `--debug` diagnostic block and the `--json` state line.

use std::fmt::Write as _;

use batmon_core::calibration::CalibrationOutcome;
use chrono::{Local, TimeZone};
use batmon_core::util::{UAH_PER_MAH, human_time};
use batmon_core::{BatteryCfg, BatteryState, ChargeStatus, Tick};
use serde_json::json;

const RULE: &str = "---------------------------------------------------";

/// `YYYY-MM-DD HH:MM:SS` in `tz`; raw seconds if out of chrono's range.
pub fn format_stamp<Tz: TimeZone>(unix_secs: u64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    i64::try_from(unix_secs)
        .ok()
        .and_then(|s| tz.timestamp_opt(s, 0).single())
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| unix_secs.to_string())
}

/// Human-readable block for one tick.
pub fn render_debug(tick: &Tick<'_>, battery: &BatteryCfg, status_target: &str) -> String {
    let st = tick.state;
    let mut out = String::new();
    // writeln! into a String cannot fail
    let _ = writeln!(out, "--- [{}] ---", format_stamp(tick.unix_secs, &Local));
    let _ = writeln!(out, "Battery values\n{RULE}");
    let _ = writeln!(out, "bus_raw:             0x{:04X}", tick.raw.bus);
    let _ = writeln!(out, "bus_voltage:         {} mV", st.bus_voltage_mv);
    let _ = writeln!(out, "bus_voltage_avg:     {} mV\n", st.bus_voltage_avg_mv);
    let _ = writeln!(out, "shunt_raw:           0x{:04X}", tick.raw.shunt);
    let _ = writeln!(out, "shunt_voltage:       {:.3} mV", st.shunt_voltage_mv);
    let _ = writeln!(out, "shunt_voltage_avg:   {:.3} mV\n", st.shunt_voltage_avg_mv);
    let _ = writeln!(out, "current_raw:         0x{:04X}", tick.raw.current);
    let _ = writeln!(out, "current:             {:.6} A", st.current_a);
    let _ = writeln!(out, "current_avg:         {:.6} A\n", st.current_avg_a);
    let _ = writeln!(out, "power:               {:.3} W", st.power_w);
    let _ = writeln!(out, "power_avg:           {:.3} W\n", st.power_avg_w);

    let _ = writeln!(out, "Battery info\n{RULE}");
    let _ = writeln!(
        out,
        "Design capacity:     {} mAh ({} mAh * {})",
        battery.design_capacity_uah() / UAH_PER_MAH,
        battery.cell_capacity_mah,
        battery.cells
    );
    let _ = writeln!(out, "Last max. capacity:  {} mAh", st.charge_full_uah / UAH_PER_MAH);
    let _ = writeln!(out, "Remaining capacity:  {} mAh\n", st.charge_now_uah / UAH_PER_MAH);
    let _ = writeln!(
        out,
        "Voltage:             {} mV (min. design: {} mV)",
        st.bus_voltage_mv,
        battery.empty_mv()
    );
    let _ = writeln!(out, "Current:             {:.6} A", st.current_avg_a);
    let _ = writeln!(out, "Power:               {:.3} W\n", st.power_w);
    let _ = writeln!(out, "Status:              {}", st.status);
    let _ = writeln!(out, "Charge:              {} %", st.soc_pct);
    let remaining = match st.status {
        ChargeStatus::Full => "Fully charged".to_string(),
        _ => human_time(st.battery_remain_sec),
    };
    let _ = writeln!(out, "Remaining time:      {remaining}\n");
    if let Some(CalibrationOutcome::Updated {
        previous_uah,
        new_uah,
        ..
    }) = tick.calibration
    {
        let _ = writeln!(
            out,
            "Recalibrated:        {} -> {} mAh",
            previous_uah / UAH_PER_MAH,
            new_uah / UAH_PER_MAH
        );
    }
    let verb = if tick.published { "written to" } else { "NOT written to" };
    let _ = writeln!(out, "Data {verb} {status_target}\n{RULE}");
    out
}

/// JSON object for `--json` state lines.
pub fn state_json(index: u64, unix_secs: u64, st: &BatteryState, published: bool) -> serde_json::Value {
    json!({
        "tick": index,
        "ts": unix_secs,
        "bus_voltage_mv": st.bus_voltage_mv,
        "bus_voltage_avg_mv": st.bus_voltage_avg_mv,
        "shunt_voltage_mv": st.shunt_voltage_mv,
        "shunt_voltage_avg_mv": st.shunt_voltage_avg_mv,
        "current_a": st.current_a,
        "current_avg_a": st.current_avg_a,
        "power_w": st.power_w,
        "power_avg_w": st.power_avg_w,
        "soc_pct": st.soc_pct,
        "charge_full_uah": st.charge_full_uah,
        "charge_now_uah": st.charge_now_uah,
        "current_now_ua": st.current_now_ua,
        "current_now_avg_ua": st.current_now_avg_ua,
        "status": st.status.as_str(),
        "battery_remain_sec": st.battery_remain_sec,
        "published": published,
    })
}

/// Plain one-line summary printed per tick when neither `--json` nor `--debug` is set.
pub fn state_line(st: &BatteryState) -> String {
    let remaining = match st.status {
        ChargeStatus::Full => "full".to_string(),
        _ => human_time(st.battery_remain_sec),
    };
    format!(
        "{} mV  {} %  {}  {}",
        st.bus_voltage_mv, st.soc_pct, st.status, remaining
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use batmon_core::{Sample, StatusBlock};
    use batmon_traits::RawRegisters;
    use chrono::Utc;

    fn state(status: ChargeStatus) -> BatteryState {
        BatteryState {
            bus_voltage_mv: 11_800,
            bus_voltage_avg_mv: 11_804,
            shunt_voltage_mv: -5.0,
            shunt_voltage_avg_mv: 5.0,
            current_a: -0.5,
            current_avg_a: 0.5,
            power_w: 5.9,
            power_avg_w: 5.9,
            soc_pct: 82,
            charge_full_uah: 7_800_000,
            charge_now_uah: 6_396_000,
            current_now_ua: 500_000,
            current_now_avg_ua: 500_000,
            status,
            battery_remain_sec: 46_051,
        }
    }

    fn tick<'a>(st: &'a BatteryState, block: &'a StatusBlock) -> Tick<'a> {
        Tick {
            index: 1,
            unix_secs: 1_700_000_000,
            raw: RawRegisters::default(),
            sample: Sample {
                bus_voltage_mv: st.bus_voltage_mv,
                shunt_voltage_mv: st.shunt_voltage_mv,
                current_a: st.current_a,
                power_w: st.power_w,
            },
            state: st,
            block,
            calibration: None,
            published: true,
        }
    }

    #[test]
    fn debug_block_shows_capacities_and_time() {
        let st = state(ChargeStatus::Discharging);
        let block = StatusBlock::from_state(&st, &BatteryCfg::default());
        let text = render_debug(&tick(&st, &block), &BatteryCfg::default(), "/dev/pi_battery");
        assert!(text.contains("Design capacity:     7800 mAh (2600 mAh * 3)"));
        assert!(text.contains("Remaining capacity:  6396 mAh"));
        assert!(text.contains("Status:              Discharging"));
        assert!(text.contains("Remaining time:      12 h 47 min"));
        assert!(text.contains("Data written to /dev/pi_battery"));
    }

    #[test]
    fn stamp_is_calendar_time() {
        assert_eq!(format_stamp(1_700_000_000, &Utc), "2023-11-14 22:13:20");
        assert_eq!(format_stamp(0, &Utc), "1970-01-01 00:00:00");
        assert_eq!(format_stamp(u64::MAX, &Utc), u64::MAX.to_string());
    }

    #[test]
    fn debug_block_opens_with_local_stamp() {
        let st = state(ChargeStatus::Discharging);
        let block = StatusBlock::from_state(&st, &BatteryCfg::default());
        let text = render_debug(&tick(&st, &block), &BatteryCfg::default(), "x");
        let first = text.lines().next().unwrap();
        assert_eq!(first, format!("--- [{}] ---", format_stamp(1_700_000_000, &Local)));
        assert!(!first.contains("1700000000"));
    }

    #[test]
    fn full_pack_says_fully_charged() {
        let st = state(ChargeStatus::Full);
        let block = StatusBlock::from_state(&st, &BatteryCfg::default());
        let text = render_debug(&tick(&st, &block), &BatteryCfg::default(), "x");
        assert!(text.contains("Remaining time:      Fully charged"));
        assert_eq!(state_line(&st), "11800 mV  82 %  Full  full");
    }

    #[test]
    fn json_line_has_stable_keys() {
        let v = state_json(3, 10, &state(ChargeStatus::Charging), false);
        assert_eq!(v["status"], "Charging");
        assert_eq!(v["soc_pct"], 82);
        assert_eq!(v["tick"], 3);
        assert_eq!(v["published"], false);
    }
}
