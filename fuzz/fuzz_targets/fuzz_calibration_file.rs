#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let p = batmon_config::parse_calibration(data);
    // Whatever survives parsing must render back to something parseable.
    if let (Some(full), Some(t)) = (p.dynamic_charge_full_uah, p.last_calibration_time) {
        let again = batmon_config::parse_calibration(&batmon_config::render_calibration(full, t));
        assert_eq!(again.dynamic_charge_full_uah, Some(full));
        assert_eq!(again.last_calibration_time, Some(t));
    }
});
