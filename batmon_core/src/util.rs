//! Unit constants and small formatting helpers.

/// Microvolts per millivolt.
pub const UV_PER_MV: u64 = 1_000;
/// Microamp-hours per milliamp-hour.
pub const UAH_PER_MAH: u64 = 1_000;
/// Microamps per amp.
pub const UA_PER_A: f64 = 1_000_000.0;
pub const SECS_PER_HOUR: u64 = 3_600;

/// Format seconds as `"<h> h <mm> min"`, e.g. `"2 h 05 min"`.
pub fn human_time(seconds: u64) -> String {
    let h = seconds / SECS_PER_HOUR;
    let m = (seconds % SECS_PER_HOUR) / 60;
    format!("{h} h {m:02} min")
}
