//! Human-readable error descriptions and structured JSON error formatting.

use batmon_core::BlockError;
use batmon_core::error::{BatmonError, BuildError};

/// Exit code for configuration problems (matches clap's usage errors).
pub const EXIT_CONFIG: i32 = 2;
/// Exit code when the sensor cannot be opened, configured or read.
pub const EXIT_SENSOR: i32 = 3;
pub const EXIT_OTHER: i32 = 1;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingConfig => {
                "What happened: The estimator was built without a configuration.\nLikely causes: Internal wiring error in the CLI.\nHow to fix: Report this with the command line you used.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the [battery], [averaging] or [status] sections.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BatmonError>() {
        return match be {
            BatmonError::Timeout => "What happened: INA219 read timed out.\nLikely causes: Sensor not powered, wrong I2C bus, or loose SDA/SCL wiring.\nHow to fix: Check wiring and power, then verify the device with `i2cdetect` on the configured bus.".to_string(),
            BatmonError::Hardware(msg) | BatmonError::HardwareFault(msg) => format!(
                "What happened: Sensor communication failed ({msg}).\nLikely causes: Wrong [sensor] i2c_bus/address, missing I2C permissions, or the INA219 is not connected.\nHow to fix: Fix the [sensor] section, make sure the user can open /dev/i2c-*, and check the wiring."
            ),
            BatmonError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: A typo or out-of-range value in the TOML or on the command line.\nHow to fix: Edit the config file or flag named above and try again."
            ),
            BatmonError::Persistence(msg) => format!(
                "What happened: Calibration state could not be saved ({msg}).\nLikely causes: Missing write permission on the calibration directory.\nHow to fix: Make calibration.file writable by the service user."
            ),
            BatmonError::Io(msg) => format!(
                "What happened: I/O error ({msg}).\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BlockError>() {
        return format!(
            "What happened: Status block rejected ({be}).\nLikely causes: The file was not written by batmon or was truncated.\nHow to fix: Regenerate it with `batmon run --once --status-file <PATH>`."
        );
    }

    // Generic fallback
    let msg = format!("{err:#}");
    format!(
        "What happened: {msg}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug for details."
    )
}

pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_CONFIG;
    }
    match err.downcast_ref::<BatmonError>() {
        Some(BatmonError::Config(_)) => EXIT_CONFIG,
        Some(BatmonError::Timeout | BatmonError::Hardware(_) | BatmonError::HardwareFault(_)) => {
            EXIT_SENSOR
        }
        _ => EXIT_OTHER,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BatmonError>() {
        return match be {
            BatmonError::Timeout => "Timeout",
            BatmonError::Hardware(_) => "Hardware",
            BatmonError::HardwareFault(_) => "HardwareFault",
            BatmonError::Config(_) => "Config",
            BatmonError::Persistence(_) => "Persistence",
            BatmonError::Io(_) => "Io",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    if err.downcast_ref::<BlockError>().is_some() {
        return "StatusBlock";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
