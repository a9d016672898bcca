//! Maps `Box<dyn Error>` from trait boundaries to typed `BatmonError`.
//!
//! `batmon_traits::PowerSensor` returns `Box<dyn Error + Send + Sync>` so that
//! drivers stay free of core types; this module converts those into our typed
//! error enum, with an optional feature-gated path for
//! `batmon_hardware::HwError` downcasting.

use crate::error::BatmonError;

/// Map a trait-boundary error to a typed `BatmonError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> BatmonError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<batmon_hardware::error::HwError>() {
            return match hw {
                batmon_hardware::error::HwError::Timeout => BatmonError::Timeout,
                other => BatmonError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        BatmonError::Timeout
    } else {
        BatmonError::Hardware(s)
    }
}
