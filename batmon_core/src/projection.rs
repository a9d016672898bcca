//! Near-full clamp and remaining-time projection.

use crate::status::ChargeStatus;
use crate::util::SECS_PER_HOUR;

/// The per-tick values the clamp may rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeReading {
    pub soc_pct: u8,
    pub charge_full_uah: u64,
    pub charge_now_uah: u64,
    pub current_now_ua: u64,
    pub status: ChargeStatus,
}

impl ChargeReading {
    /// Snap to 100% Full when the model already says 100%, or when it is at
    /// least `clamp_pct` and the pack is not discharging. Returns whether the
    /// clamp fired.
    pub fn apply_full_clamp(&mut self, clamp_pct: u8, sentinel_ua: u64) -> bool {
        let near_full = self.soc_pct >= clamp_pct
            && matches!(self.status, ChargeStatus::Full | ChargeStatus::Charging);
        if self.soc_pct < 100 && !near_full {
            return false;
        }
        self.soc_pct = 100;
        self.charge_now_uah = self.charge_full_uah;
        self.current_now_ua = sentinel_ua;
        self.status = ChargeStatus::Full;
        true
    }
}

/// Seconds until empty (discharging) or full (charging) at the averaged rate.
/// Zero when full or when there is no average current.
pub fn remaining_secs(
    status: ChargeStatus,
    charge_now_uah: u64,
    charge_full_uah: u64,
    current_avg_ua: u64,
) -> u64 {
    if current_avg_ua == 0 {
        return 0;
    }
    let charge = match status {
        ChargeStatus::Discharging => charge_now_uah,
        ChargeStatus::Charging => charge_full_uah.saturating_sub(charge_now_uah),
        ChargeStatus::Full => return 0,
    };
    let secs = u128::from(charge) * u128::from(SECS_PER_HOUR) / u128::from(current_avg_ua.max(1));
    u64::try_from(secs).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(soc: u8, status: ChargeStatus) -> ChargeReading {
        ChargeReading {
            soc_pct: soc,
            charge_full_uah: 7_800_000,
            charge_now_uah: 7_722_000,
            current_now_ua: 250_000,
            status,
        }
    }

    #[test]
    fn clamp_fires_for_charging_at_threshold() {
        let mut r = reading(99, ChargeStatus::Charging);
        assert!(r.apply_full_clamp(99, 1000));
        assert_eq!(r.soc_pct, 100);
        assert_eq!(r.status, ChargeStatus::Full);
        assert_eq!(r.current_now_ua, 1000);
        assert_eq!(r.charge_now_uah, r.charge_full_uah);
    }

    #[test]
    fn clamp_skips_discharging_below_100() {
        let mut r = reading(99, ChargeStatus::Discharging);
        let before = r;
        assert!(!r.apply_full_clamp(99, 1000));
        assert_eq!(r, before);
    }

    #[test]
    fn clamp_always_fires_at_100() {
        let mut r = reading(100, ChargeStatus::Discharging);
        assert!(r.apply_full_clamp(99, 1000));
        assert_eq!(r.status, ChargeStatus::Full);
    }

    #[test]
    fn clamp_skips_below_threshold() {
        let mut r = reading(98, ChargeStatus::Full);
        assert!(!r.apply_full_clamp(99, 1000));
    }

    #[test]
    fn discharging_time_is_charge_over_rate() {
        assert_eq!(
            remaining_secs(ChargeStatus::Discharging, 1_000_000, 7_800_000, 1_000_000),
            3600
        );
        // 3.6 Ah at 1 A is 3.6 h
        assert_eq!(
            remaining_secs(ChargeStatus::Discharging, 3_600_000, 7_800_000, 1_000_000),
            12_960
        );
    }

    #[test]
    fn charging_time_uses_headroom() {
        assert_eq!(
            remaining_secs(ChargeStatus::Charging, 6_800_000, 7_800_000, 500_000),
            7200
        );
    }

    #[test]
    fn zero_rate_and_full_are_zero() {
        assert_eq!(remaining_secs(ChargeStatus::Discharging, 5_000_000, 7_800_000, 0), 0);
        assert_eq!(remaining_secs(ChargeStatus::Charging, 5_000_000, 7_800_000, 0), 0);
        assert_eq!(remaining_secs(ChargeStatus::Full, 5_000_000, 7_800_000, 10), 0);
    }

    #[test]
    fn quotient_truncates() {
        // 1 uAh * 3600 / 7 uA = 514.28
        assert_eq!(remaining_secs(ChargeStatus::Discharging, 1, 10, 7), 514);
    }
}
