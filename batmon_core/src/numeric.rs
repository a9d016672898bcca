//! Integer conversion helpers with explicit rounding modes.
//!
//! The estimation pipeline mixes float averages with integer charge math; each
//! boundary picks one of these helpers so the rounding mode is visible at the
//! call site.

/// Round to nearest, ties to even, clamped to `[0, u64::MAX]`.
/// Non-finite and negative values map to 0.
#[inline]
pub fn round_to_u64(x: f64) -> u64 {
    if !x.is_finite() || x <= 0.0 {
        return 0;
    }
    let r = x.round_ties_even();
    if r >= u64::MAX as f64 {
        u64::MAX
    } else {
        r as u64
    }
}

/// Truncate toward zero, clamped to `[0, u64::MAX]`.
/// Non-finite and negative values map to 0.
#[inline]
pub fn trunc_to_u64(x: f64) -> u64 {
    if !x.is_finite() || x <= 0.0 {
        return 0;
    }
    if x >= u64::MAX as f64 {
        u64::MAX
    } else {
        x as u64
    }
}

/// Ceiling of `num / den` for unsigned integers. `den` must be non-zero.
///
/// Only adds one when the remainder is non-zero, so exact quotients are kept.
#[inline]
pub fn ceil_div_u64(num: u64, den: u64) -> u64 {
    debug_assert!(den != 0, "ceil_div_u64: zero denominator");
    let q = num / den;
    if num % den == 0 { q } else { q + 1 }
}

/// Saturating narrowing used for values shown in mV.
#[inline]
pub fn saturate_u32(x: u64) -> u32 {
    u32::try_from(x).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_sends_ties_to_even() {
        assert_eq!(round_to_u64(11_800.5), 11_800);
        assert_eq!(round_to_u64(11_801.5), 11_802);
        assert_eq!(round_to_u64(11_800.51), 11_801);
        assert_eq!(round_to_u64(11_800.49), 11_800);
        assert_eq!(round_to_u64(2.5), 2);
        assert_eq!(round_to_u64(3.5), 4);
    }

    #[test]
    fn non_finite_and_negative_map_to_zero() {
        assert_eq!(round_to_u64(f64::NAN), 0);
        assert_eq!(round_to_u64(-3.0), 0);
        assert_eq!(trunc_to_u64(f64::INFINITY), 0);
        assert_eq!(trunc_to_u64(-0.5), 0);
    }

    #[test]
    fn trunc_drops_fraction() {
        assert_eq!(trunc_to_u64(499_999.999), 499_999);
        assert_eq!(trunc_to_u64(1.0), 1);
    }

    #[test]
    fn ceil_div_keeps_exact_quotients() {
        assert_eq!(ceil_div_u64(300, 3), 100);
        assert_eq!(ceil_div_u64(301, 3), 101);
        assert_eq!(ceil_div_u64(0, 7), 0);
        assert_eq!(ceil_div_u64(1, 7), 1);
    }

    #[test]
    fn saturate_u32_clamps() {
        assert_eq!(saturate_u32(12_384), 12_384);
        assert_eq!(saturate_u32(u64::MAX), u32::MAX);
    }
}
