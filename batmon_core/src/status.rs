//! Charge status and capacity level.

use crate::config::StatusCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChargeStatus {
    Full,
    Charging,
    Discharging,
}

impl ChargeStatus {
    /// Classify from the raw (unaveraged) shunt voltage. Both thresholds are
    /// strict, so a reading exactly on either boundary is `Full`.
    pub fn classify(shunt_mv: f64, cfg: &StatusCfg) -> Self {
        if shunt_mv < cfg.discharge_threshold_mv {
            Self::Discharging
        } else if shunt_mv > cfg.charge_threshold_mv {
            Self::Charging
        } else {
            Self::Full
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "Full",
            Self::Charging => "Charging",
            Self::Discharging => "Discharging",
        }
    }

    /// Flag written to the status block.
    pub fn is_charging_flag(&self) -> bool {
        !matches!(self, Self::Discharging)
    }
}

impl core::fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse capacity bucket reported alongside the percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapacityLevel {
    Critical,
    Low,
    Normal,
    High,
    Full,
}

impl CapacityLevel {
    pub fn from_capacity(pct: i64) -> Self {
        match pct {
            p if p >= 98 => Self::Full,
            p if p >= 70 => Self::High,
            p if p >= 30 => Self::Normal,
            p if p >= 5 => Self::Low,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::High => "High",
            Self::Full => "Full",
        }
    }
}

impl core::fmt::Display for CapacityLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-3.0, ChargeStatus::Full)]
    #[case(-3.01, ChargeStatus::Discharging)]
    #[case(0.2, ChargeStatus::Full)]
    #[case(0.21, ChargeStatus::Charging)]
    #[case(0.0, ChargeStatus::Full)]
    #[case(-40.0, ChargeStatus::Discharging)]
    fn classify_boundaries(#[case] shunt: f64, #[case] want: ChargeStatus) {
        assert_eq!(ChargeStatus::classify(shunt, &StatusCfg::default()), want);
    }

    #[rstest]
    #[case(100, CapacityLevel::Full)]
    #[case(98, CapacityLevel::Full)]
    #[case(97, CapacityLevel::High)]
    #[case(70, CapacityLevel::High)]
    #[case(69, CapacityLevel::Normal)]
    #[case(30, CapacityLevel::Normal)]
    #[case(29, CapacityLevel::Low)]
    #[case(5, CapacityLevel::Low)]
    #[case(4, CapacityLevel::Critical)]
    #[case(-1, CapacityLevel::Critical)]
    fn capacity_levels(#[case] pct: i64, #[case] want: CapacityLevel) {
        assert_eq!(CapacityLevel::from_capacity(pct), want);
    }

    #[test]
    fn only_discharging_clears_flag() {
        assert!(ChargeStatus::Full.is_charging_flag());
        assert!(ChargeStatus::Charging.is_charging_flag());
        assert!(!ChargeStatus::Discharging.is_charging_flag());
    }
}
