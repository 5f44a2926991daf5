//! Threat-level gauge with fixed step sizes and hard bounds.

pub const THREAT_MAX: i32 = 100;
pub const THREAT_MIN: i32 = 5;
pub const THREAT_INITIAL: i32 = 12;

/// Step applied when the admin locks a target manually.
pub const TARGET_LOCK_STEP: i32 = 10;

#[derive(Debug, Clone, Copy)]
pub struct ThreatGauge {
    level: i32,
}

impl ThreatGauge {
    pub fn new() -> Self {
        Self {
            level: THREAT_INITIAL,
        }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// Apply a signed delta: raises are capped at the ceiling, lowers are
    /// floored. A zero delta is a no-op.
    pub fn bump(&mut self, delta: i32) {
        if delta > 0 {
            self.level = (self.level + delta).min(THREAT_MAX);
        } else if delta < 0 {
            self.level = (self.level + delta).max(THREAT_MIN);
        }
    }
}

impl Default for ThreatGauge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::classify::{THREAT_LOWER, THREAT_RAISE};

    #[test]
    fn starts_at_initial_level() {
        assert_eq!(ThreatGauge::new().level(), THREAT_INITIAL);
    }

    #[test]
    fn repeated_raises_converge_on_cap() {
        let mut gauge = ThreatGauge::new();
        for _ in 0..50 {
            gauge.bump(THREAT_RAISE);
            assert!(gauge.level() <= THREAT_MAX);
        }
        assert_eq!(gauge.level(), THREAT_MAX);
    }

    #[test]
    fn repeated_lowers_converge_on_floor() {
        let mut gauge = ThreatGauge::new();
        for _ in 0..50 {
            gauge.bump(-THREAT_LOWER);
            assert!(gauge.level() >= THREAT_MIN);
        }
        assert_eq!(gauge.level(), THREAT_MIN);
    }

    #[test]
    fn single_steps_use_fixed_sizes() {
        let mut gauge = ThreatGauge::new();
        gauge.bump(THREAT_RAISE);
        assert_eq!(gauge.level(), THREAT_INITIAL + THREAT_RAISE);
        gauge.bump(-THREAT_LOWER);
        assert_eq!(gauge.level(), THREAT_INITIAL + THREAT_RAISE - THREAT_LOWER);
    }
}
