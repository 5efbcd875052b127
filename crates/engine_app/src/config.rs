//! Engine configuration.

use std::env;
use std::str::FromStr;

use tracing::warn;

/// Configuration for the processing loop.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Target cycles per second.
    pub cycle_rate: f64,
    /// Maximum number of cycles to run (0 = unlimited).
    pub max_cycles: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_rate: 60.0,
            max_cycles: 0,
        }
    }
}

impl EngineConfig {
    /// Read `ENGINE_CYCLE_RATE` and `ENGINE_MAX_CYCLES`, keeping the default
    /// for anything unset or invalid.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mut cycle_rate = parse_or(&lookup, "ENGINE_CYCLE_RATE", defaults.cycle_rate);
        if !(cycle_rate.is_finite() && cycle_rate > 0.0) {
            warn!(cycle_rate, "ENGINE_CYCLE_RATE must be positive, using default");
            cycle_rate = defaults.cycle_rate;
        }
        Self {
            cycle_rate,
            max_cycles: parse_or(&lookup, "ENGINE_MAX_CYCLES", defaults.max_cycles),
        }
    }

    /// Seconds allotted to one cycle.
    #[must_use]
    pub fn cycle_budget(&self) -> f64 {
        1.0 / self.cycle_rate
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Debug>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(key, value = %raw, ?default, "invalid value, using default");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.cycle_rate, 60.0);
        assert_eq!(cfg.max_cycles, 0);
        assert_eq!(config(&[]), cfg);
    }

    #[test]
    fn test_reads_values() {
        let cfg = config(&[("ENGINE_CYCLE_RATE", "120"), ("ENGINE_MAX_CYCLES", " 10 ")]);
        assert_eq!(cfg.cycle_rate, 120.0);
        assert_eq!(cfg.max_cycles, 10);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = config(&[("ENGINE_CYCLE_RATE", "fast"), ("ENGINE_MAX_CYCLES", "-1")]);
        assert_eq!(cfg, EngineConfig::default());

        let cfg = config(&[("ENGINE_CYCLE_RATE", "0")]);
        assert_eq!(cfg.cycle_rate, 60.0);
    }

    #[test]
    fn test_cycle_budget() {
        let cfg = EngineConfig {
            cycle_rate: 50.0,
            max_cycles: 0,
        };
        assert!((cfg.cycle_budget() - 0.02).abs() < 1e-12);
    }
}
