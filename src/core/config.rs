//! # Engine Configuration
//!
//! Tunables for the cache, debounce, snooze, and expansion horizon.
//! Defaults match the production values; every field can be overridden from
//! the environment (`CHIME_*` variables, `.env` supported via dotenvy in
//! the binary).
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use log::warn;
use std::time::Duration;

const DEFAULT_CACHE_TTL_SECS: u64 = 30;
const DEFAULT_DEBOUNCE_MS: u64 = 200;
const DEFAULT_SNOOZE_MINUTES: u32 = 10;
const DEFAULT_LEAD_TIME_MINUTES: u32 = 10;
const DEFAULT_HORIZON_MONTHS: u32 = 12;

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a cached reminder snapshot stays fresh
    pub cache_ttl: Duration,

    /// Coalescing window for bursty snapshot deliveries
    pub debounce: Duration,

    /// Snooze duration offered to callers that do not supply one
    pub default_snooze_minutes: u32,

    /// Lead-time alert offset applied to reminders created without one
    pub default_lead_time_minutes: u32,

    /// Forward-looking expansion horizon for recurring reminders
    pub horizon_months: u32,

    /// Whether presented alerts offer a snooze action
    pub offer_snooze: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            default_snooze_minutes: DEFAULT_SNOOZE_MINUTES,
            default_lead_time_minutes: DEFAULT_LEAD_TIME_MINUTES,
            horizon_months: DEFAULT_HORIZON_MONTHS,
            offer_snooze: true,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        EngineConfig {
            cache_ttl: Duration::from_secs(env_value("CHIME_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)),
            debounce: Duration::from_millis(env_value("CHIME_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)),
            default_snooze_minutes: env_value("CHIME_SNOOZE_MINUTES", DEFAULT_SNOOZE_MINUTES),
            default_lead_time_minutes: env_value("CHIME_LEAD_TIME_MINUTES", DEFAULT_LEAD_TIME_MINUTES),
            horizon_months: env_value("CHIME_HORIZON_MONTHS", DEFAULT_HORIZON_MONTHS),
            offer_snooze: env_value("CHIME_OFFER_SNOOZE", 1u8) != 0,
        }
    }
}

fn env_value<T: std::str::FromStr + Copy>(name: &str, fallback: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("ignoring unparsable {name}={raw}");
            fallback
        }),
        Err(_) => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.debounce, Duration::from_millis(200));
        assert_eq!(config.default_snooze_minutes, 10);
        assert_eq!(config.default_lead_time_minutes, 10);
        assert_eq!(config.horizon_months, 12);
        assert!(config.offer_snooze);
    }

    #[test]
    fn test_from_env_overrides_and_fallbacks() {
        std::env::set_var("CHIME_CACHE_TTL_SECS", "5");
        std::env::set_var("CHIME_SNOOZE_MINUTES", "not-a-number");
        let config = EngineConfig::from_env();
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.default_snooze_minutes, 10);
        std::env::remove_var("CHIME_CACHE_TTL_SECS");
        std::env::remove_var("CHIME_SNOOZE_MINUTES");
    }
}
