use std::env;
use std::time::Duration;

use crate::error::Error;

const WATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Recorder configuration. Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Readings with a larger accuracy radius (metres) are discarded.
    pub max_accuracy_threshold: f64,
    /// Number of qualifying readings averaged into an anchor.
    pub stabilization_readings: usize,
    /// Minimum time between recorded points.
    pub min_interval: Duration,
    /// Points closer than this (metres) to the last one are treated as jitter.
    pub min_distance_between_points: f64,
    /// Below this speed (m/s) the reported speed is not used for distance.
    pub min_speed_threshold: f64,
    /// Larger bearing changes (degrees) between points are treated as noise.
    pub max_heading_change: f64,
    /// Ask the position source for its most precise fix.
    pub enable_high_accuracy: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_accuracy_threshold: 20.0,
            stabilization_readings: 5,
            min_interval: Duration::from_millis(2_000),
            min_distance_between_points: 3.0,
            min_speed_threshold: 0.5,
            max_heading_change: 120.0,
            enable_high_accuracy: true,
        }
    }
}

impl Config {
    /// Build a configuration from `TRACKER_*` environment variables, falling
    /// back to the defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let min_interval_ms = u64::try_from(defaults.min_interval.as_millis()).unwrap_or(u64::MAX);

        Self {
            max_accuracy_threshold: env_f64(
                "TRACKER_MAX_ACCURACY",
                defaults.max_accuracy_threshold,
            ),
            stabilization_readings: env_usize(
                "TRACKER_STABILIZATION_READINGS",
                defaults.stabilization_readings,
            ),
            min_interval: Duration::from_millis(env_u64("TRACKER_MIN_INTERVAL_MS", min_interval_ms)),
            min_distance_between_points: env_f64(
                "TRACKER_MIN_DISTANCE",
                defaults.min_distance_between_points,
            ),
            min_speed_threshold: env_f64("TRACKER_MIN_SPEED", defaults.min_speed_threshold),
            max_heading_change: env_f64("TRACKER_MAX_HEADING_CHANGE", defaults.max_heading_change),
            enable_high_accuracy: env_bool("TRACKER_HIGH_ACCURACY", defaults.enable_high_accuracy),
        }
    }

    /// Check every threshold is usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.stabilization_readings == 0 {
            return Err(Error::InvalidConfig("stabilization_readings must be at least 1".into()));
        }

        let thresholds = [
            ("max_accuracy_threshold", self.max_accuracy_threshold),
            ("min_distance_between_points", self.min_distance_between_points),
            ("min_speed_threshold", self.min_speed_threshold),
            ("max_heading_change", self.max_heading_change),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!("{name} must be finite and >= 0: {value}")));
            }
        }

        Ok(())
    }

    /// Subscription options passed to the position source.
    #[must_use]
    pub const fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            high_accuracy: self.enable_high_accuracy,
            maximum_age: Duration::ZERO,
            timeout: WATCH_TIMEOUT,
        }
    }
}

/// Options a position source should honour when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Oldest cached fix the source may hand back. Zero disables caching.
    pub maximum_age: Duration,
    /// How long the source may wait for a fix before reporting a timeout.
    pub timeout: Duration,
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|value| value.parse::<f64>().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|value| value.parse::<usize>().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().expect("defaults are valid");
        assert_eq!(config.stabilization_readings, 5);
        assert_eq!(config.min_interval, Duration::from_secs(2));
    }

    #[test]
    fn rejects_empty_burst() {
        let config = Config { stabilization_readings: 0, ..Config::default() };
        let err = config.validate().expect_err("should be invalid");
        assert_eq!(err.code(), "invalid_config");
    }

    #[test]
    fn rejects_negative_and_nan_thresholds() {
        let negative = Config { min_distance_between_points: -1.0, ..Config::default() };
        negative.validate().expect_err("negative distance");

        let nan = Config { max_accuracy_threshold: f64::NAN, ..Config::default() };
        let err = nan.validate().expect_err("should be invalid");
        assert!(err.to_string().contains("max_accuracy_threshold"));
    }

    #[test]
    fn watch_options_follow_accuracy_mode() {
        let config = Config { enable_high_accuracy: false, ..Config::default() };
        let options = config.watch_options();
        assert!(!options.high_accuracy);
        assert_eq!(options.maximum_age, Duration::ZERO);
        assert_eq!(options.timeout, Duration::from_secs(10));
    }
}
