//! # Track Filter
//!
//! Admission gates applied to every sample while tracking. Gates run in order
//! and the first failure rejects the sample without touching session state.

use std::fmt::{self, Display};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::distance::{distance_3d, heading_delta, hybrid_distance};
use crate::types::{GeoSample, TrackPoint};

/// Why a sample was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    LowAccuracy,
    TooSoon,
    HeadingNoise,
    TooClose,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowAccuracy => write!(f, "low_accuracy"),
            Self::TooSoon => write!(f, "too_soon"),
            Self::HeadingNoise => write!(f, "heading_noise"),
            Self::TooClose => write!(f, "too_close"),
        }
    }
}

/// Outcome of running a sample through the gates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Admitted. `segment` is the distance to add to the running total.
    Admit { geometric: f64, segment: f64 },
    Reject(Rejection),
}

#[derive(Debug, Clone)]
pub struct TrackFilter {
    max_accuracy: f64,
    min_interval: Duration,
    max_heading_change: f64,
    min_distance: f64,
    min_speed: f64,
}

impl TrackFilter {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            max_accuracy: config.max_accuracy_threshold,
            min_interval: config.min_interval,
            max_heading_change: config.max_heading_change,
            min_distance: config.min_distance_between_points,
            min_speed: config.min_speed_threshold,
        }
    }

    /// Decide whether `sample`, processed at `now`, extends the track that
    /// currently ends at `last` (accepted at `last_at`).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn admit(
        &self, last: &TrackPoint, last_at: DateTime<Utc>, sample: &GeoSample, now: DateTime<Utc>,
    ) -> Verdict {
        if sample.accuracy.is_nan() || sample.accuracy > self.max_accuracy {
            return Verdict::Reject(Rejection::LowAccuracy);
        }

        let elapsed_ms = now.signed_duration_since(last_at).num_milliseconds();
        let min_interval_ms = i64::try_from(self.min_interval.as_millis()).unwrap_or(i64::MAX);
        if elapsed_ms < min_interval_ms {
            return Verdict::Reject(Rejection::TooSoon);
        }

        if let (Some(previous), Some(current)) = (last.heading, sample.heading)
            && heading_delta(previous, current) > self.max_heading_change
        {
            return Verdict::Reject(Rejection::HeadingNoise);
        }

        let geometric = distance_3d(last, sample);
        if geometric < self.min_distance {
            return Verdict::Reject(Rejection::TooClose);
        }

        let elapsed_secs = elapsed_ms as f64 / 1_000.0;
        let segment = hybrid_distance(geometric, sample.speed, elapsed_secs, self.min_speed);

        Verdict::Admit { geometric, segment }
    }
}
