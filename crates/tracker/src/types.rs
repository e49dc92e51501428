use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single raw position reading delivered by the position source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoSample {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Radius of 1-sigma uncertainty in metres.
    pub accuracy: f64,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
    /// Metres above the reference ellipsoid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Device-reported (Doppler) ground speed in m/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Compass bearing of travel in degrees, `[0, 360)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

/// A sample accepted into the recorded trajectory.
pub type TrackPoint = GeoSample;

impl GeoSample {
    #[must_use]
    pub const fn new(
        latitude: f64, longitude: f64, accuracy: f64, timestamp: DateTime<Utc>,
    ) -> Self {
        Self { latitude, longitude, accuracy, timestamp, altitude: None, speed: None, heading: None }
    }

    #[must_use]
    pub const fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    #[must_use]
    pub const fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    #[must_use]
    pub const fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }
}
