//! # Stabilizer
//!
//! Turns a burst of noisy readings into one anchor point. Used for both the
//! start and the end of a journey.

use chrono::{DateTime, Utc};

use crate::types::{GeoSample, TrackPoint};

/// Floor applied to accuracy before inverting it into a weight, so a reported
/// accuracy of zero cannot produce an infinite weight.
const MIN_WEIGHTED_ACCURACY: f64 = 0.01;

/// Result of offering a sample to the stabilizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// Accuracy above the threshold. Not counted toward the burst.
    Rejected { accuracy: f64 },
    /// Counted; the burst is not complete yet.
    Buffered { collected: usize, required: usize },
    /// The burst completed and produced an anchor. The buffer is now empty.
    Anchored(TrackPoint),
}

#[derive(Debug, Clone)]
pub struct Stabilizer {
    max_accuracy: f64,
    required: usize,
    buffer: Vec<GeoSample>,
}

impl Stabilizer {
    #[must_use]
    pub fn new(max_accuracy: f64, required: usize) -> Self {
        Self { max_accuracy, required, buffer: Vec::with_capacity(required) }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    #[must_use]
    pub fn collected(&self) -> usize {
        self.buffer.len()
    }

    /// Offer a sample. `now` becomes the anchor's timestamp if this sample
    /// completes the burst.
    pub fn push(&mut self, sample: &GeoSample, now: DateTime<Utc>) -> Reading {
        // NaN compares false against the threshold
        if sample.accuracy.is_nan() || sample.accuracy > self.max_accuracy {
            return Reading::Rejected { accuracy: sample.accuracy };
        }

        self.buffer.push(sample.clone());
        if self.buffer.len() < self.required {
            return Reading::Buffered { collected: self.buffer.len(), required: self.required };
        }

        let anchor = anchor(&self.buffer, now);
        self.buffer.clear();
        anchor.map_or(
            Reading::Buffered { collected: 0, required: self.required },
            Reading::Anchored,
        )
    }
}

/// Combine buffered readings into a single point.
///
/// Latitude and longitude are weighted by `1 / accuracy`, so precise readings
/// pull harder without discarding the rest. Accuracy and altitude are plain
/// means (altitude over readings that have one). Speed and heading are
/// instantaneous, so the most recent reading that reports them wins.
///
/// Returns `None` for an empty buffer.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn anchor(buffer: &[GeoSample], now: DateTime<Utc>) -> Option<TrackPoint> {
    if buffer.is_empty() {
        return None;
    }

    let mut weight_sum = 0.0;
    let mut latitude = 0.0;
    let mut longitude = 0.0;
    for sample in buffer {
        let weight = 1.0 / sample.accuracy.max(MIN_WEIGHTED_ACCURACY);
        weight_sum += weight;
        latitude += sample.latitude * weight;
        longitude += sample.longitude * weight;
    }

    let accuracy = buffer.iter().map(|s| s.accuracy).sum::<f64>() / buffer.len() as f64;

    let altitudes: Vec<f64> = buffer.iter().filter_map(|s| s.altitude).collect();
    let altitude = (!altitudes.is_empty())
        .then(|| altitudes.iter().sum::<f64>() / altitudes.len() as f64);

    let speed = buffer.iter().rev().find_map(|s| s.speed);
    let heading = buffer.iter().rev().find_map(|s| s.heading);

    tracing::trace!(readings = buffer.len(), "computed anchor");

    Some(TrackPoint {
        latitude: latitude / weight_sum,
        longitude: longitude / weight_sum,
        accuracy,
        timestamp: now,
        altitude,
        speed,
        heading,
    })
}
