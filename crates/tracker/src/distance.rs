//! # Distance Estimator
//!
//! Segment lengths between track points. Two estimates are used:
//!
//! - [`distance_3d`]: geodesic surface distance, lifted into 3D with the
//!   altitude difference when both points carry one.
//! - [`hybrid_distance`]: blends the device-reported speed with the geometric
//!   distance. Position deltas taken a few seconds apart are dominated by the
//!   accuracy radius, while Doppler speed is comparatively stable.

use std::ops::RangeInclusive;

use geo::{Distance, Geodesic, Point};

use crate::types::GeoSample;

/// Speed-derived distance is trusted outright when within this factor of the
/// geometric distance.
const TRUST_BAND: RangeInclusive<f64> = 0.5..=2.0;
const SPEED_WEIGHT: f64 = 0.7;
const GEOMETRY_WEIGHT: f64 = 0.3;

/// Longest gap (seconds, exclusive) over which speed is integrated.
const MAX_SPEED_GAP_SECS: f64 = 30.0;

/// Geodesic (WGS84) distance in metres between two samples, ignoring altitude.
#[must_use]
pub fn surface_distance(from: &GeoSample, to: &GeoSample) -> f64 {
    let origin = Point::new(from.longitude, from.latitude);
    let destination = Point::new(to.longitude, to.latitude);
    Geodesic::distance(origin, destination)
}

/// Distance in metres between two samples, including the altitude difference
/// when both report an altitude.
#[must_use]
pub fn distance_3d(from: &GeoSample, to: &GeoSample) -> f64 {
    let planar = surface_distance(from, to);
    match (from.altitude, to.altitude) {
        (Some(a), Some(b)) => planar.hypot(b - a),
        _ => planar,
    }
}

/// Shortest angular difference between two bearings, in `[0, 180]`.
#[must_use]
pub fn heading_delta(first: f64, second: f64) -> f64 {
    let diff = (first - second).abs() % 360.0;
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// Segment estimate for a newly admitted sample.
///
/// `geometric` is the 3D distance from the last accepted point and
/// `elapsed_secs` the time since it was accepted. Speed is only used when it
/// is at least `min_speed` and the gap is in `(0, 30)` seconds; otherwise the
/// geometric distance is returned unchanged.
#[must_use]
pub fn hybrid_distance(
    geometric: f64, speed: Option<f64>, elapsed_secs: f64, min_speed: f64,
) -> f64 {
    let Some(speed) = speed.filter(|s| s.is_finite() && *s >= min_speed) else {
        return geometric;
    };
    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 || elapsed_secs >= MAX_SPEED_GAP_SECS {
        return geometric;
    }

    let speed_distance = speed * elapsed_secs;
    let ratio = speed_distance / geometric;

    if ratio.is_finite() && TRUST_BAND.contains(&ratio) {
        speed_distance
    } else {
        SPEED_WEIGHT.mul_add(speed_distance, GEOMETRY_WEIGHT * geometric)
    }
}

/// Round to one decimal place. Only applied when distances are read.
#[must_use]
pub fn round_tenth(meters: f64) -> f64 {
    (meters * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn at(latitude: f64, longitude: f64) -> GeoSample {
        GeoSample::new(latitude, longitude, 5.0, Utc::now())
    }

    #[test]
    fn heading_wraps_through_north() {
        assert!((heading_delta(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((heading_delta(10.0, 350.0) - 20.0).abs() < 1e-9);
        assert!((heading_delta(0.0, 180.0) - 180.0).abs() < 1e-9);
        assert!(heading_delta(90.0, 90.0).abs() < 1e-9);
    }

    #[test]
    fn tenth_of_a_millidegree_east_on_equator() {
        let meters = surface_distance(&at(0.0, 0.0), &at(0.0, 0.0001));
        assert!((meters - 11.132).abs() < 0.01, "got {meters}");
    }

    #[test]
    fn altitude_lifts_into_3d() {
        let from = at(0.0, 0.0).with_altitude(100.0);
        let to = at(0.0, 0.0001).with_altitude(110.0);

        let planar = surface_distance(&from, &to);
        let expected = (planar * planar + 100.0).sqrt();
        assert!((distance_3d(&from, &to) - expected).abs() < 1e-9);
    }

    #[test]
    fn missing_altitude_falls_back_to_planar() {
        let from = at(0.0, 0.0).with_altitude(100.0);
        let to = at(0.0, 0.0001);
        assert!((distance_3d(&from, &to) - surface_distance(&from, &to)).abs() < f64::EPSILON);
    }

    #[test]
    fn speed_trusted_inside_band() {
        // 4 m/s over 3 s against 11.1 m of geometry: ratio ~1.08
        let estimate = hybrid_distance(11.132, Some(4.0), 3.0, 0.5);
        assert!((estimate - 12.0).abs() < 1e-9);
    }

    #[test]
    fn band_edges_are_inclusive() {
        assert!((hybrid_distance(10.0, Some(2.5), 2.0, 0.5) - 5.0).abs() < 1e-9);
        assert!((hybrid_distance(10.0, Some(10.0), 2.0, 0.5) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn blends_outside_band() {
        // speed says 40 m, geometry says 10 m
        let estimate = hybrid_distance(10.0, Some(20.0), 2.0, 0.5);
        assert!((estimate - (0.7 * 40.0 + 0.3 * 10.0)).abs() < 1e-9);
    }

    #[test]
    fn slow_or_missing_speed_uses_geometry() {
        assert!((hybrid_distance(10.0, Some(0.4), 2.0, 0.5) - 10.0).abs() < f64::EPSILON);
        assert!((hybrid_distance(10.0, None, 2.0, 0.5) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn degenerate_elapsed_uses_geometry() {
        assert!((hybrid_distance(10.0, Some(5.0), 0.0, 0.5) - 10.0).abs() < f64::EPSILON);
        assert!((hybrid_distance(10.0, Some(5.0), -3.0, 0.5) - 10.0).abs() < f64::EPSILON);
        assert!((hybrid_distance(10.0, Some(5.0), 30.0, 0.5) - 10.0).abs() < f64::EPSILON);
        assert!((hybrid_distance(10.0, Some(5.0), f64::NAN, 0.5) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_geometry_stays_finite() {
        let estimate = hybrid_distance(0.0, Some(2.0), 2.0, 0.5);
        assert!(estimate.is_finite());
        assert!((estimate - 2.8).abs() < 1e-9);
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert!((round_tenth(12.04) - 12.0).abs() < f64::EPSILON);
        assert!((round_tenth(12.06) - 12.1).abs() < 1e-9);
    }
}
