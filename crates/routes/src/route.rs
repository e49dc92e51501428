use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracker::distance::surface_distance;
use tracker::{Error, GeoSample, Snapshot, Status, TrackPoint};
use uuid::Uuid;

/// A completed journey as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRoute {
    pub id: String,
    /// RFC 3339, UTC.
    pub start_time: String,
    pub finish_time: Option<String>,
    pub positions: Vec<Position>,
    /// Metres.
    pub total_distance: f64,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    /// Unix epoch in milliseconds.
    pub timestamp: i64,
}

impl From<&TrackPoint> for Position {
    fn from(point: &TrackPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            accuracy: point.accuracy,
            timestamp: point.timestamp.timestamp_millis(),
        }
    }
}

impl TryFrom<&Snapshot> for StoredRoute {
    type Error = Error;

    fn try_from(snapshot: &Snapshot) -> Result<Self, Self::Error> {
        if snapshot.status != Status::Finished {
            return Err(Error::InvalidState(format!(
                "only finished journeys can be stored, status is {}",
                snapshot.status
            )));
        }
        let (Some(start), Some(end)) = (&snapshot.start_anchor, &snapshot.end_anchor) else {
            return Err(Error::InvalidState("finished journey is missing an anchor".to_string()));
        };

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            start_time: iso_timestamp(start.timestamp),
            finish_time: Some(iso_timestamp(end.timestamp)),
            positions: snapshot.track_points.iter().map(Position::from).collect(),
            total_distance: snapshot.total_distance_meters,
            is_completed: true,
        })
    }
}

impl StoredRoute {
    /// Geodesic length of the stored path, ignoring altitude and speed.
    #[must_use]
    pub fn path_length(&self) -> f64 {
        let points: Vec<GeoSample> =
            self.positions.iter().copied().filter_map(Position::to_sample).collect();
        points.windows(2).map(|pair| surface_distance(&pair[0], &pair[1])).sum()
    }

    /// Time between start and finish. `None` while unfinished or when either
    /// timestamp does not parse.
    #[must_use]
    pub fn duration(&self) -> Option<TimeDelta> {
        let start = DateTime::parse_from_rfc3339(&self.start_time).ok()?;
        let finish = DateTime::parse_from_rfc3339(self.finish_time.as_deref()?).ok()?;
        Some(finish.signed_duration_since(start))
    }
}

impl Position {
    fn to_sample(self) -> Option<GeoSample> {
        let timestamp = DateTime::from_timestamp_millis(self.timestamp)?;
        Some(GeoSample::new(self.latitude, self.longitude, self.accuracy, timestamp))
    }
}

fn iso_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).single().expect("valid time")
    }

    fn route(positions: Vec<Position>) -> StoredRoute {
        StoredRoute {
            id: "route-1".to_string(),
            start_time: "2026-03-01T08:00:00.000Z".to_string(),
            finish_time: Some("2026-03-01T08:12:30.500Z".to_string()),
            positions,
            total_distance: 0.0,
            is_completed: true,
        }
    }

    #[test]
    fn position_from_track_point() {
        let point = GeoSample::new(-36.85, 174.76, 4.5, t0()).with_speed(3.0);
        let position = Position::from(&point);
        assert_eq!(position, Position {
            latitude: -36.85,
            longitude: 174.76,
            accuracy: 4.5,
            timestamp: t0().timestamp_millis(),
        });
    }

    #[test]
    fn rejects_unfinished_snapshot() {
        let snapshot = Snapshot { status: Status::Tracking, ..Snapshot::default() };
        let err = StoredRoute::try_from(&snapshot).expect_err("not finished");
        assert_eq!(err.code(), "invalid_state");

        let snapshot = Snapshot { status: Status::Finished, ..Snapshot::default() };
        StoredRoute::try_from(&snapshot).expect_err("anchors missing");
    }

    #[test]
    fn path_length_sums_segments() {
        let millis = t0().timestamp_millis();
        let positions = vec![
            Position { latitude: 0.0, longitude: 0.0, accuracy: 5.0, timestamp: millis },
            Position { latitude: 0.0, longitude: 0.0001, accuracy: 5.0, timestamp: millis },
            Position { latitude: 0.0, longitude: 0.0002, accuracy: 5.0, timestamp: millis },
        ];
        let length = route(positions).path_length();
        assert!((length - 22.264).abs() < 0.01, "got {length}");

        assert!(route(vec![]).path_length().abs() < f64::EPSILON);
    }

    #[test]
    fn duration_between_timestamps() {
        let stored = route(vec![]);
        assert_eq!(stored.duration(), Some(TimeDelta::milliseconds(750_500)));

        let open = StoredRoute { finish_time: None, ..stored };
        assert_eq!(open.duration(), None);
    }

    #[test]
    fn iso_timestamps_use_millis_and_zulu() {
        assert_eq!(iso_timestamp(t0()), "2026-03-01T08:00:00.000Z");
    }
}
