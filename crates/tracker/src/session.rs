//! # Tracking Session
//!
//! The journey state machine. A session owns every piece of per-journey state
//! and is advanced one sample at a time through [`TrackingSession::apply`]; the
//! caller observes it through [`Snapshot`]s.

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::distance::{distance_3d, round_tenth};
use crate::error::{Error, PositionError};
use crate::filter::{Rejection, TrackFilter, Verdict};
use crate::stabilizer::{Reading, Stabilizer};
use crate::types::{GeoSample, TrackPoint};

const READY: &str = "Ready to start";
const STABILIZING_START: &str = "Stabilizing GPS... stay still";
const STABILIZING_END: &str = "Stabilizing end point... stay still";
const TRACKING_ACTIVE: &str = "Tracking active, you can move now";
const COMPLETED: &str = "Journey completed";
const CANCELLED: &str = "Tracking cancelled";
const NO_SOURCE_MESSAGE: &str = "Error: GPS not available";
const NO_SOURCE_ERROR: &str = "Geolocation is not available";
const CLOSED_MESSAGE: &str = "Error: Location stream closed";
const CLOSED_ERROR: &str = "Location stream closed";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    #[default]
    Idle,
    Stabilizing,
    Tracking,
    Finished,
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Stabilizing => write!(f, "stabilizing"),
            Self::Tracking => write!(f, "tracking"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// What a single sample did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// No stabilization or tracking in progress.
    Ignored,
    LowAccuracy { accuracy: f64 },
    Stabilizing { collected: usize, required: usize },
    /// The start anchor was produced; tracking has begun.
    Started,
    Admitted { segment: f64 },
    Rejected(Rejection),
    /// The end anchor was produced; the journey is complete.
    Finished,
}

/// Point-in-time view of a session, published after every processed event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub status: Status,
    pub start_anchor: Option<TrackPoint>,
    pub end_anchor: Option<TrackPoint>,
    pub track_points: Vec<TrackPoint>,
    /// Rounded to one decimal.
    pub total_distance_meters: f64,
    /// Rounded to one decimal. Zero until finished.
    pub straight_line_distance_meters: f64,
    /// Accuracy of the most recent sample, admitted or not.
    pub current_accuracy: Option<f64>,
    pub status_message: String,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct TrackingSession {
    status: Status,
    // set while the stabilizer is collecting the end anchor
    finishing: bool,
    // the position stream ended; status and data are frozen until cancel
    closed: bool,
    stabilizer: Stabilizer,
    filter: TrackFilter,
    track_points: Vec<TrackPoint>,
    total_distance: f64,
    straight_line_distance: f64,
    last_accepted: Option<(TrackPoint, DateTime<Utc>)>,
    start_anchor: Option<TrackPoint>,
    end_anchor: Option<TrackPoint>,
    current_accuracy: Option<f64>,
    status_message: String,
    error: Option<String>,
}

impl TrackingSession {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            status: Status::Idle,
            finishing: false,
            closed: false,
            stabilizer: Stabilizer::new(config.max_accuracy_threshold, config.stabilization_readings),
            filter: TrackFilter::from_config(config),
            track_points: Vec::new(),
            total_distance: 0.0,
            straight_line_distance: 0.0,
            last_accepted: None,
            start_anchor: None,
            end_anchor: None,
            current_accuracy: None,
            status_message: READY.to_string(),
            error: None,
        }
    }

    /// Begin collecting the start anchor.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` unless the session is idle.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.status != Status::Idle {
            return Err(Error::InvalidState(format!("cannot start while {}", self.status)));
        }

        self.clear();
        self.status = Status::Stabilizing;
        self.status_message = STABILIZING_START.to_string();
        info!("stabilizing start point");

        Ok(())
    }

    /// Process one sample. `now` is the processing time: it stamps anchors
    /// and drives the minimum-interval gate.
    pub fn apply(&mut self, sample: &GeoSample, now: DateTime<Utc>) -> Progress {
        if self.closed {
            return Progress::Ignored;
        }
        match self.status {
            Status::Idle | Status::Finished => Progress::Ignored,
            Status::Stabilizing => {
                self.current_accuracy = Some(sample.accuracy);
                self.stabilize(sample, now)
            }
            Status::Tracking => {
                self.current_accuracy = Some(sample.accuracy);
                self.track(sample, now)
            }
        }
    }

    fn stabilize(&mut self, sample: &GeoSample, now: DateTime<Utc>) -> Progress {
        match self.stabilizer.push(sample, now) {
            Reading::Rejected { accuracy } => {
                self.status_message = format!(
                    "Low accuracy ({}m), waiting for better signal...",
                    accuracy.round()
                );
                Progress::LowAccuracy { accuracy }
            }
            Reading::Buffered { collected, required } => {
                let phase = if self.finishing { "Stabilizing end point" } else { "Stabilizing GPS" };
                self.status_message = format!("{phase}... {collected}/{required}");
                Progress::Stabilizing { collected, required }
            }
            Reading::Anchored(anchor) if self.finishing => {
                self.finish(anchor);
                Progress::Finished
            }
            Reading::Anchored(anchor) => {
                self.begin_tracking(anchor, now);
                Progress::Started
            }
        }
    }

    fn begin_tracking(&mut self, anchor: TrackPoint, now: DateTime<Utc>) {
        info!(latitude = anchor.latitude, longitude = anchor.longitude, "start point stabilized");

        self.track_points = vec![anchor.clone()];
        self.last_accepted = Some((anchor.clone(), now));
        self.start_anchor = Some(anchor);
        self.status = Status::Tracking;
        self.status_message = TRACKING_ACTIVE.to_string();
    }

    fn track(&mut self, sample: &GeoSample, now: DateTime<Utc>) -> Progress {
        let Some((last, last_at)) = &self.last_accepted else {
            return Progress::Ignored;
        };

        match self.filter.admit(last, *last_at, sample, now) {
            Verdict::Reject(reason) => {
                debug!(%reason, accuracy = sample.accuracy, "sample rejected");
                Progress::Rejected(reason)
            }
            Verdict::Admit { geometric, segment } => {
                debug!(geometric, segment, "sample admitted");

                self.total_distance += segment;
                self.track_points.push(sample.clone());
                self.last_accepted = Some((sample.clone(), now));
                self.status_message = format!(
                    "Tracking... {} points | {}m traveled",
                    self.track_points.len(),
                    self.total_distance.round()
                );
                Progress::Admitted { segment }
            }
        }
    }

    fn finish(&mut self, anchor: TrackPoint) {
        if let Some(start) = &self.start_anchor {
            self.straight_line_distance = distance_3d(start, &anchor);
        }
        if let Some((last, _)) = &self.last_accepted {
            self.total_distance += distance_3d(last, &anchor);
        }

        self.track_points.push(anchor.clone());
        self.end_anchor = Some(anchor);
        self.finishing = false;
        self.status = Status::Finished;
        self.status_message = COMPLETED.to_string();

        info!(
            points = self.track_points.len(),
            total = round_tenth(self.total_distance),
            straight_line = round_tenth(self.straight_line_distance),
            "journey completed"
        );
    }

    /// Switch from tracking to collecting the end anchor. Returns `false`, and
    /// changes nothing, when the session is not tracking.
    pub fn request_stop(&mut self) -> bool {
        if self.closed || self.status != Status::Tracking {
            return false;
        }

        self.stabilizer.clear();
        self.finishing = true;
        self.status = Status::Stabilizing;
        self.status_message = STABILIZING_END.to_string();
        info!(points = self.track_points.len(), "stabilizing end point");

        true
    }

    /// Discard the journey from any state.
    pub fn cancel(&mut self) {
        self.clear();
        self.status_message = CANCELLED.to_string();
        info!("tracking cancelled");
    }

    /// Return a finished session to idle.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` unless the session is finished.
    pub fn reset(&mut self) -> Result<(), Error> {
        if self.status != Status::Finished {
            return Err(Error::InvalidState(format!("cannot reset while {}", self.status)));
        }

        self.clear();
        self.status_message = READY.to_string();

        Ok(())
    }

    /// Record a stream-level failure. The session keeps going.
    pub fn stream_error(&mut self, err: PositionError) {
        if self.closed || matches!(self.status, Status::Idle | Status::Finished) {
            return;
        }
        self.status_message = format!("Error: {err}");
        self.error = Some(err.to_string());
    }

    /// The position stream ended before the journey finished. Status and
    /// collected data are kept but the session goes inactive: later samples
    /// and stops are ignored until it is cancelled.
    pub fn stream_closed(&mut self) {
        if !self.is_active() {
            return;
        }
        self.closed = true;
        self.finishing = false;
        self.stabilizer.clear();
        self.status_message = CLOSED_MESSAGE.to_string();
        self.error = Some(CLOSED_ERROR.to_string());
        debug!(status = %self.status, points = self.track_points.len(), "session closed");
    }

    /// No position source could be subscribed. Back to idle with an error.
    pub fn unavailable(&mut self) {
        self.clear();
        self.status_message = NO_SOURCE_MESSAGE.to_string();
        self.error = Some(NO_SOURCE_ERROR.to_string());
    }

    fn clear(&mut self) {
        self.status = Status::Idle;
        self.finishing = false;
        self.closed = false;
        self.stabilizer.clear();
        self.track_points.clear();
        self.total_distance = 0.0;
        self.straight_line_distance = 0.0;
        self.last_accepted = None;
        self.start_anchor = None;
        self.end_anchor = None;
        self.current_accuracy = None;
        self.error = None;
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Whether a subscription should be held in this state.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.closed && matches!(self.status, Status::Stabilizing | Status::Tracking)
    }

    /// The stream ended mid-journey and the session is waiting to be
    /// cancelled.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// A stop was requested and the end anchor is still being collected.
    #[must_use]
    pub const fn is_pending_finish(&self) -> bool {
        self.finishing
    }

    #[must_use]
    pub fn track_points(&self) -> &[TrackPoint] {
        &self.track_points
    }

    /// Unrounded running total in metres.
    #[must_use]
    pub const fn total_distance(&self) -> f64 {
        self.total_distance
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            start_anchor: self.start_anchor.clone(),
            end_anchor: self.end_anchor.clone(),
            track_points: self.track_points.clone(),
            total_distance_meters: round_tenth(self.total_distance),
            straight_line_distance_meters: round_tenth(self.straight_line_distance),
            current_accuracy: self.current_accuracy,
            status_message: self.status_message.clone(),
            error: self.error.clone(),
        }
    }
}
