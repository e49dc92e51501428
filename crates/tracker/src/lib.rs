//! # Journey Tracker
//!
//! Records a journey from a stream of noisy position readings: a stabilized
//! start point, a filtered trajectory with a hybrid speed/geometry distance,
//! and a stabilized end point.

mod config;
mod error;
mod filter;
mod recorder;
mod session;
mod stabilizer;
mod types;

pub mod distance;
pub mod provider;

pub use self::config::{Config, WatchOptions};
pub use self::error::{Error, PositionError};
pub use self::filter::{Rejection, TrackFilter, Verdict};
pub use self::provider::{Clock, PositionSource, ReplayClock, StreamEvent, SystemClock};
pub use self::recorder::{Outcome, Recorder, RecorderHandle};
pub use self::session::{Progress, Snapshot, Status, TrackingSession};
pub use self::stabilizer::{Reading, Stabilizer, anchor};
pub use self::types::{GeoSample, TrackPoint};

/// Result type for the tracker.
pub type Result<T> = anyhow::Result<T, Error>;
