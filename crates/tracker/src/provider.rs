//! # Provider
//!
//! Provider defines external data interfaces for the crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::config::WatchOptions;
use crate::error::PositionError;
use crate::types::GeoSample;

/// An event delivered by a position subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Sample(GeoSample),
    Error(PositionError),
}

/// The `PositionSource` trait defines how the recorder subscribes to position
/// updates.
///
/// Dropping the returned stream unsubscribes. The stream ending means the
/// source has gone away for good.
pub trait PositionSource: Send + Sync {
    type Stream: Stream<Item = StreamEvent> + Send + Unpin;

    /// Start watching the device position.
    ///
    /// # Errors
    ///
    /// Returns an error when no position source is available.
    fn subscribe(&self, options: &WatchOptions) -> Result<Self::Stream>;
}

/// Processing-time clock. Stamps anchors and drives the interval gate.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock driven by the samples being replayed, so a recorded log produces the
/// same journey regardless of how fast it is fed.
#[derive(Clone, Debug, Default)]
pub struct ReplayClock {
    millis: Arc<AtomicI64>,
}

impl ReplayClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { millis: Arc::new(AtomicI64::new(start.timestamp_millis())) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.millis.store(now.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ReplayClock {
    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}
