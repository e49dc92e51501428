#![allow(missing_docs)]
#![allow(dead_code)]

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::Stream;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};
use tracker::{GeoSample, PositionError, PositionSource, ReplayClock, Snapshot, StreamEvent, WatchOptions};

pub fn init_tracing() {
    let _ = Registry::default().with(EnvFilter::new("debug")).with(fmt::layer()).try_init();
}

#[must_use]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).single().expect("valid time")
}

#[must_use]
pub fn fix(latitude: f64, longitude: f64, secs: i64) -> GeoSample {
    GeoSample::new(latitude, longitude, 5.0, t0() + Duration::seconds(secs))
}

/// Single-use position source fed through a channel. Each delivered sample
/// advances the shared replay clock to the sample's timestamp.
pub struct MockSource {
    events: Mutex<Option<UnboundedReceiver<StreamEvent>>>,
    clock: ReplayClock,
    released: Arc<AtomicUsize>,
    options: Arc<Mutex<Option<WatchOptions>>>,
}

impl MockSource {
    #[must_use]
    pub fn new(clock: ReplayClock) -> (Self, UnboundedSender<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded();
        let source = Self {
            events: Mutex::new(Some(rx)),
            clock,
            released: Arc::new(AtomicUsize::new(0)),
            options: Arc::new(Mutex::new(None)),
        };
        (source, tx)
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            events: Mutex::new(None),
            clock: ReplayClock::default(),
            released: Arc::new(AtomicUsize::new(0)),
            options: Arc::new(Mutex::new(None)),
        }
    }

    /// Number of times a subscription has been dropped.
    #[must_use]
    pub fn released(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.released)
    }

    #[must_use]
    pub fn options(&self) -> Arc<Mutex<Option<WatchOptions>>> {
        Arc::clone(&self.options)
    }
}

impl PositionSource for MockSource {
    type Stream = MockStream;

    fn subscribe(&self, options: &WatchOptions) -> Result<MockStream> {
        let mut events = self.events.lock().map_err(|e| anyhow!("{e}"))?;
        let events = events.take().ok_or_else(|| anyhow!("geolocation is not available"))?;
        *self.options.lock().map_err(|e| anyhow!("{e}"))? = Some(*options);

        Ok(MockStream { events, clock: self.clock.clone(), released: Arc::clone(&self.released) })
    }
}

pub struct MockStream {
    events: UnboundedReceiver<StreamEvent>,
    clock: ReplayClock,
    released: Arc<AtomicUsize>,
}

impl Stream for MockStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = Pin::new(&mut self.events).poll_next(cx);
        if let Poll::Ready(Some(StreamEvent::Sample(sample))) = &poll {
            self.clock.set(sample.timestamp);
        }
        poll
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Feeds events one at a time and waits for the recorder to publish.
pub struct Driver {
    events: UnboundedSender<StreamEvent>,
    snapshots: watch::Receiver<Snapshot>,
}

impl Driver {
    #[must_use]
    pub const fn new(events: UnboundedSender<StreamEvent>, snapshots: watch::Receiver<Snapshot>) -> Self {
        Self { events, snapshots }
    }

    /// Wait for the next published snapshot.
    pub async fn published(&mut self) -> Snapshot {
        self.snapshots.changed().await.expect("recorder should be running");
        self.snapshots.borrow_and_update().clone()
    }

    pub async fn sample(&mut self, sample: GeoSample) -> Snapshot {
        self.events.unbounded_send(StreamEvent::Sample(sample)).expect("stream open");
        self.published().await
    }

    /// Five identical fixes one second apart starting at `from`.
    pub async fn burst(&mut self, latitude: f64, longitude: f64, from: i64) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for secs in from..from + 5 {
            snapshot = self.sample(fix(latitude, longitude, secs)).await;
        }
        snapshot
    }

    pub async fn error(&mut self, err: PositionError) -> Snapshot {
        self.events.unbounded_send(StreamEvent::Error(err)).expect("stream open");
        self.published().await
    }

    /// End the stream from the source side.
    pub fn close(self) {
        self.events.close_channel();
    }
}
