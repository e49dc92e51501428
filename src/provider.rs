//! # Provider
//!
//! Host implementations of the tracker and route store seams.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::stream::BoxStream;
use routes::{RouteStore, StoredRoute};
use tracing::{debug, warn};
use tracker::{PositionSource, ReplayClock, StreamEvent, WatchOptions};

/// Position source fed from a channel. Can be subscribed once. Delivered
/// samples move the replay clock to their own timestamp.
pub struct ChannelSource {
    events: Mutex<Option<UnboundedReceiver<StreamEvent>>>,
    clock: ReplayClock,
}

impl ChannelSource {
    pub fn new(clock: ReplayClock) -> (Self, UnboundedSender<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded();
        (Self { events: Mutex::new(Some(rx)), clock }, tx)
    }
}

impl PositionSource for ChannelSource {
    type Stream = BoxStream<'static, StreamEvent>;

    fn subscribe(&self, options: &WatchOptions) -> Result<Self::Stream> {
        let events = self
            .events
            .lock()
            .map_err(|e| anyhow!("source lock poisoned: {e}"))?
            .take()
            .ok_or_else(|| anyhow!("position log already consumed"))?;
        debug!(high_accuracy = options.high_accuracy, "replay subscription opened");

        let clock = self.clock.clone();
        let stream = events.inspect(move |event| {
            if let StreamEvent::Sample(sample) = event {
                clock.set(sample.timestamp);
            }
        });
        Ok(stream.boxed())
    }
}

/// Saved routes as a JSON array in a single file.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl RouteStore for FileStore {
    async fn load_all(&self) -> Result<Vec<StoredRoute>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", self.path.display()));
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(routes) => Ok(routes),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to parse stored routes");
                Ok(vec![])
            }
        }
    }

    async fn save_all(&self, routes: &[StoredRoute]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(routes).context("serializing routes")?;
        tokio::fs::write(&self.path, bytes)
            .await
            .with_context(|| format!("writing {}", self.path.display()))
    }
}
