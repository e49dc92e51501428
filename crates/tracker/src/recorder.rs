//! # Recorder
//!
//! Async driver around a [`TrackingSession`]. The recorder owns the position
//! subscription and the session; callers interact through a cloneable
//! [`RecorderHandle`] that issues stop/cancel commands and observes snapshots.

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::Config;
use crate::error::Error;
use crate::provider::{Clock, PositionSource, StreamEvent};
use crate::session::{Progress, Snapshot, Status, TrackingSession};

#[derive(Debug)]
enum Command {
    Stop(oneshot::Sender<Snapshot>),
    Cancel,
}

/// How a recording run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The end anchor was produced. Hand this snapshot to persistence.
    Finished(Snapshot),
    /// Cancelled by the caller. Nothing to persist.
    Cancelled,
    /// The position source ended the stream before the journey finished.
    /// Collected data is kept in the snapshot; pending stops are abandoned.
    StreamClosed(Snapshot),
}

/// Caller side of a recorder.
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
}

impl RecorderHandle {
    /// Ask the recorder to collect the end anchor. The returned receiver
    /// completes once, with the finished snapshot, or immediately with the
    /// current snapshot when nothing is being tracked.
    #[must_use]
    pub fn request_stop(&self) -> oneshot::Receiver<Snapshot> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Stop(tx)).is_err() {
            debug!("stop requested after recorder exited");
        }
        rx
    }

    /// Stop and wait for the end anchor.
    ///
    /// There is no built-in timeout: a stalled stream never produces the end
    /// anchor. Wrap in `tokio::time::timeout` and [`Self::cancel`] on expiry.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` when the run ends without finishing.
    pub async fn stop(&self) -> Result<Snapshot> {
        self.request_stop()
            .await
            .map_err(|err| Error::Cancelled(format!("end point was not stabilized: {err}")))
    }

    pub fn cancel(&self) {
        if self.commands.send(Command::Cancel).is_err() {
            debug!("cancel requested after recorder exited");
        }
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }
}

pub struct Recorder<S, C> {
    config: Config,
    session: TrackingSession,
    source: S,
    clock: C,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<Snapshot>,
    waiters: Vec<oneshot::Sender<Snapshot>>,
}

impl<S, C> Recorder<S, C>
where
    S: PositionSource,
    C: Clock,
{
    /// Create a recorder and the handle used to control it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` when the configuration fails validation.
    pub fn new(config: Config, source: S, clock: C) -> Result<(Self, RecorderHandle)> {
        config.validate()?;

        let session = TrackingSession::new(&config);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(session.snapshot());

        let recorder = Self {
            config,
            session,
            source,
            clock,
            commands: commands_rx,
            snapshots: snapshots_tx,
            waiters: Vec::new(),
        };
        let handle = RecorderHandle { commands: commands_tx, snapshots: snapshots_rx };

        Ok((recorder, handle))
    }

    /// Record one journey: subscribe, stabilize the start point, track until
    /// a stop has been requested and the end point is stabilized.
    ///
    /// The subscription is released exactly once when the run returns, or
    /// when the future is dropped.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the session is not idle and
    /// `Error::StreamUnavailable` if the source cannot be subscribed.
    pub async fn run(&mut self) -> Result<Outcome> {
        self.session.start()?;

        let stream = match self.source.subscribe(&self.config.watch_options()) {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "position source unavailable");
                self.session.unavailable();
                self.publish();
                return Err(Error::StreamUnavailable(err.to_string()));
            }
        };
        let mut subscription = Subscription::new(stream);
        info!("position subscription started");
        self.publish();

        let mut commands_open = true;
        loop {
            let next = tokio::select! {
                biased;
                command = self.commands.recv(), if commands_open => Next::Command(command),
                event = subscription.next() => Next::Event(event),
            };

            match next {
                Next::Command(None) => commands_open = false,
                Next::Command(Some(Command::Stop(waiter))) => self.stop(waiter),
                Next::Command(Some(Command::Cancel)) => {
                    subscription.release();
                    self.session.cancel();
                    self.waiters.clear();
                    self.publish();
                    return Ok(Outcome::Cancelled);
                }
                Next::Event(Some(StreamEvent::Sample(sample))) => {
                    let progress = self.session.apply(&sample, self.clock.now_utc());
                    self.publish();

                    if progress == Progress::Finished {
                        subscription.release();
                        let snapshot = self.session.snapshot();
                        for waiter in self.waiters.drain(..) {
                            let _ = waiter.send(snapshot.clone());
                        }
                        return Ok(Outcome::Finished(snapshot));
                    }
                }
                Next::Event(Some(StreamEvent::Error(err))) => {
                    warn!(error = %err, "position stream error");
                    self.session.stream_error(err);
                    self.publish();
                }
                Next::Event(None) => {
                    warn!(status = %self.session.status(), "position stream closed");
                    subscription.release();
                    self.session.stream_closed();
                    self.waiters.clear();
                    self.publish();
                    return Ok(Outcome::StreamClosed(self.session.snapshot()));
                }
            }
        }
    }

    fn stop(&mut self, waiter: oneshot::Sender<Snapshot>) {
        if self.session.is_pending_finish() || self.session.request_stop() {
            self.waiters.push(waiter);
            self.publish();
            return;
        }

        debug!(status = %self.session.status(), "stop requested while not tracking");
        let _ = waiter.send(self.session.snapshot());
    }

    /// Return a finished recorder to idle so another journey can be run.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` unless the last run finished.
    pub fn reset(&mut self) -> Result<()> {
        self.session.reset()?;
        self.publish();
        Ok(())
    }

    /// Discard whatever the last run left behind, e.g. after the stream
    /// closed mid-journey.
    pub fn cancel(&mut self) {
        self.session.cancel();
        self.publish();
    }

    #[must_use]
    pub const fn session(&self) -> &TrackingSession {
        &self.session
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.session.status()
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }
}

enum Next {
    Command(Option<Command>),
    Event(Option<StreamEvent>),
}

/// Owns the subscription stream and drops it exactly once.
struct Subscription<T> {
    stream: Option<T>,
}

impl<T> Subscription<T> {
    const fn new(stream: T) -> Self {
        Self { stream: Some(stream) }
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            info!("position subscription released");
        }
    }
}

impl<T: Stream<Item = StreamEvent> + Unpin> Subscription<T> {
    async fn next(&mut self) -> Option<StreamEvent> {
        match self.stream.as_mut() {
            Some(stream) => stream.next().await,
            None => None,
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}
