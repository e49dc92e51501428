//! # Replay
//!
//! Drives a recorder from a recorded position log. The log is newline
//! delimited JSON, one event per line:
//!
//! ```text
//! {"type":"sample","latitude":-36.85,"longitude":174.76,"accuracy":4.0,"timestamp":"2026-03-01T08:00:00Z"}
//! {"type":"error","kind":"timeout"}
//! {"type":"stop"}
//! ```

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use futures::channel::mpsc::UnboundedSender;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracker::{
    Clock, GeoSample, Outcome, PositionError, PositionSource, Recorder, RecorderHandle, Snapshot,
    StreamEvent,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    Sample(GeoSample),
    Error { kind: PositionError },
    Stop,
}

/// Read a whole position log without blocking the runtime.
///
/// # Errors
///
/// Returns an error when the reader fails or the log is not UTF-8.
pub async fn read_log<R: AsyncRead + Unpin>(mut reader: R) -> Result<String> {
    let mut input = String::new();
    reader.read_to_string(&mut input).await.context("reading position log")?;
    Ok(input)
}

/// Parse a position log. Blank lines are skipped.
///
/// # Errors
///
/// Returns an error naming the first line that is not a valid event.
pub fn parse(input: &str) -> Result<Vec<ReplayEvent>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid event on line {}", index + 1))
        })
        .collect()
}

/// Replay `events` through `recorder` and wait for it to finish.
///
/// A stop is requested at the end of the log unless the log contains one.
/// The recorder is then given `stop_timeout` to stabilize the end point and
/// is cancelled if it cannot.
///
/// # Errors
///
/// Returns an error when the recorder fails to start.
pub async fn run<S, C>(
    recorder: &mut Recorder<S, C>, handle: RecorderHandle, events: Vec<ReplayEvent>,
    feed: UnboundedSender<StreamEvent>, stop_timeout: Duration,
) -> Result<Outcome>
where
    S: PositionSource,
    C: Clock,
{
    // subscribe before the run publishes its first snapshot
    let snapshots = handle.watch();
    let recording = recorder.run();
    tokio::pin!(recording);

    // keeps the stream open while waiting for the end point
    let _feed = tokio::select! {
        outcome = &mut recording => return Ok(outcome?),
        fed = deliver(&handle, snapshots, events, feed) => fed?,
    };

    info!(timeout = ?stop_timeout, "input exhausted, waiting for end point");
    if let Ok(outcome) = tokio::time::timeout(stop_timeout, &mut recording).await {
        return Ok(outcome?);
    }

    warn!("end point not stabilized in time, cancelling");
    handle.cancel();
    Ok(recording.await?)
}

// Returns the sender once everything has been delivered.
async fn deliver(
    handle: &RecorderHandle, mut snapshots: watch::Receiver<Snapshot>, events: Vec<ReplayEvent>,
    feed: UnboundedSender<StreamEvent>,
) -> Result<UnboundedSender<StreamEvent>> {
    snapshots.changed().await.context("recorder did not start")?;

    let mut stop_requested = false;
    for event in events {
        let event = match event {
            ReplayEvent::Sample(sample) => StreamEvent::Sample(sample),
            ReplayEvent::Error { kind } => StreamEvent::Error(kind),
            ReplayEvent::Stop => {
                debug!("stop requested by log");
                drop(handle.request_stop());
                stop_requested = true;
                continue;
            }
        };

        feed.unbounded_send(event).map_err(|e| anyhow!("recorder stopped listening: {e}"))?;
        snapshots.changed().await.context("recorder stopped publishing")?;
    }

    if !stop_requested {
        debug!("stop requested at end of log");
        drop(handle.request_stop());
    }

    Ok(feed)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration as TimeDelta, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tracker::{Config, ReplayClock, Status};

    use super::*;
    use crate::provider::ChannelSource;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).single().expect("valid time")
    }

    fn line(latitude: f64, longitude: f64, secs: i64) -> String {
        let sample = GeoSample::new(latitude, longitude, 5.0, t0() + TimeDelta::seconds(secs));
        serde_json::to_string(&ReplayEvent::Sample(sample)).expect("serialize")
    }

    fn log(lines: &[String]) -> Vec<ReplayEvent> {
        parse(&lines.join("\n")).expect("valid log")
    }

    async fn run_log(events: Vec<ReplayEvent>) -> Outcome {
        let clock = ReplayClock::new(t0());
        let (source, feed) = ChannelSource::new(clock.clone());
        let (mut recorder, handle) =
            Recorder::new(Config::default(), source, clock).expect("valid config");

        run(&mut recorder, handle, events, feed, Duration::from_millis(200))
            .await
            .expect("replay")
    }

    #[test]
    fn parses_each_event_kind() {
        let input = r#"
{"type":"sample","latitude":-36.85,"longitude":174.76,"accuracy":4.0,"timestamp":"2026-03-01T08:00:00Z","speed":1.5}

{"type":"error","kind":"timeout"}
{"type":"stop"}
"#;
        let events = parse(input).expect("valid log");

        let sample = GeoSample::new(-36.85, 174.76, 4.0, t0()).with_speed(1.5);
        assert_eq!(events, vec![
            ReplayEvent::Sample(sample),
            ReplayEvent::Error { kind: PositionError::Timeout },
            ReplayEvent::Stop,
        ]);
    }

    #[test]
    fn reports_bad_line() {
        let input = "{\"type\":\"stop\"}\n{\"type\":\"teleport\"}";
        let err = parse(input).expect_err("unknown event");
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[tokio::test]
    async fn reads_log_from_async_reader() {
        let input = "{\"type\":\"stop\"}\n".as_bytes();
        let log = read_log(input).await.expect("read");
        assert_eq!(parse(&log).expect("valid log"), vec![ReplayEvent::Stop]);

        let invalid: &[u8] = &[0xff, 0xfe];
        read_log(invalid).await.expect_err("not utf-8");
    }

    #[tokio::test]
    async fn replays_complete_journey() {
        let mut lines: Vec<String> = (0..5).map(|secs| line(0.0, 0.0, secs)).collect();
        lines.push(line(0.0, 0.0001, 7));
        lines.push(line(0.0, 0.0002, 10));
        lines.push(r#"{"type":"stop"}"#.to_string());
        lines.extend((20..25).map(|secs| line(0.0, 0.0002, secs)));

        let Outcome::Finished(snapshot) = run_log(log(&lines)).await else {
            panic!("journey should finish");
        };
        assert_eq!(snapshot.status, Status::Finished);
        assert_eq!(snapshot.track_points.len(), 4);
        assert!((snapshot.total_distance_meters - 22.3).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn stops_at_end_of_log() {
        let mut lines: Vec<String> = (0..5).map(|secs| line(0.0, 0.0, secs)).collect();
        lines.push(line(0.0, 0.0001, 7));

        // no end burst follows, so the end point never stabilizes
        let outcome = run_log(log(&lines)).await;
        assert_eq!(outcome, Outcome::Cancelled);
    }
}
