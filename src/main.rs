//! # Journey
//!
//! Replays a recorded position log through the journey tracker and saves the
//! finished journey to the route file.

mod config;
mod provider;
mod replay;

use anyhow::{Context, Result};
use chrono::Utc;
use routes::{RouteBook, StoredRoute, format_distance, format_duration};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};
use tracker::{Config, Outcome, Recorder, ReplayClock};

use crate::provider::{ChannelSource, FileStore};
use crate::replay::ReplayEvent;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    Registry::default().with(filter).with(fmt::layer()).init();

    let input = match config::get_samples_path() {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => replay::read_log(tokio::io::stdin()).await.context("reading stdin")?,
    };
    let events = replay::parse(&input)?;

    let start = events
        .iter()
        .find_map(|event| match event {
            ReplayEvent::Sample(sample) => Some(sample.timestamp),
            _ => None,
        })
        .unwrap_or_else(Utc::now);
    let clock = ReplayClock::new(start);

    let (source, feed) = ChannelSource::new(clock.clone());
    let (mut recorder, handle) = Recorder::new(Config::from_env(), source, clock)?;
    info!(events = events.len(), "replaying position log");

    let outcome =
        replay::run(&mut recorder, handle, events, feed, config::get_stop_timeout()).await?;

    match outcome {
        Outcome::Finished(snapshot) => {
            let route = StoredRoute::try_from(&snapshot)?;
            let duration = route.duration().map(format_duration).unwrap_or_default();
            info!(
                distance = %format_distance(route.total_distance),
                straight_line = %format_distance(snapshot.straight_line_distance_meters),
                duration = %duration,
                points = route.positions.len(),
                "journey completed"
            );

            let mut book = RouteBook::load(FileStore::new(config::get_routes_path())).await?;
            book.add(route).await?;
            info!(saved = book.routes().len(), "route saved");
        }
        Outcome::Cancelled => warn!("journey cancelled, nothing saved"),
        Outcome::StreamClosed(snapshot) => {
            warn!(
                status = %snapshot.status,
                points = snapshot.track_points.len(),
                "position stream ended early, nothing saved"
            );
        }
    }

    Ok(())
}
