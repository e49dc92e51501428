use std::path::PathBuf;
use std::time::Duration;

/// Sample log to replay: the first argument, else `JOURNEY_SAMPLES`. `None`
/// means read standard input.
pub fn get_samples_path() -> Option<PathBuf> {
    if let Some(arg) = std::env::args_os().nth(1) {
        return Some(PathBuf::from(arg));
    }
    std::env::var_os("JOURNEY_SAMPLES").map(PathBuf::from).or_else(|| {
        tracing::trace!("JOURNEY_SAMPLES not set, reading samples from stdin");
        None
    })
}

pub fn get_routes_path() -> PathBuf {
    std::env::var_os("JOURNEY_ROUTES").map_or_else(
        || {
            let default = PathBuf::from("routes.json");
            tracing::trace!("JOURNEY_ROUTES not set, using default: {}", default.display());
            default
        },
        PathBuf::from,
    )
}

/// How long to wait for the end point once all input has been fed.
pub fn get_stop_timeout() -> Duration {
    std::env::var("JOURNEY_STOP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map_or_else(
            || {
                let default = Duration::from_secs(30);
                tracing::trace!("JOURNEY_STOP_TIMEOUT_SECS not set, using default: {default:?}");
                default
            },
            Duration::from_secs,
        )
}
