use chrono::TimeDelta;

/// Human-readable distance: whole metres below a kilometre, otherwise
/// kilometres to two decimals.
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if meters < 1_000.0 {
        return format!("{} m", meters.round());
    }
    format!("{:.2} km", meters / 1_000.0)
}

/// Human-readable elapsed time, e.g. `1h 2m 3s`, `2m 3s` or `3s`. Negative
/// durations read as zero.
#[must_use]
pub fn format_duration(elapsed: TimeDelta) -> String {
    let total = elapsed.num_seconds().max(0);
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(12.4), "12 m");
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(1_000.0), "1.00 km");
        assert_eq!(format_distance(12_346.0), "12.35 km");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(TimeDelta::milliseconds(4_900)), "4s");
        assert_eq!(format_duration(TimeDelta::seconds(125)), "2m 5s");
        assert_eq!(format_duration(TimeDelta::seconds(3_600)), "1h 0m 0s");
        assert_eq!(format_duration(TimeDelta::seconds(3_723)), "1h 2m 3s");
        assert_eq!(format_duration(TimeDelta::seconds(-5)), "0s");
    }
}
