//! Common utilities and helpers

use std::time::Duration;

pub mod logging;

/// Formatting helpers for console output
pub struct Utils;

impl Utils {
    /// Format duration for display
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        let milliseconds = duration.subsec_millis();

        if hours > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }

    /// Percentage of `done` out of `total`, 0 when the total is unknown
    pub fn calculate_progress(done: Duration, total: Duration) -> f32 {
        if total.is_zero() {
            0.0
        } else {
            ((done.as_secs_f64() / total.as_secs_f64()) * 100.0).min(100.0) as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(Utils::format_duration(Duration::from_millis(4_250)), "00:04.250");
        assert_eq!(
            Utils::format_duration(Duration::from_secs(3_725)),
            "01:02:05.000"
        );
    }

    #[test]
    fn test_progress_is_clamped() {
        let total = Duration::from_secs(10);
        assert_eq!(Utils::calculate_progress(Duration::from_secs(5), total), 50.0);
        assert_eq!(Utils::calculate_progress(Duration::from_secs(12), total), 100.0);
        assert_eq!(Utils::calculate_progress(total, Duration::ZERO), 0.0);
    }
}
