//! Display formatting for signed millisecond durations

/// Prefix for overtime values (U+2212, not an ASCII hyphen)
pub const MINUS_SIGN: &str = "\u{2212}";

/// Render as `HH:MM:SS`, flooring to whole seconds
pub fn format_time(ms: f64) -> String {
    let Some((negative, total_seconds)) = split_sign(ms) else {
        return "--:--:--".to_string();
    };
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{}{:02}:{:02}:{:02}", sign(negative), hours, minutes, seconds)
}

/// Render as `MM:SS`, minutes are not wrapped into hours
pub fn format_short_time(ms: f64) -> String {
    let Some((negative, total_seconds)) = split_sign(ms) else {
        return "--:--".to_string();
    };
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{}{:02}:{:02}", sign(negative), minutes, seconds)
}

fn split_sign(ms: f64) -> Option<(bool, u64)> {
    if !ms.is_finite() {
        return None;
    }
    // float-to-int casts saturate
    let total_seconds = (ms.abs() / 1000.0).floor() as u64;
    Some((ms < 0.0, total_seconds))
}

fn sign(negative: bool) -> &'static str {
    if negative { MINUS_SIGN } else { "" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_time(3_723_000.0), "01:02:03");
        assert_eq!(format_time(0.0), "00:00:00");
        assert_eq!(format_time(59_999.9), "00:00:59");
    }

    #[test]
    fn negative_values_use_unicode_minus() {
        assert_eq!(format_time(-5000.0), "\u{2212}00:00:05");
        assert_eq!(format_time(-1000.0), "−00:00:01");
        assert_eq!(format_short_time(-65_500.0), "−01:05");
        assert!(!format_time(-5000.0).starts_with('-'));
    }

    #[test]
    fn short_format_keeps_total_minutes() {
        assert_eq!(format_short_time(65_000.0), "01:05");
        assert_eq!(format_short_time(3_723_000.0), "62:03");
    }

    #[test]
    fn survives_extreme_input() {
        assert_eq!(format_time(360_000_000.0), "100:00:00");
        assert!(!format_time(f64::MAX).is_empty());
        assert!(!format_short_time(-f64::MAX).is_empty());
        assert_eq!(format_time(f64::NAN), "--:--:--");
        assert_eq!(format_short_time(f64::INFINITY), "--:--");
        assert_eq!(format_time(1234.567), "00:00:01");
    }
}
