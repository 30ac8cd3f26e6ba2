//! Compact "time since" rendering

use chrono::Duration;

const UNITS: [(i64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

/// Render a duration as its largest unit plus the next one, e.g. `3h 12m`.
///
/// Zero and negative durations render as `0s`.
pub fn format_since(duration: Duration) -> String {
    let seconds = duration.num_seconds().max(0);

    let Some(index) = UNITS.iter().position(|(size, _)| seconds >= *size) else {
        return "0s".to_string();
    };

    let (size, suffix) = UNITS[index];
    let mut text = format!("{}{}", seconds / size, suffix);

    if let Some((next_size, next_suffix)) = UNITS.get(index + 1) {
        let next = (seconds % size) / next_size;
        if next > 0 {
            text.push_str(&format!(" {}{}", next, next_suffix));
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_since() {
        assert_eq!(format_since(Duration::zero()), "0s");
        assert_eq!(format_since(Duration::seconds(-5)), "0s");
        assert_eq!(format_since(Duration::seconds(45)), "45s");
        assert_eq!(format_since(Duration::seconds(61)), "1m 1s");
        assert_eq!(format_since(Duration::minutes(90)), "1h 30m");
        assert_eq!(format_since(Duration::hours(3)), "3h");
        assert_eq!(format_since(Duration::hours(52)), "2d 4h");
        assert_eq!(
            format_since(Duration::days(2) + Duration::minutes(5)),
            "2d"
        );
    }
}
