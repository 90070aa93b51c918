//! Parsing and formatting of punishment durations.

/// Fallback when no (or an unparseable) duration is given.
const DEFAULT_DURATION_MS: u64 = 10 * 60 * 1000;

/// Parse a duration argument like `30s`, `10m`, `2h` or `1d` into
/// milliseconds. Empty or invalid input falls back to ten minutes.
#[must_use]
pub fn parse_time_to_ms(time_str: &str) -> u64 {
    let trimmed = time_str.trim().to_ascii_lowercase();
    if trimmed.len() < 2 {
        return DEFAULT_DURATION_MS;
    }

    let (digits, unit) = trimmed.split_at(trimmed.len() - 1);
    let Ok(value) = digits.parse::<u64>() else {
        return DEFAULT_DURATION_MS;
    };

    // Saturate rather than overflow on absurdly large inputs
    match unit {
        "s" => value.saturating_mul(1000),
        "m" => value.saturating_mul(60 * 1000),
        "h" => value.saturating_mul(60 * 60 * 1000),
        "d" => value.saturating_mul(24 * 60 * 60 * 1000),
        _ => DEFAULT_DURATION_MS,
    }
}

/// Find the first duration-shaped token (`\d+[smhd]`) after the command word.
#[must_use]
pub fn extract_time_argument(message_body: &str) -> Option<String> {
    message_body
        .split_whitespace()
        .skip(1)
        .find(|part| is_time_token(part))
        .map(|part| part.to_ascii_lowercase())
}

fn is_time_token(part: &str) -> bool {
    let Some(last) = part.chars().last() else {
        return false;
    };
    if !matches!(last.to_ascii_lowercase(), 's' | 'm' | 'h' | 'd') {
        return false;
    }
    let digits = &part[..part.len() - 1];
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Humanize a duration, showing at most the two largest units.
#[must_use]
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        let remaining_hours = hours % 24;
        if remaining_hours > 0 {
            format!(
                "{} and {}",
                plural(days, "day"),
                plural(remaining_hours, "hour")
            )
        } else {
            plural(days, "day")
        }
    } else if hours > 0 {
        let remaining_minutes = minutes % 60;
        if remaining_minutes > 0 {
            format!(
                "{} and {}",
                plural(hours, "hour"),
                plural(remaining_minutes, "minute")
            )
        } else {
            plural(hours, "hour")
        }
    } else if minutes > 0 {
        plural(minutes, "minute")
    } else {
        plural(seconds, "second")
    }
}

fn plural(value: u64, unit: &str) -> String {
    if value == 1 {
        format!("1 {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_time_to_ms("30s"), 30 * 1000);
        assert_eq!(parse_time_to_ms("5m"), 5 * 60 * 1000);
        assert_eq!(parse_time_to_ms("2h"), 2 * 60 * 60 * 1000);
        assert_eq!(parse_time_to_ms("1d"), 24 * 60 * 60 * 1000);
        assert_eq!(parse_time_to_ms(" 10M "), 10 * 60 * 1000);
    }

    #[test]
    fn test_parse_falls_back_to_ten_minutes() {
        assert_eq!(parse_time_to_ms(""), DEFAULT_DURATION_MS);
        assert_eq!(parse_time_to_ms("soon"), DEFAULT_DURATION_MS);
        assert_eq!(parse_time_to_ms("10"), DEFAULT_DURATION_MS);
        assert_eq!(parse_time_to_ms("m5"), DEFAULT_DURATION_MS);
        assert_eq!(parse_time_to_ms("5w"), DEFAULT_DURATION_MS);
    }

    #[test]
    fn test_parse_saturates_on_huge_values() {
        assert_eq!(parse_time_to_ms("100000000000000000d"), u64::MAX);
        assert_eq!(
            parse_time_to_ms(&format!("{}s", u64::MAX)),
            u64::MAX
        );
    }

    #[test]
    fn test_extract_time_argument() {
        assert_eq!(
            extract_time_argument("/timeout @alice 10m").as_deref(),
            Some("10m")
        );
        assert_eq!(
            extract_time_argument("/timeout 2H @bob").as_deref(),
            Some("2h")
        );
        assert_eq!(extract_time_argument("/timeout @alice"), None);
        // The command word itself never counts as the argument
        assert_eq!(extract_time_argument("10m"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(40 * 1000), "40 seconds");
        assert_eq!(format_duration(1000), "1 second");
        assert_eq!(format_duration(5 * 60 * 1000), "5 minutes");
        assert_eq!(format_duration(90 * 60 * 1000), "1 hour and 30 minutes");
        assert_eq!(format_duration(2 * 60 * 60 * 1000), "2 hours");
        assert_eq!(
            format_duration(26 * 60 * 60 * 1000),
            "1 day and 2 hours"
        );
        assert_eq!(format_duration(48 * 60 * 60 * 1000), "2 days");
    }
}
