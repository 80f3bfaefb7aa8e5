//! Units formatting and conversion utilities
//!
//! Provides functions for human-readable formatting of sample counts,
//! durations and sampling rates, and parsing of the same from the CLI.

use std::time::Duration;

/// Format a count with thousands separators
///
/// # Examples
/// ```
/// use montepi::util::units::format_count;
///
/// assert_eq!(format_count(999), "999");
/// assert_eq!(format_count(1234567), "1,234,567");
/// ```
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

/// Parse a human-readable count into a number
///
/// Accepts plain integers, `_` or `,` separators and the decimal
/// suffixes K, M, G, T (case-insensitive).
///
/// # Examples
/// ```
/// use montepi::util::units::parse_count;
///
/// assert_eq!(parse_count("1000").unwrap(), 1000);
/// assert_eq!(parse_count("10_000_000").unwrap(), 10_000_000);
/// assert_eq!(parse_count("2.5M").unwrap(), 2_500_000);
/// ```
pub fn parse_count(input: &str) -> Result<u64, String> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != '_' && *c != ',')
        .collect();

    if cleaned.is_empty() {
        return Err("Empty count".to_string());
    }

    if cleaned.starts_with('-') {
        return Err(format!("Count cannot be negative: {}", input.trim()));
    }

    let split_pos = cleaned
        .find(|c: char| c.is_alphabetic())
        .unwrap_or(cleaned.len());
    let (number_part, unit_part) = cleaned.split_at(split_pos);

    let multiplier = match unit_part.to_uppercase().as_str() {
        "" => 1u64,
        "K" => 1_000u64,
        "M" => 1_000_000u64,
        "G" | "B" => 1_000_000_000u64,
        "T" => 1_000_000_000_000u64,
        _ => return Err(format!("Unknown suffix: {}", unit_part)),
    };

    // Whole numbers stay exact; fractions are only meaningful with a suffix
    if let Ok(whole) = number_part.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| format!("Count too large: {}", input.trim()));
    }

    let number: f64 = number_part
        .parse()
        .map_err(|_| format!("Invalid number: {}", number_part))?;

    let scaled = number * multiplier as f64;
    let value = scaled.round();
    if (scaled - value).abs() > 1e-6 {
        return Err(format!("Count must be a whole number: {}", input.trim()));
    }
    if value > u64::MAX as f64 {
        return Err(format!("Count too large: {}", input.trim()));
    }

    Ok(value as u64)
}

/// Format duration into human-readable string
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use montepi::util::units::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 3600 {
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if total_secs >= 60 {
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;
        format!("{}m {}s", minutes, seconds)
    } else if total_secs > 0 {
        if millis > 0 {
            format!("{}.{:02}s", total_secs, millis / 10)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        format!("{}ms", millis)
    }
}

/// Parse duration string into Duration
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use montepi::util::units::parse_duration;
///
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("1m 30s").unwrap(), Duration::from_secs(90));
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    humantime::parse_duration(input.trim())
        .map_err(|e| format!("Invalid duration '{}': {}", input.trim(), e))
}

/// Calculate a per-second rate from a count and duration
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use montepi::util::units::calculate_rate;
///
/// let rate = calculate_rate(1000, Duration::from_millis(500));
/// assert!((rate - 2000.0).abs() < 0.01);
/// ```
pub fn calculate_rate(count: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }

    count as f64 / duration.as_secs_f64()
}

/// Format a sampling rate with appropriate units
///
/// # Examples
/// ```
/// use montepi::util::units::format_rate;
///
/// assert_eq!(format_rate(1500.0), "1.5K samples/s");
/// assert_eq!(format_rate(2500000.0), "2.5M samples/s");
/// ```
pub fn format_rate(per_second: f64) -> String {
    if per_second >= 1_000_000_000.0 {
        format!("{:.1}G samples/s", per_second / 1_000_000_000.0)
    } else if per_second >= 1_000_000.0 {
        format!("{:.1}M samples/s", per_second / 1_000_000.0)
    } else if per_second >= 1_000.0 {
        format!("{:.1}K samples/s", per_second / 1_000.0)
    } else {
        format!("{:.0} samples/s", per_second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(12), "12");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(100_000_000), "100,000,000");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("4").unwrap(), 4);
        assert_eq!(parse_count(" 1,000 ").unwrap(), 1000);
        assert_eq!(parse_count("10M").unwrap(), 10_000_000);
        assert_eq!(parse_count("10m").unwrap(), 10_000_000);
        assert_eq!(parse_count("1.5k").unwrap(), 1500);
        assert_eq!(parse_count("1.1K").unwrap(), 1100);
        assert_eq!(parse_count("1G").unwrap(), 1_000_000_000);
        assert_eq!(parse_count("0").unwrap(), 0);

        assert!(parse_count("").is_err());
        assert!(parse_count("-5").is_err());
        assert!(parse_count("abc").is_err());
        assert!(parse_count("1.5").is_err());
        assert!(parse_count("3X").is_err());
        assert!(parse_count("99999999999T").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));

        assert!(parse_duration("invalid").is_err());
        assert!(parse_duration("1x").is_err());
    }

    #[test]
    fn test_calculate_rate() {
        assert!((calculate_rate(1000, Duration::from_secs(1)) - 1000.0).abs() < 0.01);
        assert_eq!(calculate_rate(1000, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(500.0), "500 samples/s");
        assert_eq!(format_rate(1500.0), "1.5K samples/s");
        assert_eq!(format_rate(3_200_000_000.0), "3.2G samples/s");
    }
}
