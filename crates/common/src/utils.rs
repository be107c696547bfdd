//! Utility functions for the sentiment model service
//!
//! This module provides formatting helpers used in log messages.

use std::time::Duration;

/// Formats a byte size into a human-readable string
///
/// # Examples
///
/// ```
/// use common::utils::format_bytes;
///
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1048576), "1.0 MiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", value, UNITS[unit])
}

/// Formats a duration into a short human-readable string
///
/// # Examples
///
/// ```
/// use common::utils::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
/// assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs == 0 {
        let millis = duration.subsec_millis();
        if millis == 0 {
            return format!("{}µs", duration.subsec_micros());
        }
        return format!("{}ms", millis);
    }

    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut result = String::new();
    if hours > 0 {
        result.push_str(&format!("{}h ", hours));
    }
    if minutes > 0 || hours > 0 {
        result.push_str(&format!("{}m ", minutes));
    }
    result.push_str(&format!("{}s", seconds));

    result
}

/// Truncates a string to at most `max_chars` characters, adding an ellipsis if truncated
///
/// # Examples
///
/// ```
/// use common::utils::truncate_string;
///
/// assert_eq!(truncate_string("Hello, world!", 5), "Hello...");
/// assert_eq!(truncate_string("Hello", 10), "Hello");
/// ```
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
