/// Formatting helpers for logs and reports

use chrono::{TimeZone, Utc};
use humansize::{format_size, BINARY};

/// Render a Unix timestamp as RFC 3339, falling back to the raw number.
pub fn format_timestamp(t: i64) -> String {
    Utc.timestamp_opt(t, 0)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| t.to_string())
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, BINARY)
}

/// Print formatted number with thousands separator
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
