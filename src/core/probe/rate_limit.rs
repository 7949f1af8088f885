//! Rate-limit header extraction
//!
//! Maps response headers onto a `RateLimitSnapshot`. Recognized headers
//! (case-insensitive):
//!
//! - `x-ratelimit-limit` → `limit`
//! - `x-ratelimit-remaining` → `remaining`
//! - `x-ratelimit-reset` → `reset` (epoch seconds; values below 10^9 are
//!   treated as delta-seconds from `now`)
//! - `retry-after` → `retry_after_seconds` (delta-seconds or HTTP-date)
//!
//! Unparseable values become `None`. Raw strings are always kept so
//! non-standard servers can still be diagnosed from the report.

use std::collections::{BTreeMap, HashMap};

use crate::core::probe::types::RateLimitSnapshot;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";
pub const RETRY_AFTER_HEADER: &str = "retry-after";

pub const RATE_LIMIT_HEADERS: [&str; 4] = [
    LIMIT_HEADER,
    REMAINING_HEADER,
    RESET_HEADER,
    RETRY_AFTER_HEADER,
];

// Anything smaller cannot be a plausible epoch timestamp (2001-09-09).
const EPOCH_THRESHOLD: u64 = 1_000_000_000;

/// Extract a rate-limit snapshot from response headers
///
/// # Arguments
/// * `headers` - Response headers, any key casing
/// * `now_epoch` - Current time in epoch seconds, used for relative values
///
/// # Returns
/// Always a snapshot; check `has_signal()` to see whether any header was present.
pub fn extract_rate_limit(headers: &HashMap<String, String>, now_epoch: u64) -> RateLimitSnapshot {
    let raw: BTreeMap<String, Option<String>> = RATE_LIMIT_HEADERS
        .iter()
        .map(|name| (name.to_string(), find_header(headers, name)))
        .collect();

    let value = |name: &str| raw.get(name).and_then(|v| v.as_deref());

    RateLimitSnapshot {
        limit: value(LIMIT_HEADER).and_then(parse_count),
        remaining: value(REMAINING_HEADER).and_then(parse_count),
        reset: value(RESET_HEADER).and_then(|v| parse_reset(v, now_epoch)),
        retry_after_seconds: value(RETRY_AFTER_HEADER).and_then(|v| parse_retry_after(v, now_epoch)),
        raw,
    }
}

fn find_header(headers: &HashMap<String, String>, name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.clone())
}

/// Parse a non-negative count
///
/// Accepts plain integers, decimals (floored), and list forms such as
/// `100, 100;w=60` where only the first item is used.
fn parse_count(value: &str) -> Option<u64> {
    let first = value.split(',').next()?.split(';').next()?.trim();
    if first.is_empty() {
        return None;
    }
    if let Ok(n) = first.parse::<u64>() {
        return Some(n);
    }
    match first.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 => Some(f.floor() as u64),
        _ => None,
    }
}

fn parse_reset(value: &str, now_epoch: u64) -> Option<u64> {
    let n = parse_count(value)?;
    if n < EPOCH_THRESHOLD {
        Some(now_epoch.saturating_add(n))
    } else {
        Some(n)
    }
}

fn parse_retry_after(value: &str, now_epoch: u64) -> Option<u64> {
    if let Some(seconds) = parse_count(value) {
        return Some(seconds);
    }
    let date = chrono::DateTime::parse_from_rfc2822(value.trim()).ok()?;
    let delta = date.timestamp() - now_epoch as i64;
    Some(delta.max(0) as u64)
}
