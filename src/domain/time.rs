//! Timestamp parsing shared by the collectors.
//!
//! Every parser returns `None` on malformed input; an unparsable timestamp
//! never fails the entry it belongs to.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

static CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}):(\d{2})(?::(\d{2}))?").expect("valid clock regex"));

/// China Standard Time, the native zone of the domestic sources.
pub fn beijing() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).expect("UTC+8 is a valid offset")
}

/// RSS `pubDate`, e.g. `Mon, 01 Jan 2024 00:00:00 GMT`.
pub fn parse_rfc2822(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(s.trim()).ok()
}

/// Atom `updated`/`published`. A trailing `Z` resolves to `+00:00`.
pub fn parse_iso8601(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%:z"))
        .ok()
}

/// Unix seconds interpreted in Beijing time.
pub fn from_unix(secs: i64) -> Option<DateTime<FixedOffset>> {
    beijing().timestamp_opt(secs, 0).single()
}

/// Accepts a JSON number or a numeric string.
pub fn unix_from_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Naive local time in the given format, interpreted in Beijing time.
pub fn parse_beijing(s: &str, fmt: &str) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), fmt).ok()?;
    beijing().from_local_datetime(&naive).single()
}

/// Resolve the first `HH:MM[:SS]` found in `text` to a timestamp on the day
/// of `now`.
///
/// Live tickers only show a wall-clock time. If the result would lie more
/// than five minutes after `now` it belongs to the previous day.
pub fn resolve_clock_time(text: &str, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let caps = CLOCK_RE.captures(text)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    let second: u32 = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    let naive = now.date_naive().and_time(time);
    let resolved = now.timezone().from_local_datetime(&naive).single()?;

    if resolved > now + Duration::minutes(5) {
        Some(resolved - Duration::days(1))
    } else {
        Some(resolved)
    }
}
