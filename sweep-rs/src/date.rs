//! Date header parsing
//!
//! Accepts RFC 2822 dates as they appear in the wild (optional weekday,
//! obsolete zone names, trailing comments), RFC 3339 strings, and zone-less
//! dates, which are taken to be UTC. Anything else is rejected so the caller
//! can skip the message instead of guessing.

use chrono::{DateTime, NaiveDateTime, Utc};

const NAIVE_FORMATS: &[&str] = &["%d %b %Y %H:%M:%S", "%d %b %Y %H:%M"];

/// Parse a `Date:` header value into a UTC instant
pub fn parse_date_header(raw: &str) -> Option<DateTime<Utc>> {
    let value = strip_comments(raw.trim());
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    parse_naive(value)
}

/// Drop trailing `(comment)` groups, e.g. `+0000 (UTC)`
fn strip_comments(mut value: &str) -> &str {
    while value.ends_with(')') {
        match value.rfind('(') {
            Some(open) => value = value[..open].trim_end(),
            None => break,
        }
    }
    value
}

fn parse_naive(value: &str) -> Option<DateTime<Utc>> {
    // Weekday prefix ("Tue, ") carries no information once the date is known
    let without_weekday = match value.split_once(',') {
        Some((prefix, rest)) if prefix.trim().chars().all(|c| c.is_ascii_alphabetic()) => rest,
        _ => value,
    };
    let normalized = without_weekday.split_whitespace().collect::<Vec<_>>().join(" ");

    NAIVE_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(&normalized, format)
            .ok()
            .map(|naive| naive.and_utc())
    })
}
