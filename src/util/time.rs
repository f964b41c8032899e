//! Time and duration parsing utilities.

use crate::error::{FixitError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

/// Parse a duration spec into a [`Duration`].
///
/// Supports:
/// - Bare seconds: `3600`
/// - Unit suffixes: `30s`, `15m`, `12h`, `7d`, `2w`
///
/// # Errors
///
/// Returns a validation error naming `field_name` if the amount is not a
/// non-negative integer or the unit is not one of s, m, h, d, w.
pub fn parse_duration_spec(s: &str, field_name: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(FixitError::validation(field_name, "empty duration"));
    }

    if let Ok(seconds) = s.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let Some(unit_char) = s.chars().last() else {
        return Err(FixitError::validation(field_name, "empty duration"));
    };
    let amount_str = &s[..s.len() - unit_char.len_utf8()];
    let amount = amount_str.trim().parse::<u64>().map_err(|_| {
        FixitError::validation(
            field_name,
            format!("invalid duration '{s}' (try: 30m, 12h, 7d, 2w, or seconds)"),
        )
    })?;

    let multiplier = match unit_char.to_ascii_lowercase() {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        'w' => 7 * 24 * 60 * 60,
        _ => {
            return Err(FixitError::validation(
                field_name,
                "invalid unit (use s, m, h, d, w)",
            ));
        }
    };

    amount
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| FixitError::validation(field_name, "duration too large"))
}

/// Canonical timestamp text stored in the database.
///
/// Fixed-width microseconds keep lexical and chronological order identical.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored RFC3339 timestamp.
///
/// # Errors
///
/// Returns an error if the text is not RFC3339.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FixitError::Other(anyhow::anyhow!("invalid timestamp '{s}': {e}")))
}

/// Short human form of how long ago `ts` was, e.g. `5m ago`.
#[must_use]
pub fn format_age(ts: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let secs = (*now - *ts).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
