//! Property-based tests for duration specs and stored timestamps.
//!
//! Uses proptest to verify that:
//! - Bare seconds and unit suffixes parse to the expected duration
//! - Unknown units and garbage are rejected with the field name
//! - Stored timestamps roundtrip at microsecond precision

use campus_fixit::util::time::{format_timestamp, parse_duration_spec, parse_timestamp};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::time::Duration;
use tracing::info;

fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        ..Default::default()
    })]

    /// Property: a bare integer is a number of seconds
    #[test]
    fn bare_seconds_parse(seconds in 0u64..10_000_000u64) {
        init_test_logging();
        let parsed = parse_duration_spec(&seconds.to_string(), "test").unwrap();
        prop_assert_eq!(parsed, Duration::from_secs(seconds));
    }

    /// Property: unit suffixes multiply, in either case
    #[test]
    fn unit_suffixes_multiply(
        amount in 0u64..10_000u64,
        unit in prop::sample::select(vec![('s', 1u64), ('m', 60), ('h', 3_600), ('d', 86_400), ('w', 604_800)]),
        upper in any::<bool>(),
    ) {
        init_test_logging();
        let (suffix, multiplier) = unit;
        let suffix = if upper { suffix.to_ascii_uppercase() } else { suffix };
        let spec = format!("{amount}{suffix}");
        info!("proptest_duration: spec={spec}");

        let parsed = parse_duration_spec(&spec, "test").unwrap();
        prop_assert_eq!(parsed, Duration::from_secs(amount * multiplier));
    }

    /// Property: unknown unit letters are rejected
    #[test]
    fn unknown_units_rejected(amount in 0u64..1_000u64, unit in "[a-zA-Z]") {
        init_test_logging();
        prop_assume!(!matches!(unit.to_ascii_lowercase().as_str(), "s" | "m" | "h" | "d" | "w"));
        let spec = format!("{amount}{unit}");
        let err = parse_duration_spec(&spec, "jwt.expires-in").unwrap_err();
        prop_assert_eq!(err.field_errors()[0].field.as_str(), "jwt.expires-in");
    }

    /// Property: non-numeric amounts are rejected
    #[test]
    fn non_numeric_amount_rejected(word in "[a-z]{2,8}") {
        init_test_logging();
        let spec = format!("{word}d");
        prop_assert!(parse_duration_spec(&spec, "test").is_err());
    }

    /// Property: format then parse returns the same instant
    #[test]
    fn timestamp_roundtrip(
        secs in 1_500_000_000i64..2_000_000_000i64,
        micros in 0u32..1_000_000u32,
    ) {
        init_test_logging();
        let original = Utc.timestamp_opt(secs, micros * 1_000).unwrap();
        let stored = format_timestamp(&original);
        prop_assert!(stored.ends_with('Z'), "stored as UTC: {stored}");
        prop_assert_eq!(parse_timestamp(&stored).unwrap(), original);
    }
}

#[test]
fn overflow_is_rejected() {
    init_test_logging();
    let spec = format!("{}w", u64::MAX / 2);
    assert!(parse_duration_spec(&spec, "test").is_err());
}

#[test]
fn blank_is_rejected() {
    init_test_logging();
    assert!(parse_duration_spec("   ", "test").is_err());
}
