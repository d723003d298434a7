//! Tests for domain models.

use std::str::FromStr;

use crate::db::{ChorePatch, RepeatType};

#[test]
fn repeat_type_round_trips_through_strings() {
    for repeat in [RepeatType::OneTime, RepeatType::Daily, RepeatType::Weekly] {
        assert_eq!(RepeatType::from_str(&repeat.to_string()).unwrap(), repeat);
    }
}

#[test]
fn repeat_type_rejects_unknown_values() {
    let err = RepeatType::from_str("monthly").unwrap_err();
    assert!(err.contains("monthly"));
}

#[test]
fn repeat_type_serializes_with_hyphen() {
    let json = serde_json::to_string(&RepeatType::OneTime).unwrap();
    assert_eq!(json, "\"one-time\"");
    let parsed: RepeatType = serde_json::from_str("\"weekly\"").unwrap();
    assert_eq!(parsed, RepeatType::Weekly);
}

#[test]
fn default_repeat_type_is_one_time() {
    assert_eq!(RepeatType::default(), RepeatType::OneTime);
}

#[test]
fn empty_patch_is_detected() {
    assert!(ChorePatch::default().is_empty());

    let patch = ChorePatch {
        details: Some(None),
        ..Default::default()
    };
    assert!(!patch.is_empty());
}
