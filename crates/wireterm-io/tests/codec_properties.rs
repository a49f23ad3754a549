//! Property-based tests for the unique-ID codec and natural sort.
//!
//! The codec must round-trip any device ID a driver can produce, and the
//! combined form must stay unambiguous for any valid driver name.

use std::cmp::Ordering;

use proptest::prelude::*;
use wireterm_io::{natural_compare, unique_id};

#[test]
fn prop_escape_unescape_roundtrip() {
    proptest!(|(device_id in ".*")| {
        let escaped = unique_id::escape(&device_id);
        prop_assert_eq!(unique_id::unescape(&escaped), device_id);
    });
}

#[test]
fn prop_escaped_ids_are_alnum_and_underscore() {
    proptest!(|(device_id in ".*")| {
        let escaped = unique_id::escape(&device_id);
        prop_assert!(escaped.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    });
}

#[test]
fn prop_combined_id_splits_back() {
    proptest!(|(name in "[A-Za-z0-9]{1,12}", device_id in ".*")| {
        let combined = unique_id::combine(&name, &device_id);
        let (got_name, got_id) = unique_id::split(&combined).unwrap();
        prop_assert_eq!(got_name, name);
        prop_assert_eq!(got_id, device_id);
    });
}

#[test]
fn prop_natural_compare_is_reflexive_and_antisymmetric() {
    proptest!(|(a in ".{0,20}", b in ".{0,20}")| {
        prop_assert_eq!(natural_compare(&a, &a), Ordering::Equal);
        prop_assert_eq!(natural_compare(&a, &b), natural_compare(&b, &a).reverse());
    });
}

#[test]
fn prop_numeric_suffixes_sort_by_value() {
    proptest!(|(a in 0u32..10_000, b in 0u32..10_000)| {
        let lhs = format!("Port{a}");
        let rhs = format!("Port{b}");
        prop_assert_eq!(natural_compare(&lhs, &rhs), a.cmp(&b));
    });
}
