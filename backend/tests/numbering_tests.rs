//! Document numbering tests
//!
//! Tests for document number generation including:
//! - Number format per series (SKU, ORD, PAY, SAL)
//! - Uniqueness of sequential allocations
//! - Collision handling and timestamp fallback

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashSet;

use shared::numbering::{allocate, next_sequence, timestamp_suffix, NumberScheme, DEFAULT_MAX_ATTEMPTS};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Allocate against a set of taken identifiers and record the result
fn allocate_into(scheme: &NumberScheme, taken: &mut HashSet<String>) -> String {
    let allocated = allocate(
        scheme,
        taken.iter().cloned().collect::<Vec<_>>(),
        |candidate| taken.contains(candidate),
        DEFAULT_MAX_ATTEMPTS,
        fixed_now(),
    );
    taken.insert(allocated.number.clone());
    allocated.number
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Each series has its own prefix and year scope
    #[test]
    fn test_series_formats() {
        assert_eq!(NumberScheme::sku().format(1), "SKU-0001");
        assert_eq!(NumberScheme::order(2025).format(42), "ORD-2025-0042");
        assert_eq!(NumberScheme::voucher(2025).format(7), "PAY-2025-0007");
        assert_eq!(NumberScheme::sales(2025).format(1234), "SAL-2025-1234");
    }

    /// Suffixes past four digits are not truncated
    #[test]
    fn test_wide_suffix() {
        assert_eq!(NumberScheme::order(2025).format(10000), "ORD-2025-10000");
    }

    /// Three orders in a fresh year are numbered 0001..0003
    #[test]
    fn test_sequential_orders() {
        let scheme = NumberScheme::order(2025);
        let mut taken = HashSet::new();

        let numbers: Vec<String> = (0..3).map(|_| allocate_into(&scheme, &mut taken)).collect();
        assert_eq!(numbers, vec!["ORD-2025-0001", "ORD-2025-0002", "ORD-2025-0003"]);
    }

    /// A new year starts again at 0001
    #[test]
    fn test_year_rollover() {
        let existing = ["SAL-2024-0310", "SAL-2024-0311"];
        assert_eq!(next_sequence(&NumberScheme::sales(2024), existing), 312);
        assert_eq!(next_sequence(&NumberScheme::sales(2025), existing), 1);
    }

    /// Gaps are not refilled; the next number follows the largest suffix
    #[test]
    fn test_gaps_are_not_reused() {
        let existing = ["PAY-2025-0001", "PAY-2025-0009"];
        assert_eq!(next_sequence(&NumberScheme::voucher(2025), existing), 10);
    }

    /// Legacy numeric SKUs still advance the series
    #[test]
    fn test_legacy_sku_values() {
        let mut taken: HashSet<String> = ["12", "SKU-0003", "custom"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(allocate_into(&NumberScheme::sku(), &mut taken), "SKU-0013");
    }

    /// When every candidate collides the timestamp suffix is used
    #[test]
    fn test_exhausted_attempts_fall_back_to_timestamp() {
        let scheme = NumberScheme::order(2025);
        let stamped = scheme.format(timestamp_suffix(fixed_now()));

        let allocated = allocate(&scheme, ["ORD-2025-0001"], |c| c != stamped, 3, fixed_now());
        assert!(allocated.fallback);
        assert_eq!(allocated.number, stamped);
    }

    /// Even the fallback never fails to produce a number
    #[test]
    fn test_fallback_always_answers() {
        let scheme = NumberScheme::voucher(2025);
        let allocated = allocate(&scheme, Vec::<String>::new(), |_| true, 2, fixed_now());
        assert!(allocated.fallback);
        assert!(allocated.number.starts_with("PAY-2025-"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// N sequential allocations in one series are pairwise distinct
        #[test]
        fn prop_sequential_allocations_are_unique(count in 1usize..60, year in 2020i32..2040) {
            let scheme = NumberScheme::order(year);
            let mut taken = HashSet::new();
            let mut seen = HashSet::new();

            for i in 1..=count {
                let number = allocate_into(&scheme, &mut taken);
                prop_assert_eq!(&number, &scheme.format(i as u32));
                prop_assert!(seen.insert(number));
            }
        }

        /// A generated SKU is never one that is already taken
        #[test]
        fn prop_sku_never_returns_taken_value(
            suffixes in prop::collection::vec(1u32..5000, 0..40),
            legacy in prop::collection::vec("[A-Z]{0,3}[0-9]{1,4}", 0..10),
        ) {
            let scheme = NumberScheme::sku();
            let mut taken: HashSet<String> = suffixes.iter().map(|s| scheme.format(*s)).collect();
            taken.extend(legacy);
            let before = taken.clone();

            let number = allocate_into(&scheme, &mut taken);
            prop_assert!(!before.contains(&number));
        }

        /// Only identifiers of the same prefix and year influence the next number
        #[test]
        fn prop_foreign_series_are_ignored(
            own in prop::collection::vec(1u32..9000, 0..20),
            foreign in prop::collection::vec(1u32..9999, 0..20),
        ) {
            let scheme = NumberScheme::sales(2025);
            let mut existing: Vec<String> = own.iter().map(|s| scheme.format(*s)).collect();
            existing.extend(foreign.iter().map(|s| NumberScheme::sales(2024).format(*s)));
            existing.extend(foreign.iter().map(|s| NumberScheme::order(2025).format(*s)));

            let expected = own.iter().max().map_or(1, |m| m + 1);
            prop_assert_eq!(next_sequence(&scheme, &existing), expected);
        }

        /// The timestamp suffix always fits four digits and is never zero
        #[test]
        fn prop_timestamp_suffix_in_range(seconds in 0i64..4_102_444_800) {
            let now = Utc.timestamp_opt(seconds, 0).unwrap();
            let suffix = timestamp_suffix(now);
            prop_assert!((1..=9999).contains(&suffix));
        }
    }
}
