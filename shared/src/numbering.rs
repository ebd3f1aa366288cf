//! Document numbering
//!
//! Numbers have the shape `PREFIX[-YEAR]-NNNN`. The next number is
//! `max(existing suffixes) + 1`, checked against the store and bumped on
//! collision. After a bounded number of collisions a timestamp-derived suffix
//! is used so the caller always gets an answer.
//!
//! Generation is best-effort: the unique index on the number column is what
//! actually rejects duplicates.

use chrono::{DateTime, Utc};

/// Collision checks before falling back to a timestamp-derived suffix
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Largest suffix representable in four digits
const MAX_SUFFIX: u32 = 9999;

/// How the numeric suffix of an existing identifier is recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixRule {
    /// Only `PREFIX[-YEAR]-<digits>` matches
    Exact,
    /// The first run of digits anywhere in the identifier counts (legacy SKUs like `"17"` or `"SKU-1"`)
    FirstDigits,
}

/// A document number series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberScheme {
    pub prefix: String,
    pub year: Option<i32>,
    pub rule: SuffixRule,
}

impl NumberScheme {
    /// Year-scoped series, e.g. `ORD-2025-0001`
    pub fn yearly(prefix: impl Into<String>, year: i32) -> Self {
        Self {
            prefix: prefix.into(),
            year: Some(year),
            rule: SuffixRule::Exact,
        }
    }

    /// Product SKUs: `SKU-0001`, global, tolerant of legacy values
    pub fn sku() -> Self {
        Self {
            prefix: "SKU".to_string(),
            year: None,
            rule: SuffixRule::FirstDigits,
        }
    }

    pub fn order(year: i32) -> Self {
        Self::yearly("ORD", year)
    }

    pub fn voucher(year: i32) -> Self {
        Self::yearly("PAY", year)
    }

    pub fn sales(year: i32) -> Self {
        Self::yearly("SAL", year)
    }

    /// Scope key: `PREFIX` or `PREFIX-YEAR`
    pub fn scope(&self) -> String {
        match self.year {
            Some(year) => format!("{}-{}", self.prefix, year),
            None => self.prefix.clone(),
        }
    }

    /// SQL `LIKE` pattern that pre-filters candidate identifiers
    pub fn like_pattern(&self) -> String {
        match self.rule {
            SuffixRule::Exact => format!("{}-%", self.scope()),
            SuffixRule::FirstDigits => "%".to_string(),
        }
    }

    pub fn format(&self, sequence: u32) -> String {
        format!("{}-{:04}", self.scope(), sequence)
    }

    /// Numeric suffix of an existing identifier, if it belongs to this series
    pub fn parse_suffix(&self, identifier: &str) -> Option<u32> {
        match self.rule {
            SuffixRule::Exact => {
                let scope = self.scope();
                let digits = identifier.strip_prefix(scope.as_str())?.strip_prefix('-')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok()
            }
            SuffixRule::FirstDigits => {
                let start = identifier.find(|c: char| c.is_ascii_digit())?;
                let rest = &identifier[start..];
                let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
                rest[..end].parse().ok()
            }
        }
    }
}

/// `max(suffix) + 1` over the identifiers of this series, or 1 if there are none
pub fn next_sequence<I, S>(scheme: &NumberScheme, existing: I) -> u32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    existing
        .into_iter()
        .filter_map(|id| scheme.parse_suffix(id.as_ref()))
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// A generated number and how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocated {
    pub number: String,
    /// True when every sequential candidate collided
    pub fallback: bool,
}

/// Compute the next free number of a series.
///
/// `is_taken` looks up an exact identifier in the store.
pub fn allocate<I, S, F>(
    scheme: &NumberScheme,
    existing: I,
    mut is_taken: F,
    max_attempts: u32,
    now: DateTime<Utc>,
) -> Allocated
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: FnMut(&str) -> bool,
{
    let mut sequence = next_sequence(scheme, existing);
    for _ in 0..max_attempts {
        let candidate = scheme.format(sequence);
        if !is_taken(&candidate) {
            return Allocated {
                number: candidate,
                fallback: false,
            };
        }
        sequence = sequence.saturating_add(1);
    }

    let stamped = scheme.format(timestamp_suffix(now));
    if !is_taken(&stamped) {
        return Allocated {
            number: stamped,
            fallback: true,
        };
    }

    // `sequence` is one past the last candidate; wrap rather than grow past four digits
    let last_resort = if sequence <= MAX_SUFFIX { sequence } else { 1 };
    Allocated {
        number: scheme.format(last_resort),
        fallback: true,
    }
}

/// `(unix seconds mod 9999) + 1`, never zero
pub fn timestamp_suffix(now: DateTime<Utc>) -> u32 {
    let seconds = now.timestamp().rem_euclid(i64::from(MAX_SUFFIX));
    seconds as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_first_number_of_year() {
        let scheme = NumberScheme::order(2025);
        let allocated = allocate(&scheme, Vec::<String>::new(), |_| false, DEFAULT_MAX_ATTEMPTS, now());
        assert_eq!(allocated.number, "ORD-2025-0001");
        assert!(!allocated.fallback);
    }

    #[test]
    fn test_next_after_max_suffix() {
        let scheme = NumberScheme::order(2025);
        let existing = ["ORD-2025-0003", "ORD-2025-0557", "ORD-2024-0900", "ORD-2025-12a"];
        assert_eq!(next_sequence(&scheme, existing), 558);
    }

    #[test]
    fn test_other_year_is_ignored() {
        let scheme = NumberScheme::voucher(2026);
        assert_eq!(next_sequence(&scheme, ["PAY-2025-0042"]), 1);
    }

    #[test]
    fn test_exact_rule_rejects_lookalikes() {
        let scheme = NumberScheme::order(2025);
        assert_eq!(scheme.parse_suffix("ORD-2025-0012"), Some(12));
        assert_eq!(scheme.parse_suffix("ORD-20250-0012"), None);
        assert_eq!(scheme.parse_suffix("ORD-2025-"), None);
        assert_eq!(scheme.parse_suffix("XORD-2025-0012"), None);
    }

    #[test]
    fn test_sku_reads_legacy_values() {
        let scheme = NumberScheme::sku();
        assert_eq!(scheme.parse_suffix("17"), Some(17));
        assert_eq!(scheme.parse_suffix("SKU-0042"), Some(42));
        assert_eq!(scheme.parse_suffix("no digits"), None);
        assert_eq!(next_sequence(&scheme, ["SKU-0042", "7", "abc"]), 43);
    }

    #[test]
    fn test_collision_bumps_sequence() {
        let scheme = NumberScheme::sku();
        let taken: HashSet<&str> = ["SKU-0001", "SKU-0002"].into_iter().collect();
        let allocated = allocate(&scheme, Vec::<String>::new(), |c| taken.contains(c), 100, now());
        assert_eq!(allocated.number, "SKU-0003");
    }

    #[test]
    fn test_fallback_after_exhausted_attempts() {
        let scheme = NumberScheme::order(2025);
        let stamped = scheme.format(timestamp_suffix(now()));
        let allocated = allocate(&scheme, Vec::<String>::new(), |c| c != stamped, 5, now());
        assert_eq!(allocated.number, stamped);
        assert!(allocated.fallback);
    }

    #[test]
    fn test_timestamp_suffix_range() {
        let suffix = timestamp_suffix(now());
        assert!((1..=9999).contains(&suffix));
        assert_eq!(timestamp_suffix(Utc.timestamp_opt(9999, 0).unwrap()), 1);
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(NumberScheme::sales(2025).like_pattern(), "SAL-2025-%");
        assert_eq!(NumberScheme::sku().like_pattern(), "%");
    }
}
