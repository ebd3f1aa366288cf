//! Latest-price versioning
//!
//! At most one price row per `(product, price_for)` carries `is_latest`.
//! Writing a latest row demotes every other latest row of the same pair in
//! the same unit of work.

use uuid::Uuid;

use crate::models::PriceFor;

/// Key a latest price is unique over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceKey {
    pub product_id: Uuid,
    pub price_for: PriceFor,
}

/// A price row as far as versioning is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceVersion {
    pub id: Uuid,
    pub key: PriceKey,
    pub is_latest: bool,
}

/// Rows that must be demoted before `written` is persisted.
///
/// `written` is the id of the row being inserted or updated. Nothing is
/// demoted unless that row ends up as the latest one.
pub fn demotions<'a>(
    existing: impl IntoIterator<Item = &'a PriceVersion>,
    key: PriceKey,
    written: Uuid,
    becomes_latest: bool,
) -> Vec<Uuid> {
    if !becomes_latest {
        return Vec::new();
    }
    existing
        .into_iter()
        .filter(|row| row.is_latest && row.key == key && row.id != written)
        .map(|row| row.id)
        .collect()
}

/// Apply a write to an in-memory set of rows, demoting as required
pub fn apply_write(rows: &mut Vec<PriceVersion>, written: PriceVersion) {
    let demoted = demotions(rows.iter(), written.key, written.id, written.is_latest);
    for row in rows.iter_mut() {
        if demoted.contains(&row.id) {
            row.is_latest = false;
        }
    }
    match rows.iter_mut().find(|row| row.id == written.id) {
        Some(row) => *row = written,
        None => rows.push(written),
    }
}

/// Number of latest rows for a key; the invariant is that this never exceeds one
pub fn latest_count(rows: &[PriceVersion], key: PriceKey) -> usize {
    rows.iter().filter(|row| row.key == key && row.is_latest).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(price_for: PriceFor) -> PriceKey {
        PriceKey {
            product_id: Uuid::from_u128(7),
            price_for,
        }
    }

    fn version(id: u128, price_for: PriceFor, is_latest: bool) -> PriceVersion {
        PriceVersion {
            id: Uuid::from_u128(id),
            key: key(price_for),
            is_latest,
        }
    }

    #[test]
    fn test_new_latest_demotes_previous() {
        let mut rows = vec![version(1, PriceFor::Product, true)];
        apply_write(&mut rows, version(2, PriceFor::Product, true));

        assert_eq!(latest_count(&rows, key(PriceFor::Product)), 1);
        assert!(!rows[0].is_latest);
        assert!(rows[1].is_latest);
    }

    #[test]
    fn test_other_price_for_untouched() {
        let existing = [version(1, PriceFor::Purchase, true)];
        let demoted = demotions(existing.iter(), key(PriceFor::Product), Uuid::from_u128(2), true);
        assert!(demoted.is_empty());
    }

    #[test]
    fn test_non_latest_write_demotes_nothing() {
        let existing = [version(1, PriceFor::Product, true)];
        let demoted = demotions(existing.iter(), key(PriceFor::Product), Uuid::from_u128(2), false);
        assert!(demoted.is_empty());
    }

    #[test]
    fn test_rewriting_same_row_keeps_it() {
        let existing = [version(1, PriceFor::Offer, true)];
        let demoted = demotions(existing.iter(), key(PriceFor::Offer), Uuid::from_u128(1), true);
        assert!(demoted.is_empty());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn price_for() -> impl Strategy<Value = PriceFor> {
            prop_oneof![
                Just(PriceFor::Product),
                Just(PriceFor::Purchase),
                Just(PriceFor::Offer)
            ]
        }

        proptest! {
            /// Inserts and in-place rewrites never leave two latest rows for a key
            #[test]
            fn prop_at_most_one_latest(writes in prop::collection::vec((0u128..12, price_for(), any::<bool>()), 1..60)) {
                let mut rows: Vec<PriceVersion> = Vec::new();
                for (id, price_for, is_latest) in writes {
                    // a row keeps its key once written
                    let price_for = rows
                        .iter()
                        .find(|r| r.id == Uuid::from_u128(id))
                        .map_or(price_for, |r| r.key.price_for);
                    apply_write(&mut rows, version(id, price_for, is_latest));

                    for kind in [PriceFor::Product, PriceFor::Purchase, PriceFor::Offer] {
                        prop_assert!(latest_count(&rows, key(kind)) <= 1);
                    }
                }
            }
        }
    }
}
