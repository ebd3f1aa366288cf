//! Stock ledger tests
//!
//! Tests for ledger bookkeeping including:
//! - Posting rules for order, damage and free-offer items
//! - Balance accuracy (IN minus OUT per bucket)
//! - Balance independence from posting order

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::ledger::{
    balance_for, damage_item_postings, free_offer_postings, order_item_postings, Posting,
    StockBalance,
};
use shared::models::{
    DamageLine, FreeOfferLine, OrderLine, PostingSource, PriceSnapshot, Shift, StockKind,
    TransactionType,
};
use shared::pricing::PricingError;
use shared::types::{CtnPcs, UnitPrices, MAX_LINE_QUANTITY};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn snapshot(ctn: &str, pcs: &str) -> PriceSnapshot {
    PriceSnapshot {
        id: Uuid::new_v4(),
        ctn_price: Some(dec(ctn)),
        piece_price: Some(dec(pcs)),
    }
}

fn order_line(product_id: Uuid, quantity: CtnPcs, advanced: CtnPcs, returned: CtnPcs) -> OrderLine {
    OrderLine {
        id: Uuid::new_v4(),
        product_id,
        shift: Shift::Morning,
        quantity,
        advanced,
        returned,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Delivering 5 cartons with 2 advanced at 500 per carton
    #[test]
    fn test_order_delivery_scenario() {
        let product_id = Uuid::new_v4();
        let price = snapshot("500", "0");
        let line = order_line(product_id, CtnPcs::new(5, 0), CtnPcs::new(2, 0), CtnPcs::ZERO);

        let postings = order_item_postings("ORD-2025-0001", &line, Some(&price)).unwrap();
        assert_eq!(postings.len(), 2);

        let regular = &postings[0];
        assert_eq!(regular.stock_kind, StockKind::Regular);
        assert_eq!(regular.transaction_type, TransactionType::Out);
        assert_eq!(regular.total_price(), Some(dec("2500")));
        assert_eq!(regular.product_price_id, Some(price.id));

        let advance = &postings[1];
        assert_eq!(advance.stock_kind, StockKind::Advance);
        assert_eq!(advance.transaction_type, TransactionType::In);
        assert_eq!(advance.total_price(), Some(dec("1000")));

        assert_eq!(balance_for(&postings, product_id, StockKind::Regular).ctn(), -5);
        assert_eq!(balance_for(&postings, product_id, StockKind::Advance).ctn(), 2);
        assert_eq!(balance_for(&postings, product_id, StockKind::Damage).ctn(), 0);
    }

    /// An all-zero line posts nothing
    #[test]
    fn test_zero_line_posts_nothing() {
        let line = order_line(Uuid::new_v4(), CtnPcs::ZERO, CtnPcs::ZERO, CtnPcs::ZERO);
        assert!(order_item_postings("ORD-2025-0002", &line, None).unwrap().is_empty());

        let damage = DamageLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: CtnPcs::ZERO,
            damage_reason: None,
            deduction_percent: Some(dec("10")),
        };
        assert!(damage_item_postings("ORD-2025-0002", &damage, None).unwrap().is_empty());

        let free = FreeOfferLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: CtnPcs::ZERO,
        };
        assert!(free_offer_postings("ORD-2025-0002", &free, None).unwrap().is_empty());
    }

    /// Returns are netted against the delivered quantity
    #[test]
    fn test_net_quantity_posting() {
        let line = order_line(Uuid::new_v4(), CtnPcs::new(10, 0), CtnPcs::ZERO, CtnPcs::new(3, 0));
        let postings = order_item_postings("ORD-2025-0003", &line, None).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].quantity, CtnPcs::new(7, 0));

        let line = order_line(Uuid::new_v4(), CtnPcs::new(3, 0), CtnPcs::ZERO, CtnPcs::new(10, 0));
        assert!(order_item_postings("ORD-2025-0003", &line, None).unwrap().is_empty());
    }

    /// A negative unit never reaches the ledger
    #[test]
    fn test_negative_unit_posts_as_zero() {
        let line = order_line(Uuid::new_v4(), CtnPcs::new(3, 5), CtnPcs::ZERO, CtnPcs::new(10, 0));
        let postings = order_item_postings("ORD-2025-0004", &line, None).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].quantity, CtnPcs::new(0, 5));
    }

    /// Damage valued at 90% of 100 for 2 cartons
    #[test]
    fn test_damage_deduction_exact() {
        let line = DamageLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: CtnPcs::new(2, 0),
            damage_reason: Some("leaking".to_string()),
            deduction_percent: Some(dec("10")),
        };
        let postings = damage_item_postings("ORD-2025-0005", &line, Some(&snapshot("100", "0"))).unwrap();

        assert_eq!(postings[0].total_price(), Some(dec("180.00")));
        assert_eq!(postings[0].source, PostingSource::DamageOrderItem(line.id));
        assert_eq!(
            postings[0].note,
            "Damaged quantity for order ORD-2025-0005 - leaking"
        );
    }

    /// Zero deduction keeps the full price
    #[test]
    fn test_damage_without_deduction() {
        let line = DamageLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: CtnPcs::new(1, 2),
            damage_reason: None,
            deduction_percent: Some(Decimal::ZERO),
        };
        let postings = damage_item_postings("ORD-2025-0006", &line, Some(&snapshot("80", "4"))).unwrap();
        assert_eq!(postings[0].prices, UnitPrices::new(dec("80"), dec("4")));
        assert_eq!(postings[0].note, "Damaged quantity for order ORD-2025-0006");
    }

    /// Free offers leave Free Stock at full price
    #[test]
    fn test_free_offer_posting() {
        let product_id = Uuid::new_v4();
        let line = FreeOfferLine {
            id: Uuid::new_v4(),
            product_id,
            quantity: CtnPcs::new(0, 6),
        };
        let postings = free_offer_postings("ORD-2025-0007", &line, Some(&snapshot("240", "20.50"))).unwrap();
        assert_eq!(postings[0].total_price(), Some(dec("123.00")));
        assert_eq!(balance_for(&postings, product_id, StockKind::Free).pcs(), -6);
    }

    /// Buckets are keyed by product as well as stock kind
    #[test]
    fn test_balances_are_per_product() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut postings = order_item_postings(
            "ORD-2025-0008",
            &order_line(a, CtnPcs::new(4, 0), CtnPcs::ZERO, CtnPcs::ZERO),
            None,
        )
        .unwrap();
        postings.extend(
            order_item_postings(
                "ORD-2025-0008",
                &order_line(b, CtnPcs::new(9, 0), CtnPcs::ZERO, CtnPcs::ZERO),
                None,
            )
            .unwrap(),
        );

        assert_eq!(balance_for(&postings, a, StockKind::Regular).ctn(), -4);
        assert_eq!(balance_for(&postings, b, StockKind::Regular).ctn(), -9);
    }

    /// A return larger than i32 can express against a negative quantity is rejected
    #[test]
    fn test_wrapping_net_quantity_is_rejected() {
        let line = order_line(Uuid::new_v4(), CtnPcs::new(-2, 0), CtnPcs::ZERO, CtnPcs::new(i32::MAX, 0));
        assert_eq!(
            order_item_postings("ORD-2025-0009", &line, None),
            Err(PricingError::Overflow { field: "quantity" })
        );
    }

    /// A bounded line at a large price keeps an exact total
    #[test]
    fn test_bounded_posting_total() {
        let line = order_line(
            Uuid::new_v4(),
            CtnPcs::new(MAX_LINE_QUANTITY, 0),
            CtnPcs::ZERO,
            CtnPcs::ZERO,
        );
        let postings = order_item_postings("ORD-2025-0010", &line, Some(&snapshot("1000000000", "0"))).unwrap();
        assert_eq!(postings[0].total_price(), Some(dec("1000000000000000")));
    }

    /// A price too large to multiply yields no total
    #[test]
    fn test_unrepresentable_total_price() {
        let posting = Posting {
            stock_kind: StockKind::Main,
            product_id: Uuid::new_v4(),
            product_price_id: None,
            transaction_type: TransactionType::In,
            quantity: CtnPcs::new(2, 0),
            prices: UnitPrices::new(Decimal::MAX, Decimal::ZERO),
            note: String::new(),
            source: PostingSource::Manual,
        };
        assert_eq!(posting.total_price(), None);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for non-negative carton/piece quantities
    fn quantity_strategy() -> impl Strategy<Value = CtnPcs> {
        (0i32..50, 0i32..50).prop_map(|(ctn, pcs)| CtnPcs::new(ctn, pcs))
    }

    fn direction_strategy() -> impl Strategy<Value = TransactionType> {
        prop_oneof![Just(TransactionType::In), Just(TransactionType::Out)]
    }

    fn posting(product_id: Uuid, transaction_type: TransactionType, quantity: CtnPcs) -> Posting {
        Posting {
            stock_kind: StockKind::Main,
            product_id,
            product_price_id: None,
            transaction_type,
            quantity,
            prices: UnitPrices::default(),
            note: String::new(),
            source: PostingSource::Manual,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Balance equals Σ IN − Σ OUT regardless of posting order
        #[test]
        fn prop_balance_is_order_independent(
            entries in prop::collection::vec((direction_strategy(), quantity_strategy()), 0..40),
            seed in any::<u64>(),
        ) {
            let product_id = Uuid::from_u128(1);
            let postings: Vec<Posting> = entries
                .iter()
                .map(|(dir, qty)| posting(product_id, *dir, *qty))
                .collect();

            let expected_ctn: i64 = entries
                .iter()
                .map(|(dir, qty)| match dir {
                    TransactionType::In => i64::from(qty.ctn),
                    TransactionType::Out => -i64::from(qty.ctn),
                })
                .sum();

            // deterministic shuffle
            let mut shuffled = postings.clone();
            let mut state = seed | 1;
            for i in (1..shuffled.len()).rev() {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                shuffled.swap(i, (state % (i as u64 + 1)) as usize);
            }

            let forward = balance_for(&postings, product_id, StockKind::Main);
            let reordered = balance_for(&shuffled, product_id, StockKind::Main);

            prop_assert_eq!(forward, reordered);
            prop_assert_eq!(forward.ctn(), expected_ctn);
        }

        /// No rule ever emits a negative quantity
        #[test]
        fn prop_postings_never_negative(
            quantity in (-20i32..50, -20i32..50),
            advanced in quantity_strategy(),
            returned in quantity_strategy(),
        ) {
            let line = order_line(
                Uuid::new_v4(),
                CtnPcs::new(quantity.0, quantity.1),
                advanced,
                returned,
            );
            for p in order_item_postings("ORD-2025-0100", &line, None).unwrap() {
                prop_assert!(p.quantity.ctn >= 0 && p.quantity.pcs >= 0);
                prop_assert!(p.quantity.has_positive());
            }
        }

        /// The regular posting carries exactly the positive part of the net quantity
        #[test]
        fn prop_regular_posting_is_clamped_net(
            quantity in quantity_strategy(),
            returned in quantity_strategy(),
        ) {
            let product_id = Uuid::new_v4();
            let line = order_line(product_id, quantity, CtnPcs::ZERO, returned);
            let postings = order_item_postings("ORD-2025-0101", &line, None).unwrap();
            let balance = balance_for(&postings, product_id, StockKind::Regular);

            prop_assert_eq!(balance.out_ctn, i64::from((quantity.ctn - returned.ctn).max(0)));
            prop_assert_eq!(balance.out_pcs, i64::from((quantity.pcs - returned.pcs).max(0)));
            prop_assert_eq!(balance.in_ctn, 0);
        }

        /// Folding postings one by one equals aggregated sums
        #[test]
        fn prop_fold_matches_sums(
            entries in prop::collection::vec((direction_strategy(), quantity_strategy()), 0..30),
        ) {
            let mut folded = StockBalance::default();
            let (mut in_ctn, mut in_pcs, mut out_ctn, mut out_pcs) = (0i64, 0i64, 0i64, 0i64);
            for (dir, qty) in &entries {
                folded.apply(*dir, *qty);
                match dir {
                    TransactionType::In => {
                        in_ctn += i64::from(qty.ctn);
                        in_pcs += i64::from(qty.pcs);
                    }
                    TransactionType::Out => {
                        out_ctn += i64::from(qty.ctn);
                        out_pcs += i64::from(qty.pcs);
                    }
                }
            }
            let summed = StockBalance::from_sums(Some(in_ctn), Some(in_pcs), Some(out_ctn), Some(out_pcs));
            prop_assert_eq!(folded, summed);
        }
    }
}
