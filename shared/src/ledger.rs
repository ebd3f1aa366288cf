//! Stock ledger posting rules and balance folding
//!
//! Every line item on an order delivery implies zero or more ledger postings.
//! The functions here compute those postings without touching storage; the
//! caller persists the line item and its postings in one unit of work.
//!
//! Balances are never stored. A balance is the fold of the postings in a
//! bucket: `Σ IN − Σ OUT`, separately for cartons and pieces.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    unit_prices_of, DamageLine, FreeOfferLine, OrderLine, PostingSource, PriceSnapshot,
    StockKind, TransactionType,
};
use crate::pricing::{deduction_factor, PricingError};
use crate::types::{CtnPcs, UnitPrices};

/// A ledger entry that has been computed but not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub stock_kind: StockKind,
    pub product_id: Uuid,
    pub product_price_id: Option<Uuid>,
    pub transaction_type: TransactionType,
    pub quantity: CtnPcs,
    pub prices: UnitPrices,
    pub note: String,
    pub source: PostingSource,
}

impl Posting {
    /// `ctn_price × ctn_quantity + piece_price × piece_quantity`
    pub fn total_price(&self) -> Option<Decimal> {
        self.prices.value_of(self.quantity)
    }

    /// True when the posting was built without a price snapshot
    pub fn is_unpriced(&self) -> bool {
        self.product_price_id.is_none()
    }
}

/// Postings for a sold order line.
///
/// The delivered-minus-returned quantity leaves Regular Stock; an advanced
/// quantity enters Advance Stock. The two postings are independent and the
/// OUT posting always comes first.
pub fn order_item_postings(
    order_number: &str,
    line: &OrderLine,
    price: Option<&PriceSnapshot>,
) -> Result<Vec<Posting>, PricingError> {
    let prices = unit_prices_of(price);
    let price_id = price.map(|p| p.id);
    let mut postings = Vec::with_capacity(2);

    let net = line
        .net_delivered()
        .ok_or(PricingError::Overflow { field: "quantity" })?;
    if net.has_positive() {
        postings.push(Posting {
            stock_kind: StockKind::Regular,
            product_id: line.product_id,
            product_price_id: price_id,
            transaction_type: TransactionType::Out,
            quantity: net.clamp_non_negative(),
            prices,
            note: format!("Net quantity (quantity - return) for order {order_number}"),
            source: PostingSource::OrderItem(line.id),
        });
    }

    if line.advanced.has_positive() {
        postings.push(Posting {
            stock_kind: StockKind::Advance,
            product_id: line.product_id,
            product_price_id: price_id,
            transaction_type: TransactionType::In,
            quantity: line.advanced.clamp_non_negative(),
            prices,
            note: format!("Advanced quantity for order {order_number}"),
            source: PostingSource::OrderItem(line.id),
        });
    }

    Ok(postings)
}

/// Postings for a damaged order line: one IN to Damage Stock at deducted prices
pub fn damage_item_postings(
    order_number: &str,
    line: &DamageLine,
    price: Option<&PriceSnapshot>,
) -> Result<Vec<Posting>, PricingError> {
    if line.quantity.is_nothing() {
        return Ok(Vec::new());
    }

    let mut prices = unit_prices_of(price);
    if let Some(percent) = line.deduction_percent.filter(|p| *p > Decimal::ZERO) {
        prices = prices
            .scaled(deduction_factor(percent))
            .ok_or(PricingError::Overflow { field: "inventory_damage_deduction_percent" })?;
    }

    let mut note = format!("Damaged quantity for order {order_number}");
    if let Some(reason) = line.damage_reason.as_deref().filter(|r| !r.is_empty()) {
        note.push_str(" - ");
        note.push_str(reason);
    }

    Ok(vec![Posting {
        stock_kind: StockKind::Damage,
        product_id: line.product_id,
        product_price_id: price.map(|p| p.id),
        transaction_type: TransactionType::In,
        quantity: line.quantity.clamp_non_negative(),
        prices,
        note,
        source: PostingSource::DamageOrderItem(line.id),
    }])
}

/// Postings for a free-offer line: one OUT from Free Stock at full price
pub fn free_offer_postings(
    order_number: &str,
    line: &FreeOfferLine,
    price: Option<&PriceSnapshot>,
) -> Result<Vec<Posting>, PricingError> {
    if line.quantity.is_nothing() {
        return Ok(Vec::new());
    }

    Ok(vec![Posting {
        stock_kind: StockKind::Free,
        product_id: line.product_id,
        product_price_id: price.map(|p| p.id),
        transaction_type: TransactionType::Out,
        quantity: line.quantity.clamp_non_negative(),
        prices: unit_prices_of(price),
        note: format!("Free offer quantity for order {order_number}"),
        source: PostingSource::FreeOfferItem(line.id),
    }])
}

/// Running IN/OUT totals of one ledger bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBalance {
    pub in_ctn: i64,
    pub in_pcs: i64,
    pub out_ctn: i64,
    pub out_pcs: i64,
}

impl StockBalance {
    /// Build a balance from already-aggregated sums; missing sums count as zero
    pub fn from_sums(
        in_ctn: Option<i64>,
        in_pcs: Option<i64>,
        out_ctn: Option<i64>,
        out_pcs: Option<i64>,
    ) -> Self {
        Self {
            in_ctn: in_ctn.unwrap_or(0),
            in_pcs: in_pcs.unwrap_or(0),
            out_ctn: out_ctn.unwrap_or(0),
            out_pcs: out_pcs.unwrap_or(0),
        }
    }

    pub fn apply(&mut self, transaction_type: TransactionType, quantity: CtnPcs) {
        match transaction_type {
            TransactionType::In => {
                self.in_ctn += i64::from(quantity.ctn);
                self.in_pcs += i64::from(quantity.pcs);
            }
            TransactionType::Out => {
                self.out_ctn += i64::from(quantity.ctn);
                self.out_pcs += i64::from(quantity.pcs);
            }
        }
    }

    /// Carton balance, `Σ IN − Σ OUT`; may be negative
    pub fn ctn(&self) -> i64 {
        self.in_ctn - self.out_ctn
    }

    pub fn pcs(&self) -> i64 {
        self.in_pcs - self.out_pcs
    }

    /// Fold postings of a single bucket into a balance
    pub fn fold<'a>(postings: impl IntoIterator<Item = &'a Posting>) -> Self {
        postings.into_iter().fold(Self::default(), |mut acc, p| {
            acc.apply(p.transaction_type, p.quantity);
            acc
        })
    }
}

/// Balance of one product in one stock bucket, derived from the postings given
pub fn balance_for(postings: &[Posting], product_id: Uuid, kind: StockKind) -> StockBalance {
    StockBalance::fold(
        postings
            .iter()
            .filter(|p| p.product_id == product_id && p.stock_kind == kind),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Shift;

    fn order_line(quantity: CtnPcs, advanced: CtnPcs, returned: CtnPcs) -> OrderLine {
        OrderLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            shift: Shift::Morning,
            quantity,
            advanced,
            returned,
        }
    }

    fn price(ctn: i64, pcs: i64) -> PriceSnapshot {
        PriceSnapshot {
            id: Uuid::new_v4(),
            ctn_price: Some(Decimal::from(ctn)),
            piece_price: Some(Decimal::from(pcs)),
        }
    }

    #[test]
    fn test_zero_order_item_posts_nothing() {
        let line = order_line(CtnPcs::ZERO, CtnPcs::ZERO, CtnPcs::ZERO);
        assert!(order_item_postings("ORD-2025-0001", &line, Some(&price(500, 20))).unwrap().is_empty());
    }

    #[test]
    fn test_net_quantity_out_of_regular_stock() {
        let line = order_line(CtnPcs::new(10, 0), CtnPcs::ZERO, CtnPcs::new(3, 0));
        let postings = order_item_postings("ORD-2025-0001", &line, Some(&price(500, 20))).unwrap();

        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].stock_kind, StockKind::Regular);
        assert_eq!(postings[0].transaction_type, TransactionType::Out);
        assert_eq!(postings[0].quantity, CtnPcs::new(7, 0));
        assert_eq!(postings[0].source, PostingSource::OrderItem(line.id));
    }

    #[test]
    fn test_return_exceeding_quantity_posts_nothing() {
        let line = order_line(CtnPcs::new(3, 0), CtnPcs::ZERO, CtnPcs::new(10, 0));
        assert!(order_item_postings("ORD-2025-0001", &line, None).unwrap().is_empty());
    }

    #[test]
    fn test_negative_unit_is_posted_as_zero() {
        let line = order_line(CtnPcs::new(3, 6), CtnPcs::ZERO, CtnPcs::new(10, 2));
        let postings = order_item_postings("ORD-2025-0001", &line, None).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].quantity, CtnPcs::new(0, 4));
    }

    #[test]
    fn test_advance_posting_follows_regular_posting() {
        let line = order_line(CtnPcs::new(5, 0), CtnPcs::new(2, 0), CtnPcs::ZERO);
        let postings = order_item_postings("ORD-2025-0001", &line, Some(&price(500, 0))).unwrap();

        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].stock_kind, StockKind::Regular);
        assert_eq!(postings[0].total_price(), Some(Decimal::from(2500)));
        assert_eq!(postings[1].stock_kind, StockKind::Advance);
        assert_eq!(postings[1].transaction_type, TransactionType::In);
        assert_eq!(postings[1].total_price(), Some(Decimal::from(1000)));
    }

    #[test]
    fn test_advance_only_posts_single_in() {
        let line = order_line(CtnPcs::ZERO, CtnPcs::new(0, 12), CtnPcs::ZERO);
        let postings = order_item_postings("ORD-2025-0001", &line, None).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].stock_kind, StockKind::Advance);
    }

    #[test]
    fn test_unpriced_posting_keeps_quantity() {
        let line = order_line(CtnPcs::new(4, 0), CtnPcs::ZERO, CtnPcs::ZERO);
        let postings = order_item_postings("ORD-2025-0001", &line, None).unwrap();
        assert!(postings[0].is_unpriced());
        assert_eq!(postings[0].quantity, CtnPcs::new(4, 0));
        assert_eq!(postings[0].total_price(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_damage_posting_applies_deduction() {
        let line = DamageLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: CtnPcs::new(2, 0),
            damage_reason: Some("crushed".to_string()),
            deduction_percent: Some(Decimal::from(10)),
        };
        let postings = damage_item_postings("ORD-2025-0001", &line, Some(&price(100, 10))).unwrap();

        assert_eq!(postings.len(), 1);
        let posting = &postings[0];
        assert_eq!(posting.stock_kind, StockKind::Damage);
        assert_eq!(posting.transaction_type, TransactionType::In);
        assert_eq!(posting.prices.ctn_price, Decimal::new(9000, 2));
        assert_eq!(posting.prices.piece_price, Decimal::new(900, 2));
        assert_eq!(posting.total_price(), Some(Decimal::new(18000, 2)));
        assert!(posting.note.ends_with(" - crushed"));
    }

    #[test]
    fn test_damage_without_quantity_posts_nothing() {
        let line = DamageLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: CtnPcs::new(0, -1),
            damage_reason: None,
            deduction_percent: None,
        };
        assert!(damage_item_postings("ORD-2025-0001", &line, None).unwrap().is_empty());
    }

    #[test]
    fn test_free_offer_posts_out_at_full_price() {
        let line = FreeOfferLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: CtnPcs::new(1, 3),
        };
        let postings = free_offer_postings("ORD-2025-0001", &line, Some(&price(100, 10))).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].stock_kind, StockKind::Free);
        assert_eq!(postings[0].transaction_type, TransactionType::Out);
        assert_eq!(postings[0].total_price(), Some(Decimal::from(130)));
    }

    #[test]
    fn test_balance_is_in_minus_out() {
        let mut balance = StockBalance::default();
        balance.apply(TransactionType::In, CtnPcs::new(10, 5));
        balance.apply(TransactionType::Out, CtnPcs::new(12, 1));
        assert_eq!(balance.ctn(), -2);
        assert_eq!(balance.pcs(), 4);
    }

    #[test]
    fn test_missing_sums_are_zero() {
        let balance = StockBalance::from_sums(None, Some(3), None, None);
        assert_eq!(balance.ctn(), 0);
        assert_eq!(balance.pcs(), 3);
    }

    #[test]
    fn test_overflowing_line_is_rejected() {
        let line = order_line(CtnPcs::new(i32::MIN, 0), CtnPcs::ZERO, CtnPcs::new(1, 0));
        assert_eq!(
            order_item_postings("ORD-2025-0001", &line, None),
            Err(PricingError::Overflow { field: "quantity" })
        );
    }
}
