//! Pricing and discount calculator
//!
//! All amounts are `Decimal`; each computed amount is rounded to the
//! currency's minor unit once, at the end.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    unit_prices_of, CollectionLine, DamageLine, FreeOfferLine, OrderLine, PriceSnapshot,
    PurchaseStatus,
};
use crate::types::{round_money, CtnPcs, UnitPrices};

/// Pricing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Total price should be {expected} (quantity * unit_price)")]
    TotalMismatch { expected: Decimal },

    #[error("Amount for {field} is too large to compute")]
    Overflow { field: &'static str },
}

fn overflow(field: &'static str) -> PricingError {
    PricingError::Overflow { field }
}

/// Rounded value of a quantity at the given prices
fn line_value(prices: UnitPrices, quantity: CtnPcs, field: &'static str) -> Result<Decimal, PricingError> {
    prices
        .value_of(quantity)
        .map(round_money)
        .ok_or_else(|| overflow(field))
}

/// Checked sum of amounts
fn checked_sum(amounts: impl IntoIterator<Item = Decimal>, field: &'static str) -> Result<Decimal, PricingError> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(|| overflow(field))
}

/// `1 − percent / 100`
pub fn deduction_factor(percent: Decimal) -> Decimal {
    Decimal::ONE - percent / Decimal::ONE_HUNDRED
}

/// Net amount of an order line: `Σ unit_price × (quantity + advanced − return)`.
///
/// A unit whose returns exceed its quantity contributes a negative amount.
pub fn order_item_amount(line: &OrderLine, price: Option<&PriceSnapshot>) -> Result<Decimal, PricingError> {
    let billed = line.net_billed().ok_or_else(|| overflow("quantity"))?;
    line_value(unit_prices_of(price), billed, "total_amount")
}

/// Value of a damaged line at full price
pub fn damage_item_amount(line: &DamageLine, price: Option<&PriceSnapshot>) -> Result<Decimal, PricingError> {
    line_value(unit_prices_of(price), line.quantity, "total_amount")
}

/// Value of a free-offer line at full price
pub fn free_offer_amount(line: &FreeOfferLine, price: Option<&PriceSnapshot>) -> Result<Decimal, PricingError> {
    line_value(unit_prices_of(price), line.quantity, "total_amount")
}

/// Amounts derived for one sales collection line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItemAmounts {
    pub order_amount: Decimal,
    /// Damage value after the collection's deduction percentage
    pub damage_amount: Decimal,
    pub free_amount: Decimal,
    /// `order − damage − free`
    pub net_amount: Decimal,
}

/// Price a collection line; damage is scaled by the owning collection's deduction percentage
pub fn collection_item_amounts(
    line: &CollectionLine,
    price: Option<&PriceSnapshot>,
    deduction_percentage: Decimal,
) -> Result<CollectionItemAmounts, PricingError> {
    let prices = unit_prices_of(price);

    let order_amount = line_value(prices, line.order, "order_amount")?;
    let mut damage_amount = prices
        .value_of(line.damage)
        .ok_or_else(|| overflow("damage_amount"))?;
    if deduction_percentage != Decimal::ZERO {
        damage_amount = damage_amount
            .checked_mul(deduction_factor(deduction_percentage))
            .ok_or_else(|| overflow("damage_amount"))?;
    }
    let damage_amount = round_money(damage_amount);
    let free_amount = line_value(prices, line.free, "free_amount")?;

    let net_amount = order_amount
        .checked_sub(damage_amount)
        .and_then(|net| net.checked_sub(free_amount))
        .ok_or_else(|| overflow("net_amount"))?;

    Ok(CollectionItemAmounts {
        order_amount,
        damage_amount,
        free_amount,
        net_amount,
    })
}

/// Aggregate figures of a sales collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTotals {
    pub total_sale: Decimal,
    pub due_amount: Decimal,
}

/// `due = total_sale − collection_amount − collection_by_personal_loan`
pub fn due_amount(
    total_sale: Decimal,
    collection_amount: Decimal,
    personal_loan: Decimal,
) -> Result<Decimal, PricingError> {
    total_sale
        .checked_sub(collection_amount)
        .and_then(|due| due.checked_sub(personal_loan))
        .ok_or_else(|| overflow("due_amount"))
}

pub fn collection_totals(
    items: impl IntoIterator<Item = CollectionItemAmounts>,
    collection_amount: Decimal,
    personal_loan: Decimal,
) -> Result<CollectionTotals, PricingError> {
    let total_sale = checked_sum(items.into_iter().map(|i| i.net_amount), "total_sale")?;
    Ok(CollectionTotals {
        total_sale,
        due_amount: due_amount(total_sale, collection_amount, personal_loan)?,
    })
}

/// Total of a purchase item; a supplied total must equal `quantity × unit_price`
pub fn purchase_item_total(
    quantity: i32,
    unit_price: Decimal,
    supplied_total: Option<Decimal>,
) -> Result<Decimal, PricingError> {
    let expected = Decimal::from(quantity)
        .checked_mul(unit_price)
        .map(round_money)
        .ok_or_else(|| overflow("total_price"))?;
    match supplied_total {
        Some(total) if total != Decimal::ZERO && total != expected => {
            Err(PricingError::TotalMismatch { expected })
        }
        _ => Ok(expected),
    }
}

/// Derived money fields of a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseTotals {
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub due_amount: Decimal,
    pub status: PurchaseStatus,
}

pub fn purchase_status(total_amount: Decimal, paid_amount: Decimal) -> PurchaseStatus {
    if paid_amount == Decimal::ZERO {
        PurchaseStatus::Pending
    } else if paid_amount >= total_amount {
        PurchaseStatus::Paid
    } else {
        PurchaseStatus::Due
    }
}

pub fn purchase_totals(
    item_totals: impl IntoIterator<Item = Decimal>,
    paid_amount: Decimal,
) -> Result<PurchaseTotals, PricingError> {
    let total_amount = checked_sum(item_totals, "total_amount")?;
    let due_amount = total_amount
        .checked_sub(paid_amount)
        .ok_or_else(|| overflow("due_amount"))?;
    Ok(PurchaseTotals {
        total_amount,
        paid_amount,
        due_amount,
        status: purchase_status(total_amount, paid_amount),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Shift;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn price(ctn: &str, pcs: Option<&str>) -> PriceSnapshot {
        PriceSnapshot {
            id: Uuid::new_v4(),
            ctn_price: Some(dec(ctn)),
            piece_price: pcs.map(dec),
        }
    }

    #[test]
    fn test_order_item_amount_includes_advance() {
        let line = OrderLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            shift: Shift::Evening,
            quantity: CtnPcs::new(5, 10),
            advanced: CtnPcs::new(2, 0),
            returned: CtnPcs::new(1, 4),
        };
        // (5 + 2 - 1) * 500 + (10 - 4) * 21.50
        assert_eq!(order_item_amount(&line, Some(&price("500", Some("21.50")))), Ok(dec("3129.00")));
    }

    #[test]
    fn test_order_item_amount_negative_is_kept() {
        let line = OrderLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            shift: Shift::Morning,
            quantity: CtnPcs::new(1, 0),
            advanced: CtnPcs::ZERO,
            returned: CtnPcs::new(3, 0),
        };
        assert_eq!(order_item_amount(&line, Some(&price("100", None))), Ok(dec("-200.00")));
    }

    #[test]
    fn test_missing_price_values_at_zero() {
        let line = FreeOfferLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: CtnPcs::new(3, 3),
        };
        assert_eq!(free_offer_amount(&line, None), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_collection_damage_deduction_is_exact() {
        let line = CollectionLine {
            order: CtnPcs::ZERO,
            damage: CtnPcs::new(2, 0),
            free: CtnPcs::ZERO,
        };
        let amounts = collection_item_amounts(&line, Some(&price("100", None)), dec("10")).unwrap();
        assert_eq!(amounts.damage_amount, dec("180.00"));
        assert_eq!(amounts.net_amount, dec("-180.00"));
    }

    #[test]
    fn test_collection_item_net() {
        let line = CollectionLine {
            order: CtnPcs::new(10, 0),
            damage: CtnPcs::new(1, 0),
            free: CtnPcs::new(0, 6),
        };
        let amounts = collection_item_amounts(&line, Some(&price("250", Some("12.50"))), dec("10")).unwrap();
        assert_eq!(amounts.order_amount, dec("2500.00"));
        assert_eq!(amounts.damage_amount, dec("225.00"));
        assert_eq!(amounts.free_amount, dec("75.00"));
        assert_eq!(amounts.net_amount, dec("2200.00"));
    }

    #[test]
    fn test_collection_totals_due() {
        let items = vec![
            CollectionItemAmounts {
                net_amount: dec("2200.00"),
                ..Default::default()
            },
            CollectionItemAmounts {
                net_amount: dec("800.00"),
                ..Default::default()
            },
        ];
        let totals = collection_totals(items, dec("2000"), dec("500")).unwrap();
        assert_eq!(totals.total_sale, dec("3000.00"));
        assert_eq!(totals.due_amount, dec("500.00"));
    }

    #[test]
    fn test_purchase_item_total_mismatch() {
        assert_eq!(purchase_item_total(4, dec("12.50"), None), Ok(dec("50.00")));
        assert_eq!(purchase_item_total(4, dec("12.50"), Some(dec("50"))), Ok(dec("50.00")));
        assert_eq!(
            purchase_item_total(4, dec("12.50"), Some(dec("49"))),
            Err(PricingError::TotalMismatch { expected: dec("50.00") })
        );
    }

    #[test]
    fn test_purchase_status() {
        assert_eq!(purchase_status(dec("100"), Decimal::ZERO), PurchaseStatus::Pending);
        assert_eq!(purchase_status(dec("100"), dec("40")), PurchaseStatus::Due);
        assert_eq!(purchase_status(dec("100"), dec("100")), PurchaseStatus::Paid);
        assert_eq!(purchase_status(dec("100"), dec("120")), PurchaseStatus::Paid);
    }

    #[test]
    fn test_purchase_totals() {
        let totals = purchase_totals(vec![dec("50.00"), dec("25.00")], dec("30")).unwrap();
        assert_eq!(totals.total_amount, dec("75.00"));
        assert_eq!(totals.due_amount, dec("45.00"));
        assert_eq!(totals.status, PurchaseStatus::Due);
    }

    #[test]
    fn test_order_item_amount_quantity_overflow() {
        let line = OrderLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            shift: Shift::Morning,
            quantity: CtnPcs::new(i32::MAX, 0),
            advanced: CtnPcs::new(1, 0),
            returned: CtnPcs::ZERO,
        };
        assert_eq!(
            order_item_amount(&line, None),
            Err(PricingError::Overflow { field: "quantity" })
        );
    }

    #[test]
    fn test_purchase_item_total_overflow() {
        assert_eq!(
            purchase_item_total(2, Decimal::MAX, None),
            Err(PricingError::Overflow { field: "total_price" })
        );
    }

    #[test]
    fn test_collection_totals_overflow() {
        let items = [
            CollectionItemAmounts {
                net_amount: Decimal::MAX,
                ..Default::default()
            },
            CollectionItemAmounts {
                net_amount: Decimal::MAX,
                ..Default::default()
            },
        ];
        assert!(collection_totals(items, Decimal::ZERO, Decimal::ZERO).is_err());
    }
}
