//! Validation utilities for the Wholesale Distribution backend
//!
//! Plain functions return `&'static str` messages; the `*_field` variants
//! plug into `#[validate(custom = "...")]` on request DTOs.

use rust_decimal::Decimal;
use uuid::Uuid;
use validator::ValidationError;

use crate::types::{CtnPcs, MAX_LINE_QUANTITY, MAX_MONEY};

// ============================================================================
// Ledger Validations
// ============================================================================

/// Resolve the transfer fields of a manual stock transaction.
///
/// With `have_transfer` both ends are required and must differ; without it
/// both ends are dropped.
pub fn validate_transfer(
    have_transfer: bool,
    transfer_from: Option<Uuid>,
    transfer_to: Option<Uuid>,
) -> Result<Option<(Uuid, Uuid)>, &'static str> {
    if !have_transfer {
        return Ok(None);
    }
    match (transfer_from, transfer_to) {
        (Some(from), Some(to)) if from == to => {
            Err("transfer_from and transfer_to cannot be the same")
        }
        (Some(from), Some(to)) => Ok(Some((from, to))),
        _ => Err("Both transfer_from and transfer_to are required when have_transfer is True"),
    }
}

/// Manual postings must move a non-negative, non-empty quantity
pub fn validate_posting_quantity(quantity: CtnPcs) -> Result<(), &'static str> {
    if quantity.ctn < 0 || quantity.pcs < 0 {
        return Err("Quantities cannot be negative");
    }
    if quantity.ctn == 0 && quantity.pcs == 0 {
        return Err("Carton or piece quantity must be greater than zero");
    }
    if !quantity.within_line_bounds() {
        return Err("Quantity exceeds the maximum of 1000000 per unit");
    }
    Ok(())
}

/// A single carton or piece count on a line item
pub fn validate_line_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Quantities cannot be negative");
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err("Quantity exceeds the maximum of 1000000 per unit");
    }
    Ok(())
}

// ============================================================================
// Money and Percentage Validations
// ============================================================================

pub fn validate_percentage(percent: Decimal) -> Result<(), &'static str> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}

pub fn validate_non_negative(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    validate_money_bound(amount)
}

/// Amounts may be signed but never larger than `MAX_MONEY` in magnitude
pub fn validate_money_bound(amount: Decimal) -> Result<(), &'static str> {
    if amount.abs() > MAX_MONEY {
        return Err("Amount exceeds the maximum of 1000000000");
    }
    Ok(())
}

/// `validator` hook for percentage fields
pub fn validate_percentage_field(percent: &Decimal) -> Result<(), ValidationError> {
    validate_percentage(*percent).map_err(|msg| {
        let mut err = ValidationError::new("percentage");
        err.message = Some(msg.into());
        err
    })
}

/// `validator` hook for money fields
pub fn validate_money_field(amount: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative(*amount).map_err(|msg| {
        let mut err = ValidationError::new("non_negative");
        err.message = Some(msg.into());
        err
    })
}

/// `validator` hook for signed money fields such as opening balances
pub fn validate_balance_field(amount: &Decimal) -> Result<(), ValidationError> {
    validate_money_bound(*amount).map_err(|msg| {
        let mut err = ValidationError::new("money_bound");
        err.message = Some(msg.into());
        err
    })
}

/// `validator` hook for carton/piece count fields
pub fn validate_quantity_field(quantity: i32) -> Result<(), ValidationError> {
    validate_line_quantity(quantity).map_err(|msg| {
        let mut err = ValidationError::new("quantity");
        err.message = Some(msg.into());
        err
    })
}

// ============================================================================
// Document Validations
// ============================================================================

/// An order must carry at least one line of any kind
pub fn validate_order_lines(items: usize, damage_items: usize, free_offer_items: usize) -> Result<(), &'static str> {
    if items + damage_items + free_offer_items == 0 {
        return Err("At least one item (items, damage_items, or free_offer_items) is required to create an order");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_disabled_drops_ends() {
        let a = Uuid::new_v4();
        assert_eq!(validate_transfer(false, Some(a), Some(a)), Ok(None));
    }

    #[test]
    fn test_transfer_same_ends_rejected() {
        let a = Uuid::new_v4();
        assert!(validate_transfer(true, Some(a), Some(a)).is_err());
    }

    #[test]
    fn test_transfer_missing_end_rejected() {
        assert!(validate_transfer(true, Some(Uuid::new_v4()), None).is_err());
        assert!(validate_transfer(true, None, None).is_err());
    }

    #[test]
    fn test_transfer_valid() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(validate_transfer(true, Some(a), Some(b)), Ok(Some((a, b))));
    }

    #[test]
    fn test_posting_quantity() {
        assert!(validate_posting_quantity(CtnPcs::new(1, 0)).is_ok());
        assert!(validate_posting_quantity(CtnPcs::new(0, 0)).is_err());
        assert!(validate_posting_quantity(CtnPcs::new(-1, 5)).is_err());
        assert!(validate_posting_quantity(CtnPcs::new(MAX_LINE_QUANTITY + 1, 0)).is_err());
    }

    #[test]
    fn test_line_quantity_bounds() {
        assert!(validate_line_quantity(0).is_ok());
        assert!(validate_line_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_line_quantity(MAX_LINE_QUANTITY + 1).is_err());
        assert!(validate_line_quantity(i32::MAX).is_err());
        assert!(validate_line_quantity(-1).is_err());
    }

    #[test]
    fn test_money_bounds() {
        assert!(validate_non_negative(MAX_MONEY).is_ok());
        assert!(validate_non_negative(Decimal::MAX).is_err());
        assert!(validate_money_bound(-MAX_MONEY).is_ok());
        assert!(validate_money_bound(Decimal::MIN).is_err());
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(validate_percentage(Decimal::ZERO).is_ok());
        assert!(validate_percentage(Decimal::ONE_HUNDRED).is_ok());
        assert!(validate_percentage(Decimal::from(101)).is_err());
        assert!(validate_percentage(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_validator_hooks() {
        assert!(validate_money_field(&Decimal::from(-5)).is_err());
        assert!(validate_percentage_field(&Decimal::from(10)).is_ok());
        assert!(validate_quantity_field(-2).is_err());
        assert!(validate_quantity_field(i32::MAX).is_err());
        assert!(validate_quantity_field(12).is_ok());
        assert!(validate_balance_field(&Decimal::from(-250)).is_ok());
    }

    #[test]
    fn test_order_needs_a_line() {
        assert!(validate_order_lines(0, 0, 0).is_err());
        assert!(validate_order_lines(0, 1, 0).is_ok());
    }
}
