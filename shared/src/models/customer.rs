//! Customer credit models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Discount terms a customer carries into every sales collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerTerms {
    pub order_discount_percent: Decimal,
    pub have_special_discount: bool,
    pub special_discount_percent: Decimal,
}

impl CustomerTerms {
    /// Commission percentage copied onto a collection
    pub fn commission_percent(&self) -> Decimal {
        self.order_discount_percent
    }

    /// Special discount percentage, zero unless the customer has one
    pub fn special_discount(&self) -> Decimal {
        if self.have_special_discount {
            self.special_discount_percent
        } else {
            Decimal::ZERO
        }
    }
}

/// Customer balance: opening balance plus everything collected, minus everything sold on credit.
///
/// A negative balance means the customer owes money.
pub fn customer_balance(opening_balance: Decimal, total_collected: Decimal, total_due_sell: Decimal) -> Decimal {
    (opening_balance + total_collected) - total_due_sell
}
