//! Order delivery line item models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::CtnPcs;

/// Delivery shift of an order item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Shift {
    Morning,
    Evening,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::Morning => "MORNING",
            Shift::Evening => "EVENING",
        }
    }
}

/// A sold line on an order delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub shift: Shift,
    pub quantity: CtnPcs,
    /// Goods handed over ahead of the order
    pub advanced: CtnPcs,
    /// Goods brought back on delivery
    pub returned: CtnPcs,
}

impl OrderLine {
    /// Quantity leaving regular stock: delivered minus returned
    pub fn net_delivered(&self) -> Option<CtnPcs> {
        self.quantity.checked_minus(self.returned)
    }

    /// Quantity that is billed: delivered plus advanced minus returned
    pub fn net_billed(&self) -> Option<CtnPcs> {
        self.quantity
            .checked_plus(self.advanced)?
            .checked_minus(self.returned)
    }
}

/// A damaged line on an order delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: CtnPcs,
    pub damage_reason: Option<String>,
    /// Percent knocked off the unit price when valuing damaged stock
    pub deduction_percent: Option<Decimal>,
}

/// A free-offer line on an order delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeOfferLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: CtnPcs,
}
