//! Common types used across the platform

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places kept for money amounts
pub const MONEY_SCALE: u32 = 2;

/// Largest carton or piece count accepted on a single line
pub const MAX_LINE_QUANTITY: i32 = 1_000_000;

/// Largest price or money amount accepted on input (1 000 000 000.00)
pub const MAX_MONEY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Round a money amount to the currency's minor unit
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// A quantity expressed in cartons and loose pieces.
///
/// Both units are tracked independently; a carton count is never converted
/// into pieces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtnPcs {
    pub ctn: i32,
    pub pcs: i32,
}

impl CtnPcs {
    pub const ZERO: CtnPcs = CtnPcs { ctn: 0, pcs: 0 };

    pub fn new(ctn: i32, pcs: i32) -> Self {
        Self { ctn, pcs }
    }

    /// True when neither unit carries a positive amount
    pub fn is_nothing(&self) -> bool {
        self.ctn <= 0 && self.pcs <= 0
    }

    /// True when at least one unit is positive
    pub fn has_positive(&self) -> bool {
        !self.is_nothing()
    }

    /// Replace negative units with zero
    pub fn clamp_non_negative(&self) -> Self {
        Self {
            ctn: self.ctn.max(0),
            pcs: self.pcs.max(0),
        }
    }

    /// True when both units lie within `0..=MAX_LINE_QUANTITY`
    pub fn within_line_bounds(&self) -> bool {
        let bounds = 0..=MAX_LINE_QUANTITY;
        bounds.contains(&self.ctn) && bounds.contains(&self.pcs)
    }

    /// Unit-wise sum; `None` on overflow
    pub fn checked_plus(&self, other: CtnPcs) -> Option<Self> {
        Some(Self {
            ctn: self.ctn.checked_add(other.ctn)?,
            pcs: self.pcs.checked_add(other.pcs)?,
        })
    }

    /// Unit-wise difference; `None` on overflow
    pub fn checked_minus(&self, other: CtnPcs) -> Option<Self> {
        Some(Self {
            ctn: self.ctn.checked_sub(other.ctn)?,
            pcs: self.pcs.checked_sub(other.pcs)?,
        })
    }
}

/// Per-unit prices resolved from a price snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPrices {
    pub ctn_price: Decimal,
    pub piece_price: Decimal,
}

impl UnitPrices {
    pub fn new(ctn_price: Decimal, piece_price: Decimal) -> Self {
        Self {
            ctn_price,
            piece_price,
        }
    }

    /// Value of a carton/piece quantity at these prices; `None` when it does not fit a `Decimal`
    pub fn value_of(&self, quantity: CtnPcs) -> Option<Decimal> {
        let ctn = self.ctn_price.checked_mul(Decimal::from(quantity.ctn))?;
        let pcs = self.piece_price.checked_mul(Decimal::from(quantity.pcs))?;
        ctn.checked_add(pcs)
    }

    /// Scale both prices by a factor, rounded to money precision
    pub fn scaled(&self, factor: Decimal) -> Option<Self> {
        Some(Self {
            ctn_price: round_money(self.ctn_price.checked_mul(factor)?),
            piece_price: round_money(self.piece_price.checked_mul(factor)?),
        })
    }
}

/// Date range for queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: chrono::NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
