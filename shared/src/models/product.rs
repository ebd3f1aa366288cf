//! Product and price models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::types::UnitPrices;

/// Product lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Active,
    InActive,
    #[default]
    Pending,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "ACTIVE",
            ProductStatus::InActive => "IN_ACTIVE",
            ProductStatus::Pending => "PENDING",
        }
    }
}

/// Whether a brand is still traded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrandStatus {
    #[default]
    Active,
    InActive,
}

impl BrandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrandStatus::Active => "ACTIVE",
            BrandStatus::InActive => "IN_ACTIVE",
        }
    }
}

/// What a price row is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriceFor {
    #[default]
    Product,
    Purchase,
    Offer,
}

impl PriceFor {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceFor::Product => "PRODUCT",
            PriceFor::Purchase => "PURCHASE",
            PriceFor::Offer => "OFFER",
        }
    }
}

impl FromStr for PriceFor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRODUCT" => Ok(PriceFor::Product),
            "PURCHASE" => Ok(PriceFor::Purchase),
            "OFFER" => Ok(PriceFor::Offer),
            other => Err(format!("unknown price_for: {other}")),
        }
    }
}

/// The price a line item was valued at.
///
/// Prices are nullable on the price row; a missing unit price values that
/// unit at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub id: Uuid,
    pub ctn_price: Option<Decimal>,
    pub piece_price: Option<Decimal>,
}

impl PriceSnapshot {
    pub fn unit_prices(&self) -> UnitPrices {
        UnitPrices::new(
            self.ctn_price.unwrap_or(Decimal::ZERO),
            self.piece_price.unwrap_or(Decimal::ZERO),
        )
    }
}

/// Unit prices for an optional snapshot; no snapshot values everything at zero
pub fn unit_prices_of(price: Option<&PriceSnapshot>) -> UnitPrices {
    price.map(PriceSnapshot::unit_prices).unwrap_or_default()
}
