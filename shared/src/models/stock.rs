//! Stock type and ledger models

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// The closed set of stock buckets the ledger posts to.
///
/// Each kind maps to exactly one `stock_types` row, seeded at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockKind {
    Main,
    Regular,
    Free,
    Damage,
    Advance,
}

impl StockKind {
    pub const ALL: [StockKind; 5] = [
        StockKind::Main,
        StockKind::Regular,
        StockKind::Free,
        StockKind::Damage,
        StockKind::Advance,
    ];

    /// Canonical row name in `stock_types`
    pub fn name(&self) -> &'static str {
        match self {
            StockKind::Main => "Main Stock",
            StockKind::Regular => "Regular Stock",
            StockKind::Free => "Free Stock",
            StockKind::Damage => "Damage Stock",
            StockKind::Advance => "Advance Stock",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for StockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a stock transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    In,
    Out,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(TransactionType::In),
            "OUT" => Ok(TransactionType::Out),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// What caused a ledger posting.
///
/// A posting references at most one line item; manual entries reference none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PostingSource {
    OrderItem(Uuid),
    DamageOrderItem(Uuid),
    FreeOfferItem(Uuid),
    Manual,
}

impl PostingSource {
    pub fn order_item_id(&self) -> Option<Uuid> {
        match self {
            PostingSource::OrderItem(id) => Some(*id),
            _ => None,
        }
    }

    pub fn damage_order_item_id(&self) -> Option<Uuid> {
        match self {
            PostingSource::DamageOrderItem(id) => Some(*id),
            _ => None,
        }
    }

    pub fn free_offer_item_id(&self) -> Option<Uuid> {
        match self {
            PostingSource::FreeOfferItem(id) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_kind_names_round_trip() {
        for kind in StockKind::ALL {
            assert_eq!(StockKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(StockKind::from_name("Regular stock"), None);
    }

    #[test]
    fn test_transaction_type_parse() {
        assert_eq!("IN".parse::<TransactionType>(), Ok(TransactionType::In));
        assert_eq!("OUT".parse::<TransactionType>(), Ok(TransactionType::Out));
        assert!("out".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&TransactionType::Out).unwrap(), "\"OUT\"");
        assert_eq!(serde_json::to_string(&StockKind::Advance).unwrap(), "\"advance\"");
        let source = serde_json::to_value(PostingSource::FreeOfferItem(Uuid::nil())).unwrap();
        assert_eq!(source["kind"], "free_offer_item");
    }

    #[test]
    fn test_posting_source_exposes_single_reference() {
        let id = Uuid::new_v4();
        let source = PostingSource::DamageOrderItem(id);
        assert_eq!(source.order_item_id(), None);
        assert_eq!(source.damage_order_item_id(), Some(id));
        assert_eq!(source.free_offer_item_id(), None);
        assert_eq!(PostingSource::Manual.order_item_id(), None);
    }
}
