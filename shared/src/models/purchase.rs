//! Purchase models

use serde::{Deserialize, Serialize};

/// Payment status of a purchase, derived from paid vs. total amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PurchaseStatus {
    Pending,
    Due,
    Paid,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "PENDING",
            PurchaseStatus::Due => "DUE",
            PurchaseStatus::Paid => "PAID",
        }
    }
}

/// Unit a purchase item is counted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseUnit {
    #[serde(rename = "CTN")]
    Ctn,
    #[serde(rename = "PICs")]
    Pics,
}

impl PurchaseUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseUnit::Ctn => "CTN",
            PurchaseUnit::Pics => "PICs",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_wire_values() {
        assert_eq!(serde_json::to_string(&PurchaseUnit::Pics).unwrap(), "\"PICs\"");
        assert_eq!(
            serde_json::from_str::<PurchaseUnit>("\"CTN\"").unwrap(),
            PurchaseUnit::Ctn
        );
        assert!(serde_json::from_str::<PurchaseUnit>("\"PICS\"").is_err());
        assert_eq!(PurchaseUnit::Pics.as_str(), "PICs");
    }
}
