//! Staff directory models

use serde::{Deserialize, Serialize};

/// Job role of a staff member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    DeliveryMan,
    #[default]
    Salesman,
    Manager,
    Accountant,
    Director,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::DeliveryMan => "DELIVERY_MAN",
            StaffRole::Salesman => "SALESMAN",
            StaffRole::Manager => "MANAGER",
            StaffRole::Accountant => "ACCOUNTANT",
            StaffRole::Director => "DIRECTOR",
        }
    }
}
