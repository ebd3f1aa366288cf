//! Shared types and domain logic for the Wholesale Distribution backend
//!
//! This crate holds the parts of the system that do not touch the database:
//! the stock ledger posting rules, balance folding, document numbering,
//! price versioning and the pricing/discount calculator.

pub mod ledger;
pub mod models;
pub mod numbering;
pub mod pricing;
pub mod types;
pub mod validation;
pub mod versioning;

pub use models::*;
pub use types::*;
pub use validation::*;
