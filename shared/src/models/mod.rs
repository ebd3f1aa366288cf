//! Domain models for the Wholesale Distribution backend

mod area;
mod collection;
mod customer;
mod order;
mod product;
mod purchase;
mod staff;
mod stock;

pub use area::*;
pub use collection::*;
pub use customer::*;
pub use order::*;
pub use product::*;
pub use purchase::*;
pub use staff::*;
pub use stock::*;
