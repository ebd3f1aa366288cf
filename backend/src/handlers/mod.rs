//! HTTP handlers for the Wholesale Distribution API

mod area;
mod brand;
mod collection;
mod customer;
mod health;
mod order;
mod product;
mod purchase;
mod staff;
mod stock;
mod supplier;

pub use area::*;
pub use brand::*;
pub use collection::*;
pub use customer::*;
pub use health::*;
pub use order::*;
pub use product::*;
pub use purchase::*;
pub use staff::*;
pub use stock::*;
pub use supplier::*;
