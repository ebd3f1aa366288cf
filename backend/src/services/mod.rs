//! Business logic services for the Wholesale Distribution backend

pub mod area;
pub mod brand;
pub mod collection;
pub mod customer;
pub mod numbering;
pub mod order;
pub mod price;
pub mod product;
pub mod protect;
pub mod purchase;
pub mod staff;
pub mod stock;
pub mod supplier;

pub use area::AreaService;
pub use brand::BrandService;
pub use collection::SalesCollectionService;
pub use customer::CustomerService;
pub use numbering::{DocumentNumberService, DocumentSeries};
pub use order::OrderService;
pub use price::PriceService;
pub use product::ProductService;
pub use purchase::PurchaseService;
pub use staff::StaffService;
pub use stock::{LedgerService, StockTypeRegistry};
pub use supplier::SupplierService;
