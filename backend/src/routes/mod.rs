//! API route definitions for the Wholesale Distribution backend

use axum::{
    routing::{get, patch},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ready", get(handlers::readiness))
        // Territories and staff
        .nest("/zones", zone_routes())
        .nest("/areas", area_routes())
        .nest("/staff", staff_routes())
        // Stock ledger
        .nest("/stock-types", stock_type_routes())
        .nest("/stock-transactions", stock_transaction_routes())
        .nest("/stock", stock_routes())
        // Catalog
        .nest("/brands", brand_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/products", product_routes())
        .route(
            "/prices/:price_id",
            patch(handlers::update_price).delete(handlers::delete_price),
        )
        // Documents
        .nest("/orders", order_routes())
        .nest("/purchases", purchase_routes())
        .nest("/sales-collections", sales_collection_routes())
        // Customer credit
        .nest("/customers", customer_routes())
        .route(
            "/due-sells",
            get(handlers::list_due_sells).post(handlers::create_due_sell),
        )
        .route(
            "/due-collections",
            get(handlers::list_due_collections).post(handlers::create_due_collection),
        )
}

fn zone_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_zones).post(handlers::create_zone))
        .route(
            "/:zone_id",
            get(handlers::get_zone)
                .patch(handlers::update_zone)
                .delete(handlers::delete_zone),
        )
}

fn area_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_areas).post(handlers::create_area))
        .route("/working-days", get(handlers::list_working_days))
        .route(
            "/:area_id",
            get(handlers::get_area)
                .patch(handlers::update_area)
                .delete(handlers::delete_area),
        )
}

fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_staff).post(handlers::create_staff))
        .route(
            "/:staff_id",
            get(handlers::get_staff)
                .patch(handlers::update_staff)
                .delete(handlers::delete_staff),
        )
}

fn brand_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_brands).post(handlers::create_brand))
        .route(
            "/:brand_id",
            get(handlers::get_brand)
                .patch(handlers::update_brand)
                .delete(handlers::delete_brand),
        )
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .patch(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
}

fn stock_type_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_types))
        .route("/:stock_type_id", get(handlers::get_stock_type))
}

/// Ledger entries: append-only, no update or delete
fn stock_transaction_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_stock_transactions).post(handlers::create_stock_transaction),
        )
        .route("/:transaction_id", get(handlers::get_stock_transaction))
}

fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/products/:product_id", get(handlers::get_product_stock))
        .route(
            "/products/:product_id/:stock_type_id",
            get(handlers::get_product_stock_level),
        )
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/generate-sku", get(handlers::generate_sku))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .patch(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/:product_id/prices",
            get(handlers::list_prices).post(handlers::create_price),
        )
        .route("/:product_id/prices/latest", get(handlers::get_latest_price))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/generate-order-number", get(handlers::generate_order_number))
        .route(
            "/:order_id",
            get(handlers::get_order)
                .patch(handlers::update_order)
                .delete(handlers::delete_order),
        )
}

fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchases).post(handlers::create_purchase))
        .route(
            "/generate-voucher-number",
            get(handlers::generate_voucher_number),
        )
        .route(
            "/:purchase_id",
            get(handlers::get_purchase)
                .patch(handlers::update_purchase)
                .delete(handlers::delete_purchase),
        )
}

fn sales_collection_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_sales_collections).post(handlers::create_sales_collection),
        )
        .route(
            "/:collection_id",
            get(handlers::get_sales_collection)
                .patch(handlers::update_sales_collection)
                .delete(handlers::delete_sales_collection),
        )
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_customers).post(handlers::create_customer))
        .route(
            "/:customer_id",
            get(handlers::get_customer)
                .patch(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
}
