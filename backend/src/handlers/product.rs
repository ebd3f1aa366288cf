//! HTTP handlers for products and their prices

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::price::{
    CreatePriceInput, LatestPriceQuery, PriceService, ProductPrice, UpdatePriceInput,
};
use crate::services::product::{CreateProductInput, Product, ProductService, UpdateProductInput};
use crate::services::{DocumentNumberService, DocumentSeries};
use crate::AppState;

/// List products
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.db, state.config.numbering.max_attempts);
    let products = service.list_products().await?;
    Ok(Json(products))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    input.validate()?;
    let service = ProductService::new(state.db, state.config.numbering.max_attempts);
    let product = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Get a product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db, state.config.numbering.max_attempts);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    input.validate()?;
    let service = ProductService::new(state.db, state.config.numbering.max_attempts);
    let product = service.update_product(product_id, input).await?;
    Ok(Json(product))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = ProductService::new(state.db, state.config.numbering.max_attempts);
    service.delete_product(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Preview the next SKU
pub async fn generate_sku(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let service = DocumentNumberService::new(state.db, state.config.numbering.max_attempts);
    let sku = service.generate(DocumentSeries::Sku).await?;
    Ok(Json(json!({ "sku": sku })))
}

/// List prices of a product
pub async fn list_prices(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<ProductPrice>>> {
    let service = PriceService::new(state.db);
    let prices = service.list_prices(product_id).await?;
    Ok(Json(prices))
}

/// Create a price for a product
pub async fn create_price(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<CreatePriceInput>,
) -> AppResult<(StatusCode, Json<ProductPrice>)> {
    input.validate()?;
    let service = PriceService::new(state.db);
    let price = service.create_price(product_id, input).await?;
    Ok((StatusCode::CREATED, Json(price)))
}

/// Latest price of a product
pub async fn get_latest_price(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<LatestPriceQuery>,
) -> AppResult<Json<ProductPrice>> {
    let service = PriceService::new(state.db);
    let price = service.latest_price(product_id, query.price_for).await?;
    Ok(Json(price))
}

/// Update a price
pub async fn update_price(
    State(state): State<AppState>,
    Path(price_id): Path<Uuid>,
    Json(input): Json<UpdatePriceInput>,
) -> AppResult<Json<ProductPrice>> {
    input.validate()?;
    let service = PriceService::new(state.db);
    let price = service.update_price(price_id, input).await?;
    Ok(Json(price))
}

/// Delete a price
pub async fn delete_price(
    State(state): State<AppState>,
    Path(price_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = PriceService::new(state.db);
    service.delete_price(price_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
