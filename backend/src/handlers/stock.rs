//! HTTP handlers for stock types, stock transactions and balances

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::stock::{
    CreateStockTransactionInput, LedgerService, ProductStockLevel, StockTransaction,
    StockTransactionFilter, StockTypeSummary,
};
use crate::AppState;

/// List stock types with their balances
pub async fn list_stock_types(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StockTypeSummary>>> {
    let service = LedgerService::new(state.db, state.stock_types);
    let stock_types = service.list_stock_types().await?;
    Ok(Json(stock_types))
}

/// Get a stock type with its balance
pub async fn get_stock_type(
    State(state): State<AppState>,
    Path(stock_type_id): Path<Uuid>,
) -> AppResult<Json<StockTypeSummary>> {
    let service = LedgerService::new(state.db, state.stock_types);
    let stock_type = service.get_stock_type(stock_type_id).await?;
    Ok(Json(stock_type))
}

/// List stock transactions
pub async fn list_stock_transactions(
    State(state): State<AppState>,
    Query(filter): Query<StockTransactionFilter>,
) -> AppResult<Json<Vec<StockTransaction>>> {
    let service = LedgerService::new(state.db, state.stock_types);
    let transactions = service.list_transactions(filter).await?;
    Ok(Json(transactions))
}

/// Record a manual stock transaction
pub async fn create_stock_transaction(
    State(state): State<AppState>,
    Json(input): Json<CreateStockTransactionInput>,
) -> AppResult<(StatusCode, Json<StockTransaction>)> {
    input.validate()?;
    let service = LedgerService::new(state.db, state.stock_types);
    let transaction = service.create_manual(input).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Get a stock transaction
pub async fn get_stock_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<Json<StockTransaction>> {
    let service = LedgerService::new(state.db, state.stock_types);
    let transaction = service.get_transaction(transaction_id).await?;
    Ok(Json(transaction))
}

/// Balances of a product in every stock type
pub async fn get_product_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<ProductStockLevel>>> {
    let service = LedgerService::new(state.db, state.stock_types);
    let levels = service.product_levels(product_id).await?;
    Ok(Json(levels))
}

/// Balance of a product in one stock type
pub async fn get_product_stock_level(
    State(state): State<AppState>,
    Path((product_id, stock_type_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ProductStockLevel>> {
    let service = LedgerService::new(state.db, state.stock_types);
    let level = service.product_level(product_id, stock_type_id).await?;
    Ok(Json(level))
}
