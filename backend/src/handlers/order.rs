//! HTTP handlers for order deliveries

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::order::{
    CreateOrderInput, OrderDetail, OrderFilter, OrderService, OrderSummary, UpdateOrderInput,
};
use crate::services::{DocumentNumberService, DocumentSeries};
use crate::AppState;

fn order_service(state: AppState) -> OrderService {
    OrderService::new(
        state.db,
        state.stock_types,
        state.config.numbering.max_attempts,
    )
}

/// List orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<Vec<OrderSummary>>> {
    let orders = order_service(state).list_orders(filter).await?;
    Ok(Json(orders))
}

/// Create an order with its items and stock postings
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<OrderDetail>)> {
    input.validate()?;
    let order = order_service(state).create_order(input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get an order with its items
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let order = order_service(state).get_order(order_id).await?;
    Ok(Json(order))
}

/// Update an order header
pub async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateOrderInput>,
) -> AppResult<Json<OrderDetail>> {
    input.validate()?;
    let order = order_service(state).update_order(order_id, input).await?;
    Ok(Json(order))
}

/// Delete an order
pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    order_service(state).delete_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Preview the next order number
pub async fn generate_order_number(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let service = DocumentNumberService::new(state.db, state.config.numbering.max_attempts);
    let order_number = service.generate(DocumentSeries::Order).await?;
    Ok(Json(json!({ "order_number": order_number })))
}
