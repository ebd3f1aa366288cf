//! HTTP handlers for purchases

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::purchase::{
    CreatePurchaseInput, Purchase, PurchaseDetail, PurchaseService, UpdatePurchaseInput,
};
use crate::services::{DocumentNumberService, DocumentSeries};
use crate::AppState;

/// List purchases
pub async fn list_purchases(State(state): State<AppState>) -> AppResult<Json<Vec<Purchase>>> {
    let service = PurchaseService::new(state.db, state.config.numbering.max_attempts);
    let purchases = service.list_purchases().await?;
    Ok(Json(purchases))
}

/// Create a purchase
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(input): Json<CreatePurchaseInput>,
) -> AppResult<(StatusCode, Json<PurchaseDetail>)> {
    input.validate()?;
    let service = PurchaseService::new(state.db, state.config.numbering.max_attempts);
    let purchase = service.create_purchase(input).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// Get a purchase with its items
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<Json<PurchaseDetail>> {
    let service = PurchaseService::new(state.db, state.config.numbering.max_attempts);
    let purchase = service.get_purchase(purchase_id).await?;
    Ok(Json(purchase))
}

/// Edit a purchase, optionally replacing its items
pub async fn update_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
    Json(input): Json<UpdatePurchaseInput>,
) -> AppResult<Json<PurchaseDetail>> {
    input.validate()?;
    let service = PurchaseService::new(state.db, state.config.numbering.max_attempts);
    let purchase = service.update_purchase(purchase_id, input).await?;
    Ok(Json(purchase))
}

/// Delete a purchase
pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = PurchaseService::new(state.db, state.config.numbering.max_attempts);
    service.delete_purchase(purchase_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Preview the next voucher number
pub async fn generate_voucher_number(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let service = DocumentNumberService::new(state.db, state.config.numbering.max_attempts);
    let voucher_number = service.generate(DocumentSeries::Voucher).await?;
    Ok(Json(json!({ "voucher_number": voucher_number })))
}
