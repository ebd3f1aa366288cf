//! HTTP handlers for sales collections

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::collection::{
    CreateSalesCollectionInput, SalesCollection, SalesCollectionDetail, SalesCollectionService,
    UpdateSalesCollectionInput,
};
use crate::AppState;

fn collection_service(state: AppState) -> SalesCollectionService {
    SalesCollectionService::new(
        state.db,
        state.config.numbering.max_attempts,
        state.config.sales.default_deduction_percentage,
    )
}

/// List sales collections
pub async fn list_sales_collections(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<SalesCollection>>> {
    let collections = collection_service(state).list_collections().await?;
    Ok(Json(collections))
}

/// Create a sales collection
pub async fn create_sales_collection(
    State(state): State<AppState>,
    Json(input): Json<CreateSalesCollectionInput>,
) -> AppResult<(StatusCode, Json<SalesCollectionDetail>)> {
    input.validate()?;
    let collection = collection_service(state).create_collection(input).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

/// Get a sales collection with its items
pub async fn get_sales_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<Uuid>,
) -> AppResult<Json<SalesCollectionDetail>> {
    let collection = collection_service(state).get_collection(collection_id).await?;
    Ok(Json(collection))
}

/// Edit a sales collection, optionally replacing its items
pub async fn update_sales_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<Uuid>,
    Json(input): Json<UpdateSalesCollectionInput>,
) -> AppResult<Json<SalesCollectionDetail>> {
    input.validate()?;
    let collection = collection_service(state)
        .update_collection(collection_id, input)
        .await?;
    Ok(Json(collection))
}

/// Delete a sales collection
pub async fn delete_sales_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    collection_service(state).delete_collection(collection_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
