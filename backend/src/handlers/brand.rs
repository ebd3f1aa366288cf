//! HTTP handlers for brands

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::brand::{Brand, BrandService, CreateBrandInput, UpdateBrandInput};
use crate::AppState;

/// List brands
pub async fn list_brands(State(state): State<AppState>) -> AppResult<Json<Vec<Brand>>> {
    let brands = BrandService::new(state.db).list_brands().await?;
    Ok(Json(brands))
}

/// Create a brand
pub async fn create_brand(
    State(state): State<AppState>,
    Json(input): Json<CreateBrandInput>,
) -> AppResult<(StatusCode, Json<Brand>)> {
    input.validate()?;
    let brand = BrandService::new(state.db).create_brand(input).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

pub async fn get_brand(
    State(state): State<AppState>,
    Path(brand_id): Path<Uuid>,
) -> AppResult<Json<Brand>> {
    let brand = BrandService::new(state.db).get_brand(brand_id).await?;
    Ok(Json(brand))
}

pub async fn update_brand(
    State(state): State<AppState>,
    Path(brand_id): Path<Uuid>,
    Json(input): Json<UpdateBrandInput>,
) -> AppResult<Json<Brand>> {
    input.validate()?;
    let brand = BrandService::new(state.db).update_brand(brand_id, input).await?;
    Ok(Json(brand))
}

/// Delete a brand
pub async fn delete_brand(
    State(state): State<AppState>,
    Path(brand_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    BrandService::new(state.db).delete_brand(brand_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
