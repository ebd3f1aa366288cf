//! HTTP handlers for the staff directory

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::staff::{
    CreateStaffInput, StaffFilter, StaffMember, StaffService, UpdateStaffInput,
};
use crate::AppState;

/// List staff, optionally by role or active flag
pub async fn list_staff(
    State(state): State<AppState>,
    Query(filter): Query<StaffFilter>,
) -> AppResult<Json<Vec<StaffMember>>> {
    let staff = StaffService::new(state.db).list_staff(filter).await?;
    Ok(Json(staff))
}

/// Create a staff member
pub async fn create_staff(
    State(state): State<AppState>,
    Json(input): Json<CreateStaffInput>,
) -> AppResult<(StatusCode, Json<StaffMember>)> {
    input.validate()?;
    let member = StaffService::new(state.db).create_staff(input).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn get_staff(
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> AppResult<Json<StaffMember>> {
    let member = StaffService::new(state.db).get_staff(staff_id).await?;
    Ok(Json(member))
}

pub async fn update_staff(
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
    Json(input): Json<UpdateStaffInput>,
) -> AppResult<Json<StaffMember>> {
    input.validate()?;
    let member = StaffService::new(state.db).update_staff(staff_id, input).await?;
    Ok(Json(member))
}

/// Delete a staff member
pub async fn delete_staff(
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    StaffService::new(state.db).delete_staff(staff_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
