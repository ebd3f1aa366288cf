//! HTTP handlers for zones, areas and route working days

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use shared::models::WorkingDay;

use crate::error::AppResult;
use crate::services::area::{
    Area, AreaFilter, AreaService, CreateAreaInput, CreateZoneInput, UpdateAreaInput,
    UpdateZoneInput, Zone, ZoneFilter,
};
use crate::AppState;

/// List zones
pub async fn list_zones(
    State(state): State<AppState>,
    Query(filter): Query<ZoneFilter>,
) -> AppResult<Json<Vec<Zone>>> {
    let zones = AreaService::new(state.db).list_zones(filter).await?;
    Ok(Json(zones))
}

/// Create a zone
pub async fn create_zone(
    State(state): State<AppState>,
    Json(input): Json<CreateZoneInput>,
) -> AppResult<(StatusCode, Json<Zone>)> {
    input.validate()?;
    let zone = AreaService::new(state.db).create_zone(input).await?;
    Ok((StatusCode::CREATED, Json(zone)))
}

pub async fn get_zone(
    State(state): State<AppState>,
    Path(zone_id): Path<Uuid>,
) -> AppResult<Json<Zone>> {
    let zone = AreaService::new(state.db).get_zone(zone_id).await?;
    Ok(Json(zone))
}

pub async fn update_zone(
    State(state): State<AppState>,
    Path(zone_id): Path<Uuid>,
    Json(input): Json<UpdateZoneInput>,
) -> AppResult<Json<Zone>> {
    input.validate()?;
    let zone = AreaService::new(state.db).update_zone(zone_id, input).await?;
    Ok(Json(zone))
}

pub async fn delete_zone(
    State(state): State<AppState>,
    Path(zone_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    AreaService::new(state.db).delete_zone(zone_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List areas, optionally of one zone
pub async fn list_areas(
    State(state): State<AppState>,
    Query(filter): Query<AreaFilter>,
) -> AppResult<Json<Vec<Area>>> {
    let areas = AreaService::new(state.db).list_areas(filter).await?;
    Ok(Json(areas))
}

/// Create an area
pub async fn create_area(
    State(state): State<AppState>,
    Json(input): Json<CreateAreaInput>,
) -> AppResult<(StatusCode, Json<Area>)> {
    input.validate()?;
    let area = AreaService::new(state.db).create_area(input).await?;
    Ok((StatusCode::CREATED, Json(area)))
}

pub async fn get_area(
    State(state): State<AppState>,
    Path(area_id): Path<Uuid>,
) -> AppResult<Json<Area>> {
    let area = AreaService::new(state.db).get_area(area_id).await?;
    Ok(Json(area))
}

pub async fn update_area(
    State(state): State<AppState>,
    Path(area_id): Path<Uuid>,
    Json(input): Json<UpdateAreaInput>,
) -> AppResult<Json<Area>> {
    input.validate()?;
    let area = AreaService::new(state.db).update_area(area_id, input).await?;
    Ok(Json(area))
}

pub async fn delete_area(
    State(state): State<AppState>,
    Path(area_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    AreaService::new(state.db).delete_area(area_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The days an area route can be served on
pub async fn list_working_days() -> Json<Vec<&'static str>> {
    Json(WorkingDay::ALL.iter().map(WorkingDay::as_str).collect())
}
