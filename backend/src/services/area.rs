//! Sales territory service: zones, their areas and route working days

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::{normalize_working_days, WorkingDay};

use crate::error::{AppError, AppResult};
use crate::services::protect::{ensure_exists, ensure_unreferenced, lock_row, Reference};

const ZONE_REFERENCES: [Reference; 1] = [Reference::new("areas", "zone_id", "areas")];

const AREA_REFERENCES: [Reference; 1] = [Reference::new("customers", "area_id", "customers")];

/// Territory service
#[derive(Clone)]
pub struct AreaService {
    db: PgPool,
}

/// Zone record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Zone {
    pub id: Uuid,
    pub name: String,
    pub is_archive: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ZONE_COLUMNS: &str = "id, name, is_archive, created_at, updated_at";

/// Area record; `working_days` are stored in week order
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Area {
    pub id: Uuid,
    pub zone_id: Uuid,
    pub zone_name: String,
    pub name: String,
    pub route_number: String,
    pub working_days: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const AREA_SELECT: &str = r#"
    SELECT a.id, a.zone_id, z.name AS zone_name, a.name, a.route_number, a.working_days,
           a.created_at, a.updated_at
    FROM areas a
    JOIN zones z ON z.id = a.zone_id
"#;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateZoneInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub is_archive: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateZoneInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub is_archive: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ZoneFilter {
    pub is_archive: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAreaInput {
    pub zone_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub route_number: String,
    #[serde(default)]
    pub working_days: Vec<WorkingDay>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAreaInput {
    pub zone_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub route_number: Option<String>,
    /// Replaces the whole set when present
    pub working_days: Option<Vec<WorkingDay>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AreaFilter {
    pub zone_id: Option<Uuid>,
}

fn day_names(days: &[WorkingDay]) -> Vec<String> {
    normalize_working_days(days)
        .into_iter()
        .map(|day| day.as_str().to_string())
        .collect()
}

impl AreaService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------------
    // Zones
    // ------------------------------------------------------------------------

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_zone(&self, input: CreateZoneInput) -> AppResult<Zone> {
        let zone = sqlx::query_as::<_, Zone>(&format!(
            "INSERT INTO zones (name, is_archive) VALUES ($1, $2) RETURNING {ZONE_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(input.is_archive)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "name"))?;

        tracing::info!(zone_id = %zone.id, "Zone created");
        Ok(zone)
    }

    pub async fn list_zones(&self, filter: ZoneFilter) -> AppResult<Vec<Zone>> {
        let zones = sqlx::query_as::<_, Zone>(&format!(
            "SELECT {ZONE_COLUMNS} FROM zones WHERE ($1::boolean IS NULL OR is_archive = $1) ORDER BY name"
        ))
        .bind(filter.is_archive)
        .fetch_all(&self.db)
        .await?;

        Ok(zones)
    }

    pub async fn get_zone(&self, zone_id: Uuid) -> AppResult<Zone> {
        sqlx::query_as::<_, Zone>(&format!("SELECT {ZONE_COLUMNS} FROM zones WHERE id = $1"))
            .bind(zone_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Zone".to_string()))
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_zone(&self, zone_id: Uuid, input: UpdateZoneInput) -> AppResult<Zone> {
        sqlx::query_as::<_, Zone>(&format!(
            r#"
            UPDATE zones
            SET name = COALESCE($2, name),
                is_archive = COALESCE($3, is_archive),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ZONE_COLUMNS}
            "#
        ))
        .bind(zone_id)
        .bind(&input.name)
        .bind(input.is_archive)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "name"))?
        .ok_or_else(|| AppError::NotFound("Zone".to_string()))
    }

    /// Delete a zone that has no areas
    #[tracing::instrument(skip(self))]
    pub async fn delete_zone(&self, zone_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "zones", zone_id, "Zone").await?;
        ensure_unreferenced(&mut tx, "zone", zone_id, &ZONE_REFERENCES).await?;

        sqlx::query("DELETE FROM zones WHERE id = $1")
            .bind(zone_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(zone_id = %zone_id, "Zone deleted");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Areas
    // ------------------------------------------------------------------------

    #[tracing::instrument(skip(self, input), fields(zone_id = %input.zone_id))]
    pub async fn create_area(&self, input: CreateAreaInput) -> AppResult<Area> {
        let mut tx = self.db.begin().await?;

        ensure_exists(&mut tx, "zones", input.zone_id, "Zone").await?;

        let area_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO areas (zone_id, name, route_number, working_days)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(input.zone_id)
        .bind(&input.name)
        .bind(&input.route_number)
        .bind(day_names(&input.working_days))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(area_id = %area_id, "Area created");
        self.get_area(area_id).await
    }

    pub async fn list_areas(&self, filter: AreaFilter) -> AppResult<Vec<Area>> {
        let areas = sqlx::query_as::<_, Area>(&format!(
            "{AREA_SELECT} WHERE ($1::uuid IS NULL OR a.zone_id = $1) ORDER BY a.name"
        ))
        .bind(filter.zone_id)
        .fetch_all(&self.db)
        .await?;

        Ok(areas)
    }

    pub async fn get_area(&self, area_id: Uuid) -> AppResult<Area> {
        sqlx::query_as::<_, Area>(&format!("{AREA_SELECT} WHERE a.id = $1"))
            .bind(area_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Area".to_string()))
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_area(&self, area_id: Uuid, input: UpdateAreaInput) -> AppResult<Area> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "areas", area_id, "Area").await?;
        if let Some(zone_id) = input.zone_id {
            ensure_exists(&mut tx, "zones", zone_id, "Zone").await?;
        }

        sqlx::query(
            r#"
            UPDATE areas
            SET zone_id = COALESCE($2, zone_id),
                name = COALESCE($3, name),
                route_number = COALESCE($4, route_number),
                working_days = COALESCE($5, working_days),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(area_id)
        .bind(input.zone_id)
        .bind(&input.name)
        .bind(&input.route_number)
        .bind(input.working_days.as_deref().map(day_names))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_area(area_id).await
    }

    /// Delete an area no customer belongs to
    #[tracing::instrument(skip(self))]
    pub async fn delete_area(&self, area_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "areas", area_id, "Area").await?;
        ensure_unreferenced(&mut tx, "area", area_id, &AREA_REFERENCES).await?;

        sqlx::query("DELETE FROM areas WHERE id = $1")
            .bind(area_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(area_id = %area_id, "Area deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_names_are_ordered_and_unique() {
        let names = day_names(&[WorkingDay::Tuesday, WorkingDay::Saturday, WorkingDay::Tuesday]);
        assert_eq!(names, vec!["Saturday", "Tuesday"]);
    }

    #[test]
    fn test_area_input_parses_day_names() {
        let input: CreateAreaInput = serde_json::from_value(serde_json::json!({
            "zone_id": Uuid::nil(),
            "name": "Mirpur 10",
            "route_number": "R-7",
            "working_days": ["Sunday", "Wednesday"],
        }))
        .unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(input.working_days, vec![WorkingDay::Sunday, WorkingDay::Wednesday]);

        let unknown = serde_json::from_value::<CreateAreaInput>(serde_json::json!({
            "zone_id": Uuid::nil(),
            "name": "Mirpur 10",
            "route_number": "R-7",
            "working_days": ["Funday"],
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let input = UpdateZoneInput {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = UpdateAreaInput {
            route_number: Some(String::new()),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }
}
