//! Brand service: the manufacturers products belong to

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::BrandStatus;
use shared::validation::validate_balance_field;

use crate::error::{AppError, AppResult};
use crate::services::protect::{ensure_unreferenced, lock_row, Reference};

const BRAND_REFERENCES: [Reference; 1] = [Reference::new("products", "brand_id", "products")];

#[derive(Clone)]
pub struct BrandService {
    db: PgPool,
}

/// Brand record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
    pub brand_address: Option<String>,
    pub status: String,
    pub note: Option<String>,
    pub representative_name: Option<String>,
    pub representative_contact_number: Option<String>,
    pub opening_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const BRAND_COLUMNS: &str = "id, name, brand_address, status, note, representative_name, \
     representative_contact_number, opening_balance, created_at, updated_at";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBrandInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1255))]
    pub brand_address: Option<String>,
    #[serde(default)]
    pub status: BrandStatus,
    pub note: Option<String>,
    #[validate(length(max = 255))]
    pub representative_name: Option<String>,
    #[validate(length(max = 50))]
    pub representative_contact_number: Option<String>,
    #[validate(custom = "validate_balance_field")]
    pub opening_balance: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBrandInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1255))]
    pub brand_address: Option<String>,
    pub status: Option<BrandStatus>,
    pub note: Option<String>,
    #[validate(length(max = 255))]
    pub representative_name: Option<String>,
    #[validate(length(max = 50))]
    pub representative_contact_number: Option<String>,
    #[validate(custom = "validate_balance_field")]
    pub opening_balance: Option<Decimal>,
}

impl BrandService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_brand(&self, input: CreateBrandInput) -> AppResult<Brand> {
        let brand = sqlx::query_as::<_, Brand>(&format!(
            r#"
            INSERT INTO brands (
                name, brand_address, status, note, representative_name,
                representative_contact_number, opening_balance
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BRAND_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.brand_address)
        .bind(input.status.as_str())
        .bind(&input.note)
        .bind(&input.representative_name)
        .bind(&input.representative_contact_number)
        .bind(input.opening_balance.unwrap_or(Decimal::ZERO))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(brand_id = %brand.id, "Brand created");
        Ok(brand)
    }

    pub async fn list_brands(&self) -> AppResult<Vec<Brand>> {
        let brands = sqlx::query_as::<_, Brand>(&format!(
            "SELECT {BRAND_COLUMNS} FROM brands ORDER BY name"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(brands)
    }

    pub async fn get_brand(&self, brand_id: Uuid) -> AppResult<Brand> {
        sqlx::query_as::<_, Brand>(&format!("SELECT {BRAND_COLUMNS} FROM brands WHERE id = $1"))
            .bind(brand_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Brand".to_string()))
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_brand(&self, brand_id: Uuid, input: UpdateBrandInput) -> AppResult<Brand> {
        sqlx::query_as::<_, Brand>(&format!(
            r#"
            UPDATE brands
            SET name = COALESCE($2, name),
                brand_address = COALESCE($3, brand_address),
                status = COALESCE($4, status),
                note = COALESCE($5, note),
                representative_name = COALESCE($6, representative_name),
                representative_contact_number = COALESCE($7, representative_contact_number),
                opening_balance = COALESCE($8, opening_balance),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BRAND_COLUMNS}
            "#
        ))
        .bind(brand_id)
        .bind(&input.name)
        .bind(&input.brand_address)
        .bind(input.status.map(|s| s.as_str()))
        .bind(&input.note)
        .bind(&input.representative_name)
        .bind(&input.representative_contact_number)
        .bind(input.opening_balance)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Brand".to_string()))
    }

    /// Delete a brand no product belongs to
    #[tracing::instrument(skip(self))]
    pub async fn delete_brand(&self, brand_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "brands", brand_id, "Brand").await?;
        ensure_unreferenced(&mut tx, "brand", brand_id, &BRAND_REFERENCES).await?;

        sqlx::query("DELETE FROM brands WHERE id = $1")
            .bind(brand_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(brand_id = %brand_id, "Brand deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_brand_defaults_to_active() {
        let input: CreateBrandInput =
            serde_json::from_value(serde_json::json!({ "name": "Pran" })).unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(input.status, BrandStatus::Active);
    }

    #[test]
    fn test_status_wire_values() {
        let input: UpdateBrandInput =
            serde_json::from_value(serde_json::json!({ "status": "IN_ACTIVE" })).unwrap();
        assert_eq!(input.status.map(|s| s.as_str()), Some("IN_ACTIVE"));
    }

    #[test]
    fn test_opening_balance_bound() {
        let input = UpdateBrandInput {
            opening_balance: Some(Decimal::from(-2_000_000_000i64)),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }
}
