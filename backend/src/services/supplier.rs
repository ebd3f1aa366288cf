//! Supplier service: the parties purchases are bought from

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::validation::validate_balance_field;

use crate::error::{AppError, AppResult};
use crate::services::protect::{ensure_unreferenced, lock_row, Reference};

const SUPPLIER_REFERENCES: [Reference; 1] =
    [Reference::new("purchases", "supplier_id", "purchases")];

#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// Supplier record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub brand_name: String,
    pub contact_person: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
    pub opening_balance: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SUPPLIER_COLUMNS: &str = "id, brand_name, contact_person, contact_number, address, note, \
     opening_balance, is_active, created_at, updated_at";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupplierInput {
    #[validate(length(min = 1, max = 255))]
    pub brand_name: String,
    #[validate(length(max = 255))]
    pub contact_person: Option<String>,
    #[validate(length(max = 50))]
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
    #[validate(custom = "validate_balance_field")]
    pub opening_balance: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSupplierInput {
    #[validate(length(min = 1, max = 255))]
    pub brand_name: Option<String>,
    #[validate(length(max = 255))]
    pub contact_person: Option<String>,
    #[validate(length(max = 50))]
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
    #[validate(custom = "validate_balance_field")]
    pub opening_balance: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SupplierFilter {
    pub is_active: Option<bool>,
}

impl SupplierService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    #[tracing::instrument(skip(self, input), fields(brand_name = %input.brand_name))]
    pub async fn create_supplier(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (
                brand_name, contact_person, contact_number, address, note,
                opening_balance, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(&input.brand_name)
        .bind(&input.contact_person)
        .bind(&input.contact_number)
        .bind(&input.address)
        .bind(&input.note)
        .bind(input.opening_balance.unwrap_or(Decimal::ZERO))
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    pub async fn list_suppliers(&self, filter: SupplierFilter) -> AppResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers \
             WHERE ($1::boolean IS NULL OR is_active = $1) ORDER BY brand_name"
        ))
        .bind(filter.is_active)
        .fetch_all(&self.db)
        .await?;

        Ok(suppliers)
    }

    pub async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"
        ))
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_supplier(
        &self,
        supplier_id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers
            SET brand_name = COALESCE($2, brand_name),
                contact_person = COALESCE($3, contact_person),
                contact_number = COALESCE($4, contact_number),
                address = COALESCE($5, address),
                note = COALESCE($6, note),
                opening_balance = COALESCE($7, opening_balance),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(supplier_id)
        .bind(&input.brand_name)
        .bind(&input.contact_person)
        .bind(&input.contact_number)
        .bind(&input.address)
        .bind(&input.note)
        .bind(input.opening_balance)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    /// Delete a supplier with no purchases on record
    #[tracing::instrument(skip(self))]
    pub async fn delete_supplier(&self, supplier_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "suppliers", supplier_id, "Supplier").await?;
        ensure_unreferenced(&mut tx, "supplier", supplier_id, &SUPPLIER_REFERENCES).await?;

        sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(supplier_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(supplier_id = %supplier_id, "Supplier deleted");
        Ok(())
    }
}
