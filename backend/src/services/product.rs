//! Product catalog service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::ProductStatus;

use crate::error::{AppError, AppResult};
use crate::services::numbering::{self, DocumentSeries};
use crate::services::protect::{ensure_exists, ensure_unreferenced, lock_row, Reference};

/// Tables that keep a product alive
const PRODUCT_REFERENCES: [Reference; 7] = [
    Reference::new("stock_transactions", "product_id", "stock transactions"),
    Reference::new("order_items", "product_id", "order items"),
    Reference::new("damage_order_items", "product_id", "damage order items"),
    Reference::new("free_offer_items", "product_id", "free offer items"),
    Reference::new("purchase_items", "product_id", "purchase items"),
    Reference::new("collection_items", "product_id", "collection items"),
    Reference::new("product_prices", "product_id", "product prices"),
];

/// Product service for catalog management
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
    numbering_attempts: u32,
}

/// Product record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand_id: Uuid,
    pub ctn_size: Option<i32>,
    pub status: String,
    pub sku: String,
    pub have_offer: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PRODUCT_COLUMNS: &str =
    "id, name, brand_id, ctn_size, status, sku, have_offer, created_at, updated_at";

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub brand_id: Uuid,
    #[validate(range(min = 0))]
    pub ctn_size: Option<i32>,
    #[serde(default)]
    pub status: ProductStatus,
    /// Generated when omitted
    #[validate(length(min = 1, max = 50))]
    pub sku: Option<String>,
    #[serde(default)]
    pub have_offer: bool,
}

/// Partial product update; absent fields keep their value
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub brand_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub ctn_size: Option<i32>,
    pub status: Option<ProductStatus>,
    #[validate(length(min = 1, max = 50))]
    pub sku: Option<String>,
    pub have_offer: Option<bool>,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool, numbering_attempts: u32) -> Self {
        Self {
            db,
            numbering_attempts,
        }
    }

    /// Create a product, assigning the next SKU when none is given
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        let mut tx = self.db.begin().await?;

        ensure_exists(&mut tx, "brands", input.brand_id, "Brand").await?;

        let sku = match input.sku {
            Some(sku) => sku,
            None => {
                numbering::reserve(&mut tx, DocumentSeries::Sku, self.numbering_attempts).await?
            }
        };

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (name, brand_id, ctn_size, status, sku, have_offer)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(input.brand_id)
        .bind(input.ctn_size)
        .bind(input.status.as_str())
        .bind(&sku)
        .bind(input.have_offer)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "sku"))?;

        tx.commit().await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// List all products ordered by name
    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// Get a product by ID
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Update a product's catalog fields
    #[tracing::instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "products", product_id, "Product").await?;
        if let Some(brand_id) = input.brand_id {
            ensure_exists(&mut tx, "brands", brand_id, "Brand").await?;
        }

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                brand_id = COALESCE($3, brand_id),
                ctn_size = COALESCE($4, ctn_size),
                status = COALESCE($5, status),
                sku = COALESCE($6, sku),
                have_offer = COALESCE($7, have_offer),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id)
        .bind(&input.name)
        .bind(input.brand_id)
        .bind(input.ctn_size)
        .bind(input.status.map(|s| s.as_str()))
        .bind(&input.sku)
        .bind(input.have_offer)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "sku"))?;

        tx.commit().await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "Product updated");
        Ok(product)
    }

    /// Delete a product that nothing references
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "products", product_id, "Product").await?;

        ensure_unreferenced(&mut tx, "product", product_id, &PRODUCT_REFERENCES).await?;

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(product_id = %product_id, "Product deleted");
        Ok(())
    }
}
