//! Product price service with latest-price versioning

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use shared::models::{PriceFor, PriceSnapshot};
use shared::validation::validate_money_field;
use shared::versioning::{demotions, PriceKey, PriceVersion};

use crate::error::{AppError, AppResult};
use crate::services::protect::lock_row;

/// Price service for versioned product prices
#[derive(Clone)]
pub struct PriceService {
    db: PgPool,
}

/// Product price record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductPrice {
    pub id: Uuid,
    pub product_id: Uuid,
    pub price_for: String,
    pub ctn_size: Option<i32>,
    pub ctn_price: Option<Decimal>,
    pub piece_price: Option<Decimal>,
    pub offer_price: Option<Decimal>,
    pub is_latest: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PRICE_COLUMNS: &str = "id, product_id, price_for, ctn_size, ctn_price, piece_price, \
                             offer_price, is_latest, created_at, updated_at";

/// Input for creating a price
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePriceInput {
    #[serde(default)]
    pub price_for: PriceFor,
    #[validate(range(min = 0))]
    pub ctn_size: Option<i32>,
    #[validate(custom = "validate_money_field")]
    pub ctn_price: Option<Decimal>,
    #[validate(custom = "validate_money_field")]
    pub piece_price: Option<Decimal>,
    #[validate(custom = "validate_money_field")]
    pub offer_price: Option<Decimal>,
    pub is_latest: Option<bool>,
}

/// Input for updating a price
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePriceInput {
    pub price_for: Option<PriceFor>,
    #[validate(range(min = 0))]
    pub ctn_size: Option<i32>,
    #[validate(custom = "validate_money_field")]
    pub ctn_price: Option<Decimal>,
    #[validate(custom = "validate_money_field")]
    pub piece_price: Option<Decimal>,
    #[validate(custom = "validate_money_field")]
    pub offer_price: Option<Decimal>,
    pub is_latest: Option<bool>,
}

/// Query for the latest price lookup
#[derive(Debug, Deserialize)]
pub struct LatestPriceQuery {
    #[serde(default)]
    pub price_for: PriceFor,
}

fn parse_price_for(value: &str) -> AppResult<PriceFor> {
    value.parse().map_err(AppError::Internal)
}

impl PriceService {
    /// Create a new PriceService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a price; a latest price demotes the previous latest of the same kind
    #[tracing::instrument(skip(self, input))]
    pub async fn create_price(
        &self,
        product_id: Uuid,
        input: CreatePriceInput,
    ) -> AppResult<ProductPrice> {
        let mut tx = self.db.begin().await?;
        lock_product(&mut tx, product_id).await?;

        let id = Uuid::new_v4();
        let is_latest = input.is_latest.unwrap_or(true);
        let key = PriceKey {
            product_id,
            price_for: input.price_for,
        };
        demote_latest(&mut tx, key, id, is_latest).await?;

        let price = sqlx::query_as::<_, ProductPrice>(&format!(
            r#"
            INSERT INTO product_prices (
                id, product_id, price_for, ctn_size, ctn_price, piece_price, offer_price, is_latest
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(product_id)
        .bind(input.price_for.as_str())
        .bind(input.ctn_size)
        .bind(input.ctn_price)
        .bind(input.piece_price)
        .bind(input.offer_price)
        .bind(is_latest)
        .fetch_one(&mut *tx)
        .await
        .map_err(latest_conflict)?;

        tx.commit().await?;

        tracing::info!(
            price_id = %price.id,
            price_for = %price.price_for,
            is_latest = price.is_latest,
            "Product price created"
        );

        Ok(price)
    }

    /// Update a price, keeping a single latest row per product and kind
    #[tracing::instrument(skip(self, input))]
    pub async fn update_price(&self, price_id: Uuid, input: UpdatePriceInput) -> AppResult<ProductPrice> {
        let mut tx = self.db.begin().await?;

        let product_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT product_id FROM product_prices WHERE id = $1",
        )
        .bind(price_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product price".to_string()))?;

        lock_product(&mut tx, product_id).await?;

        let current = sqlx::query_as::<_, ProductPrice>(&format!(
            "SELECT {PRICE_COLUMNS} FROM product_prices WHERE id = $1 FOR UPDATE"
        ))
        .bind(price_id)
        .fetch_one(&mut *tx)
        .await?;

        let price_for = match input.price_for {
            Some(price_for) => price_for,
            None => parse_price_for(&current.price_for)?,
        };
        let is_latest = input.is_latest.unwrap_or(current.is_latest);
        let key = PriceKey {
            product_id,
            price_for,
        };
        demote_latest(&mut tx, key, price_id, is_latest).await?;

        let price = sqlx::query_as::<_, ProductPrice>(&format!(
            r#"
            UPDATE product_prices
            SET price_for = $2,
                ctn_size = COALESCE($3, ctn_size),
                ctn_price = COALESCE($4, ctn_price),
                piece_price = COALESCE($5, piece_price),
                offer_price = COALESCE($6, offer_price),
                is_latest = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRICE_COLUMNS}
            "#
        ))
        .bind(price_id)
        .bind(price_for.as_str())
        .bind(input.ctn_size)
        .bind(input.ctn_price)
        .bind(input.piece_price)
        .bind(input.offer_price)
        .bind(is_latest)
        .fetch_one(&mut *tx)
        .await
        .map_err(latest_conflict)?;

        tx.commit().await?;

        Ok(price)
    }

    /// Prices of a product, newest first
    pub async fn list_prices(&self, product_id: Uuid) -> AppResult<Vec<ProductPrice>> {
        let prices = sqlx::query_as::<_, ProductPrice>(&format!(
            r#"
            SELECT {PRICE_COLUMNS}
            FROM product_prices
            WHERE product_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(prices)
    }

    /// Latest price of a product for one purpose
    pub async fn latest_price(&self, product_id: Uuid, price_for: PriceFor) -> AppResult<ProductPrice> {
        sqlx::query_as::<_, ProductPrice>(&format!(
            r#"
            SELECT {PRICE_COLUMNS}
            FROM product_prices
            WHERE product_id = $1 AND price_for = $2 AND is_latest
            "#
        ))
        .bind(product_id)
        .bind(price_for.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Latest price".to_string()))
    }

    /// Price rows are never deleted through the API
    pub async fn delete_price(&self, price_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM product_prices WHERE id = $1)",
        )
        .bind(price_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Product price".to_string()));
        }

        tracing::warn!(price_id = %price_id, "Price deletion denied");
        Err(AppError::InsufficientPermissions)
    }
}

/// Lock the product row; serializes price writes per product
async fn lock_product(tx: &mut Transaction<'_, Postgres>, product_id: Uuid) -> AppResult<()> {
    lock_row(tx, "products", product_id, "Product").await
}

async fn demote_latest(
    tx: &mut Transaction<'_, Postgres>,
    key: PriceKey,
    written: Uuid,
    becomes_latest: bool,
) -> AppResult<()> {
    if !becomes_latest {
        return Ok(());
    }

    let rows = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, price_for FROM product_prices WHERE product_id = $1 AND is_latest",
    )
    .bind(key.product_id)
    .fetch_all(&mut **tx)
    .await?;

    let mut existing = Vec::with_capacity(rows.len());
    for (id, price_for) in rows {
        existing.push(PriceVersion {
            id,
            key: PriceKey {
                product_id: key.product_id,
                price_for: parse_price_for(&price_for)?,
            },
            is_latest: true,
        });
    }

    let demoted = demotions(existing.iter(), key, written, becomes_latest);
    if demoted.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "UPDATE product_prices SET is_latest = FALSE, updated_at = NOW() WHERE id = ANY($1)",
    )
    .bind(&demoted)
    .execute(&mut **tx)
    .await?;

    tracing::debug!(demoted = demoted.len(), price_for = key.price_for.as_str(), "Demoted previous latest prices");
    Ok(())
}

fn latest_conflict(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => AppError::Conflict {
            resource: "product_price".to_string(),
            message: "Another latest price for this product was written concurrently".to_string(),
        },
        other => AppError::DatabaseError(other),
    }
}

/// Resolve the price snapshot a line item is valued at.
///
/// An explicit price must belong to the product; without one the product's
/// latest PRODUCT price is used, if it has any.
pub async fn resolve_snapshot(
    conn: &mut PgConnection,
    product_id: Uuid,
    price_id: Option<Uuid>,
) -> AppResult<Option<PriceSnapshot>> {
    let product_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;
    if !product_exists {
        return Err(AppError::NotFound("Product".to_string()));
    }

    match price_id {
        Some(price_id) => {
            let row = sqlx::query_as::<_, (Uuid, Uuid, Option<Decimal>, Option<Decimal>)>(
                "SELECT id, product_id, ctn_price, piece_price FROM product_prices WHERE id = $1",
            )
            .bind(price_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Product price".to_string()))?;

            if row.1 != product_id {
                return Err(AppError::validation(
                    "price_id",
                    "Price does not belong to the selected product",
                ));
            }
            Ok(Some(PriceSnapshot {
                id: row.0,
                ctn_price: row.2,
                piece_price: row.3,
            }))
        }
        None => {
            let row = sqlx::query_as::<_, (Uuid, Option<Decimal>, Option<Decimal>)>(
                r#"
                SELECT id, ctn_price, piece_price
                FROM product_prices
                WHERE product_id = $1 AND price_for = 'PRODUCT' AND is_latest
                "#,
            )
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

            Ok(row.map(|(id, ctn_price, piece_price)| PriceSnapshot {
                id,
                ctn_price,
                piece_price,
            }))
        }
    }
}
