//! Stock ledger service: stock type registry, posting persistence and balance queries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use shared::ledger::{Posting, StockBalance};
use shared::models::{StockKind, TransactionType};
use shared::types::CtnPcs;
use shared::validation::{validate_money_field, validate_posting_quantity, validate_transfer};

use crate::error::{AppError, AppResult};

/// Resolved `stock_types` row ids, one per stock kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockTypeRegistry {
    ids: [Uuid; 5],
}

fn slot(kind: StockKind) -> usize {
    match kind {
        StockKind::Main => 0,
        StockKind::Regular => 1,
        StockKind::Free => 2,
        StockKind::Damage => 3,
        StockKind::Advance => 4,
    }
}

impl StockTypeRegistry {
    /// Seed the canonical stock types and resolve their ids
    pub async fn seed(db: &PgPool) -> AppResult<Self> {
        let mut tx = db.begin().await?;

        for kind in StockKind::ALL {
            sqlx::query(
                "INSERT INTO stock_types (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
            )
            .bind(kind.name())
            .execute(&mut *tx)
            .await?;
        }

        let names: Vec<&str> = StockKind::ALL.iter().map(|k| k.name()).collect();
        let rows = sqlx::query_as::<_, (String, Uuid)>(
            "SELECT name, id FROM stock_types WHERE name = ANY($1)",
        )
        .bind(&names)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let registry = Self::from_rows(rows).map_err(AppError::Internal)?;
        tracing::info!("Stock types resolved: {}", StockKind::ALL.len());
        Ok(registry)
    }

    /// Build a registry from `(name, id)` rows; every stock kind must be present
    pub fn from_rows(rows: impl IntoIterator<Item = (String, Uuid)>) -> Result<Self, String> {
        let mut ids: [Option<Uuid>; 5] = [None; 5];
        for (name, id) in rows {
            if let Some(kind) = StockKind::from_name(&name) {
                ids[slot(kind)] = Some(id);
            }
        }

        let mut resolved = [Uuid::nil(); 5];
        for kind in StockKind::ALL {
            resolved[slot(kind)] =
                ids[slot(kind)].ok_or_else(|| format!("stock type '{}' is missing", kind.name()))?;
        }
        Ok(Self { ids: resolved })
    }

    pub fn id_of(&self, kind: StockKind) -> Uuid {
        self.ids[slot(kind)]
    }

    pub fn kind_of(&self, stock_type_id: Uuid) -> Option<StockKind> {
        StockKind::ALL
            .into_iter()
            .find(|kind| self.id_of(*kind) == stock_type_id)
    }
}

/// Persist computed postings inside the caller's transaction.
///
/// Returns the ids of the inserted ledger rows, in posting order.
pub async fn insert_postings(
    tx: &mut Transaction<'_, Postgres>,
    registry: &StockTypeRegistry,
    postings: &[Posting],
) -> AppResult<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(postings.len());

    for posting in postings {
        if posting.is_unpriced() {
            tracing::warn!(
                product_id = %posting.product_id,
                stock_type = %posting.stock_kind,
                "No price snapshot for posting, valued at zero"
            );
        }

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO stock_transactions (
                stock_type_id, product_id, product_price_id, transaction_type,
                ctn_quantity, piece_quantity, ctn_price, piece_price, note,
                order_item_id, damage_order_item_id, free_offer_item_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(registry.id_of(posting.stock_kind))
        .bind(posting.product_id)
        .bind(posting.product_price_id)
        .bind(posting.transaction_type.as_str())
        .bind(posting.quantity.ctn)
        .bind(posting.quantity.pcs)
        .bind(posting.prices.ctn_price)
        .bind(posting.prices.piece_price)
        .bind(&posting.note)
        .bind(posting.source.order_item_id())
        .bind(posting.source.damage_order_item_id())
        .bind(posting.source.free_offer_item_id())
        .fetch_one(&mut **tx)
        .await?;

        tracing::debug!(
            stock_transaction_id = %id,
            stock_type = %posting.stock_kind,
            transaction_type = posting.transaction_type.as_str(),
            ctn = posting.quantity.ctn,
            pcs = posting.quantity.pcs,
            "Posted stock transaction"
        );
        ids.push(id);
    }

    Ok(ids)
}

/// Ledger service for manual entries and balance queries
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
    stock_types: Arc<StockTypeRegistry>,
}

/// Stock transaction record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockTransaction {
    pub id: Uuid,
    pub stock_type_id: Uuid,
    pub product_id: Uuid,
    pub product_price_id: Option<Uuid>,
    pub transaction_type: String,
    pub ctn_quantity: i32,
    pub piece_quantity: i32,
    pub ctn_price: Decimal,
    pub piece_price: Decimal,
    pub total_price: Decimal,
    pub note: Option<String>,
    pub batch_number: Option<String>,
    pub have_transfer: bool,
    pub transfer_from: Option<Uuid>,
    pub transfer_to: Option<Uuid>,
    pub order_item_id: Option<Uuid>,
    pub damage_order_item_id: Option<Uuid>,
    pub free_offer_item_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

const TRANSACTION_COLUMNS: &str = r#"
    id, stock_type_id, product_id, product_price_id, transaction_type,
    ctn_quantity, piece_quantity, ctn_price, piece_price,
    ctn_price * ctn_quantity + piece_price * piece_quantity AS total_price,
    note, batch_number, have_transfer, transfer_from, transfer_to,
    order_item_id, damage_order_item_id, free_offer_item_id, created_at
"#;

/// Input for a manual stock transaction
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStockTransactionInput {
    pub stock_type_id: Uuid,
    pub product_id: Uuid,
    pub product_price_id: Option<Uuid>,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub ctn_quantity: i32,
    #[serde(default)]
    pub piece_quantity: i32,
    #[validate(custom = "validate_money_field")]
    pub ctn_price: Option<Decimal>,
    #[validate(custom = "validate_money_field")]
    pub piece_price: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
    #[validate(length(max = 100))]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub have_transfer: bool,
    pub transfer_from: Option<Uuid>,
    pub transfer_to: Option<Uuid>,
}

/// Query filters for listing stock transactions
#[derive(Debug, Default, Deserialize)]
pub struct StockTransactionFilter {
    pub product_id: Option<Uuid>,
    pub stock_type_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
}

/// Stock type with its overall balance
#[derive(Debug, Clone, Serialize)]
pub struct StockTypeSummary {
    pub id: Uuid,
    pub name: String,
    /// None for stock types created outside the canonical set
    pub kind: Option<StockKind>,
    pub description: Option<String>,
    pub ctn_quantity: i64,
    pub piece_quantity: i64,
}

/// Balance of one product in one stock type
#[derive(Debug, Clone, Serialize)]
pub struct ProductStockLevel {
    pub product_id: Uuid,
    pub stock_type_id: Uuid,
    pub stock_type: String,
    pub kind: Option<StockKind>,
    pub ctn_quantity: i64,
    pub piece_quantity: i64,
    pub totals: StockBalance,
}

#[derive(Debug, FromRow)]
struct StockTypeBalanceRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    in_ctn: Option<i64>,
    in_pcs: Option<i64>,
    out_ctn: Option<i64>,
    out_pcs: Option<i64>,
}

impl StockTypeBalanceRow {
    fn balance(&self) -> StockBalance {
        StockBalance::from_sums(self.in_ctn, self.in_pcs, self.out_ctn, self.out_pcs)
    }
}

const BALANCE_SUMS: &str = r#"
    SUM(st.ctn_quantity) FILTER (WHERE st.transaction_type = 'IN')::BIGINT AS in_ctn,
    SUM(st.piece_quantity) FILTER (WHERE st.transaction_type = 'IN')::BIGINT AS in_pcs,
    SUM(st.ctn_quantity) FILTER (WHERE st.transaction_type = 'OUT')::BIGINT AS out_ctn,
    SUM(st.piece_quantity) FILTER (WHERE st.transaction_type = 'OUT')::BIGINT AS out_pcs
"#;

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool, stock_types: Arc<StockTypeRegistry>) -> Self {
        Self { db, stock_types }
    }

    /// Record a manual stock transaction with no line-item provenance
    #[tracing::instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn create_manual(
        &self,
        input: CreateStockTransactionInput,
    ) -> AppResult<StockTransaction> {
        let quantity = CtnPcs::new(input.ctn_quantity, input.piece_quantity);
        validate_posting_quantity(quantity)
            .map_err(|msg| AppError::validation("ctn_quantity", msg))?;

        let transfer = validate_transfer(input.have_transfer, input.transfer_from, input.transfer_to)
            .map_err(|msg| AppError::validation("transfer_from", msg))?;

        self.ensure_stock_type(input.stock_type_id).await?;
        if let Some((from, to)) = transfer {
            self.ensure_stock_type(from).await?;
            self.ensure_stock_type(to).await?;
        }

        let product_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(input.product_id)
                .fetch_one(&self.db)
                .await?;
        if !product_exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let transaction = sqlx::query_as::<_, StockTransaction>(&format!(
            r#"
            INSERT INTO stock_transactions (
                stock_type_id, product_id, product_price_id, transaction_type,
                ctn_quantity, piece_quantity, ctn_price, piece_price, note, batch_number,
                have_transfer, transfer_from, transfer_to
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(input.stock_type_id)
        .bind(input.product_id)
        .bind(input.product_price_id)
        .bind(input.transaction_type.as_str())
        .bind(quantity.ctn)
        .bind(quantity.pcs)
        .bind(input.ctn_price.unwrap_or(Decimal::ZERO))
        .bind(input.piece_price.unwrap_or(Decimal::ZERO))
        .bind(&input.note)
        .bind(&input.batch_number)
        .bind(transfer.is_some())
        .bind(transfer.map(|(from, _)| from))
        .bind(transfer.map(|(_, to)| to))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            stock_transaction_id = %transaction.id,
            stock_kind = ?self.stock_types.kind_of(transaction.stock_type_id),
            transaction_type = %transaction.transaction_type,
            "Manual stock transaction recorded"
        );

        Ok(transaction)
    }

    async fn ensure_stock_type(&self, stock_type_id: Uuid) -> AppResult<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM stock_types WHERE id = $1)")
                .bind(stock_type_id)
                .fetch_one(&self.db)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Stock type".to_string()));
        }
        Ok(())
    }

    /// Get a stock transaction by ID
    pub async fn get_transaction(&self, id: Uuid) -> AppResult<StockTransaction> {
        sqlx::query_as::<_, StockTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM stock_transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock transaction".to_string()))
    }

    /// List stock transactions, newest first
    pub async fn list_transactions(
        &self,
        filter: StockTransactionFilter,
    ) -> AppResult<Vec<StockTransaction>> {
        let transactions = sqlx::query_as::<_, StockTransaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM stock_transactions
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR stock_type_id = $2)
              AND ($3::text IS NULL OR transaction_type = $3)
            ORDER BY created_at DESC
            "#
        ))
        .bind(filter.product_id)
        .bind(filter.stock_type_id)
        .bind(filter.transaction_type.map(|t| t.as_str()))
        .fetch_all(&self.db)
        .await?;

        Ok(transactions)
    }

    /// All stock types with their balance over every product
    pub async fn list_stock_types(&self) -> AppResult<Vec<StockTypeSummary>> {
        let rows = sqlx::query_as::<_, StockTypeBalanceRow>(&format!(
            r#"
            SELECT s.id, s.name, s.description, {BALANCE_SUMS}
            FROM stock_types s
            LEFT JOIN stock_transactions st ON st.stock_type_id = s.id
            GROUP BY s.id, s.name, s.description
            ORDER BY s.name
            "#
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| summary_of(&self.stock_types, row))
            .collect())
    }

    /// One stock type with its balance over every product
    pub async fn get_stock_type(&self, stock_type_id: Uuid) -> AppResult<StockTypeSummary> {
        let row = sqlx::query_as::<_, StockTypeBalanceRow>(&format!(
            r#"
            SELECT s.id, s.name, s.description, {BALANCE_SUMS}
            FROM stock_types s
            LEFT JOIN stock_transactions st ON st.stock_type_id = s.id
            WHERE s.id = $1
            GROUP BY s.id, s.name, s.description
            "#
        ))
        .bind(stock_type_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock type".to_string()))?;

        Ok(summary_of(&self.stock_types, row))
    }

    /// Balance of a product in every stock type
    pub async fn product_levels(&self, product_id: Uuid) -> AppResult<Vec<ProductStockLevel>> {
        self.ensure_product(product_id).await?;

        let rows = sqlx::query_as::<_, StockTypeBalanceRow>(&format!(
            r#"
            SELECT s.id, s.name, s.description, {BALANCE_SUMS}
            FROM stock_types s
            LEFT JOIN stock_transactions st
                   ON st.stock_type_id = s.id AND st.product_id = $1
            GROUP BY s.id, s.name, s.description
            ORDER BY s.name
            "#
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| level_of(&self.stock_types, product_id, row))
            .collect())
    }

    /// Balance of a product in one stock type
    pub async fn product_level(
        &self,
        product_id: Uuid,
        stock_type_id: Uuid,
    ) -> AppResult<ProductStockLevel> {
        self.ensure_product(product_id).await?;

        let row = sqlx::query_as::<_, StockTypeBalanceRow>(&format!(
            r#"
            SELECT s.id, s.name, s.description, {BALANCE_SUMS}
            FROM stock_types s
            LEFT JOIN stock_transactions st
                   ON st.stock_type_id = s.id AND st.product_id = $1
            WHERE s.id = $2
            GROUP BY s.id, s.name, s.description
            "#
        ))
        .bind(product_id)
        .bind(stock_type_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock type".to_string()))?;

        Ok(level_of(&self.stock_types, product_id, row))
    }

    async fn ensure_product(&self, product_id: Uuid) -> AppResult<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id)
                .fetch_one(&self.db)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(())
    }
}

fn summary_of(registry: &StockTypeRegistry, row: StockTypeBalanceRow) -> StockTypeSummary {
    let balance = row.balance();
    StockTypeSummary {
        id: row.id,
        kind: registry.kind_of(row.id),
        name: row.name,
        description: row.description,
        ctn_quantity: balance.ctn(),
        piece_quantity: balance.pcs(),
    }
}

fn level_of(
    registry: &StockTypeRegistry,
    product_id: Uuid,
    row: StockTypeBalanceRow,
) -> ProductStockLevel {
    let totals = row.balance();
    ProductStockLevel {
        product_id,
        stock_type_id: row.id,
        kind: registry.kind_of(row.id),
        stock_type: row.name,
        ctn_quantity: totals.ctn(),
        piece_quantity: totals.pcs(),
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<(String, Uuid)> {
        StockKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| (kind.name().to_string(), Uuid::from_u128(i as u128 + 1)))
            .collect()
    }

    #[test]
    fn test_registry_resolves_every_kind() {
        let registry = StockTypeRegistry::from_rows(rows()).unwrap();
        for kind in StockKind::ALL {
            assert_eq!(registry.kind_of(registry.id_of(kind)), Some(kind));
        }
    }

    #[test]
    fn test_registry_ignores_unknown_rows() {
        let mut rows = rows();
        rows.push(("Seasonal Stock".to_string(), Uuid::from_u128(99)));
        let registry = StockTypeRegistry::from_rows(rows).unwrap();
        assert_eq!(registry.kind_of(Uuid::from_u128(99)), None);
    }

    #[test]
    fn test_registry_requires_all_kinds() {
        let rows: Vec<_> = rows()
            .into_iter()
            .filter(|(name, _)| name != "Damage Stock")
            .collect();
        let err = StockTypeRegistry::from_rows(rows).unwrap_err();
        assert!(err.contains("Damage Stock"));
    }

    #[test]
    fn test_level_uses_balance_difference() {
        let row = StockTypeBalanceRow {
            id: Uuid::from_u128(2),
            name: "Regular Stock".to_string(),
            description: None,
            in_ctn: Some(10),
            in_pcs: None,
            out_ctn: Some(15),
            out_pcs: Some(4),
        };
        let registry = StockTypeRegistry::from_rows(rows()).unwrap();
        let level = level_of(&registry, Uuid::from_u128(7), row);
        assert_eq!(level.kind, Some(StockKind::Regular));
        assert_eq!(level.ctn_quantity, -5);
        assert_eq!(level.piece_quantity, -4);
    }
}
