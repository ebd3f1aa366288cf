//! Purchase voucher service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use shared::models::PurchaseUnit;
use shared::pricing::{purchase_item_total, purchase_totals, PurchaseTotals};
use shared::validation::{validate_money_field, validate_quantity_field};

use crate::error::{AppError, AppResult};
use crate::services::numbering::{self, DocumentSeries};
use crate::services::protect::{ensure_exists, lock_row};

/// Purchase service for supplier vouchers
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
    numbering_attempts: u32,
}

/// Purchase record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub voucher_number: String,
    pub supplier_id: Uuid,
    pub purchase_date: NaiveDate,
    pub note: Option<String>,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub due_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PURCHASE_COLUMNS: &str = "id, voucher_number, supplier_id, purchase_date, note, \
                                total_amount, paid_amount, due_amount, status, created_at, updated_at";

/// Purchase item record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit: String,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

const ITEM_COLUMNS: &str =
    "id, purchase_id, product_id, quantity, unit, unit_price, total_price, created_at";

/// Purchase with its items
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseDetail {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PurchaseItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1), custom = "validate_quantity_field")]
    pub quantity: i32,
    pub unit: Option<PurchaseUnit>,
    #[validate(custom = "validate_money_field")]
    pub unit_price: Decimal,
    /// Checked against `quantity × unit_price` when present
    #[validate(custom = "validate_money_field")]
    pub total_price: Option<Decimal>,
}

/// Input for creating a purchase
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePurchaseInput {
    pub supplier_id: Uuid,
    pub purchase_date: Option<NaiveDate>,
    /// Generated when omitted
    #[validate(length(min = 1, max = 50))]
    pub voucher_number: Option<String>,
    pub note: Option<String>,
    #[validate(custom = "validate_money_field")]
    pub paid_amount: Option<Decimal>,
    #[validate]
    pub items: Vec<PurchaseItemInput>,
}

/// Input for editing a purchase; `items`, when present, replace all lines
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePurchaseInput {
    pub supplier_id: Option<Uuid>,
    pub purchase_date: Option<NaiveDate>,
    pub note: Option<String>,
    #[validate(custom = "validate_money_field")]
    pub paid_amount: Option<Decimal>,
    #[validate(custom = "validate_replacement_items")]
    pub items: Option<Vec<PurchaseItemInput>>,
}

#[allow(clippy::ptr_arg)]
fn validate_replacement_items(items: &Vec<PurchaseItemInput>) -> Result<(), ValidationError> {
    for item in items {
        if let Err(errors) = item.validate() {
            let mut err = ValidationError::new("items");
            err.message = Some(errors.to_string().into());
            return Err(err);
        }
    }
    Ok(())
}

/// Per-item totals, each checked against a supplied total
fn item_totals(items: &[PurchaseItemInput]) -> AppResult<Vec<Decimal>> {
    if items.is_empty() {
        return Err(AppError::validation("items", "A purchase needs at least one item"));
    }
    let mut totals = Vec::with_capacity(items.len());
    for item in items {
        totals.push(purchase_item_total(item.quantity, item.unit_price, item.total_price)?);
    }
    Ok(totals)
}

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool, numbering_attempts: u32) -> Self {
        Self {
            db,
            numbering_attempts,
        }
    }

    async fn insert_items(
        conn: &mut PgConnection,
        purchase_id: Uuid,
        items: &[PurchaseItemInput],
        totals: Vec<Decimal>,
    ) -> AppResult<Vec<PurchaseItem>> {
        let mut rows = Vec::with_capacity(items.len());
        for (item, total_price) in items.iter().zip(totals) {
            let row = sqlx::query_as::<_, PurchaseItem>(&format!(
                r#"
                INSERT INTO purchase_items (
                    purchase_id, product_id, quantity, unit, unit_price, total_price
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {ITEM_COLUMNS}
                "#
            ))
            .bind(purchase_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit.unwrap_or(PurchaseUnit::Ctn).as_str())
            .bind(item.unit_price)
            .bind(total_price)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::NotFound("Product".to_string())
                }
                other => AppError::DatabaseError(other),
            })?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Create a purchase with its items; money fields are derived
    #[tracing::instrument(skip(self, input), fields(supplier_id = %input.supplier_id))]
    pub async fn create_purchase(&self, input: CreatePurchaseInput) -> AppResult<PurchaseDetail> {
        let item_totals = item_totals(&input.items)?;
        let totals = purchase_totals(
            item_totals.iter().copied(),
            input.paid_amount.unwrap_or(Decimal::ZERO),
        )?;

        let mut tx = self.db.begin().await?;

        ensure_exists(&mut tx, "suppliers", input.supplier_id, "Supplier").await?;

        let voucher_number = match input.voucher_number {
            Some(number) => number,
            None => {
                numbering::reserve(&mut tx, DocumentSeries::Voucher, self.numbering_attempts)
                    .await?
            }
        };

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            r#"
            INSERT INTO purchases (
                voucher_number, supplier_id, purchase_date, note,
                total_amount, paid_amount, due_amount, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PURCHASE_COLUMNS}
            "#
        ))
        .bind(&voucher_number)
        .bind(input.supplier_id)
        .bind(input.purchase_date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(&input.note)
        .bind(totals.total_amount)
        .bind(totals.paid_amount)
        .bind(totals.due_amount)
        .bind(totals.status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "voucher_number"))?;

        let items = Self::insert_items(&mut tx, purchase.id, &input.items, item_totals).await?;

        tx.commit().await?;

        tracing::info!(
            purchase_id = %purchase.id,
            voucher_number = %purchase.voucher_number,
            status = %purchase.status,
            "Purchase created"
        );

        Ok(PurchaseDetail { purchase, items })
    }

    /// List purchases, newest first
    pub async fn list_purchases(&self) -> AppResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases ORDER BY purchase_date DESC, created_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(purchases)
    }

    /// Get a purchase with its items
    pub async fn get_purchase(&self, purchase_id: Uuid) -> AppResult<PurchaseDetail> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1"
        ))
        .bind(purchase_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        let items = sqlx::query_as::<_, PurchaseItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM purchase_items WHERE purchase_id = $1 ORDER BY created_at, id"
        ))
        .bind(purchase_id)
        .fetch_all(&self.db)
        .await?;

        Ok(PurchaseDetail { purchase, items })
    }

    /// Edit a purchase.
    ///
    /// New items replace the old ones. Total, due and status are recomputed
    /// from the items and the paid amount in every case.
    #[tracing::instrument(skip(self, input))]
    pub async fn update_purchase(
        &self,
        purchase_id: Uuid,
        input: UpdatePurchaseInput,
    ) -> AppResult<PurchaseDetail> {
        let mut tx = self.db.begin().await?;

        let paid_amount = sqlx::query_scalar::<_, Decimal>(
            "SELECT paid_amount FROM purchases WHERE id = $1 FOR UPDATE",
        )
        .bind(purchase_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;
        let paid_amount = input.paid_amount.unwrap_or(paid_amount);

        if let Some(supplier_id) = input.supplier_id {
            ensure_exists(&mut tx, "suppliers", supplier_id, "Supplier").await?;
        }

        let totals: PurchaseTotals = match &input.items {
            Some(items) => {
                let item_totals = item_totals(items)?;
                let totals = purchase_totals(item_totals.iter().copied(), paid_amount)?;

                sqlx::query("DELETE FROM purchase_items WHERE purchase_id = $1")
                    .bind(purchase_id)
                    .execute(&mut *tx)
                    .await?;
                Self::insert_items(&mut tx, purchase_id, items, item_totals).await?;
                totals
            }
            None => {
                let existing = sqlx::query_scalar::<_, Decimal>(
                    "SELECT total_price FROM purchase_items WHERE purchase_id = $1",
                )
                .bind(purchase_id)
                .fetch_all(&mut *tx)
                .await?;
                purchase_totals(existing, paid_amount)?
            }
        };

        sqlx::query(
            r#"
            UPDATE purchases
            SET supplier_id = COALESCE($2, supplier_id),
                purchase_date = COALESCE($3, purchase_date),
                note = COALESCE($4, note),
                total_amount = $5,
                paid_amount = $6,
                due_amount = $7,
                status = $8,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(purchase_id)
        .bind(input.supplier_id)
        .bind(input.purchase_date)
        .bind(&input.note)
        .bind(totals.total_amount)
        .bind(totals.paid_amount)
        .bind(totals.due_amount)
        .bind(totals.status.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            purchase_id = %purchase_id,
            total_amount = %totals.total_amount,
            status = totals.status.as_str(),
            "Purchase updated"
        );

        self.get_purchase(purchase_id).await
    }

    /// Delete a purchase and its items
    #[tracing::instrument(skip(self))]
    pub async fn delete_purchase(&self, purchase_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "purchases", purchase_id, "Purchase").await?;

        sqlx::query("DELETE FROM purchase_items WHERE purchase_id = $1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM purchases WHERE id = $1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(purchase_id = %purchase_id, "Purchase deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PurchaseStatus;

    fn item(quantity: i32, unit_price: &str) -> PurchaseItemInput {
        PurchaseItemInput {
            product_id: Uuid::nil(),
            quantity,
            unit: None,
            unit_price: unit_price.parse().unwrap(),
            total_price: None,
        }
    }

    #[test]
    fn test_item_quantity_bounds() {
        assert!(item(0, "1").validate().is_err());
        assert!(item(1_000_000, "1").validate().is_ok());
        assert!(item(1_000_001, "1").validate().is_err());
    }

    #[test]
    fn test_item_price_bounds() {
        assert!(item(1, "1000000000").validate().is_ok());
        let errors = item(1, "1000000000.01").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("unit_price"));
    }

    #[test]
    fn test_item_totals_require_items() {
        assert!(matches!(
            item_totals(&[]),
            Err(AppError::Validation { field, .. }) if field == "items"
        ));
    }

    #[test]
    fn test_replaced_items_recompute_totals() {
        let totals = item_totals(&[item(3, "9.99"), item(2, "5")]).unwrap();
        let purchase = purchase_totals(totals, Decimal::from(20)).unwrap();
        assert_eq!(purchase.total_amount, "39.97".parse::<Decimal>().unwrap());
        assert_eq!(purchase.due_amount, "19.97".parse::<Decimal>().unwrap());
        assert_eq!(purchase.status, PurchaseStatus::Due);
    }

    #[test]
    fn test_update_input_checks_replacement_items() {
        let input = UpdatePurchaseInput {
            items: Some(vec![item(1, "-1")]),
            ..Default::default()
        };
        assert!(input.validate().is_err());
        assert!(UpdatePurchaseInput::default().validate().is_ok());
    }

    #[test]
    fn test_create_input_uses_supplier_reference() {
        let input: CreatePurchaseInput = serde_json::from_value(serde_json::json!({
            "supplier_id": Uuid::nil(),
            "items": [{ "product_id": Uuid::nil(), "quantity": 2, "unit": "PICs", "unit_price": "4.50" }],
        }))
        .unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(input.items[0].unit, Some(PurchaseUnit::Pics));
    }
}
