//! Sales collection service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use shared::models::{CollectionLine, CustomerTerms};
use shared::pricing::{collection_item_amounts, collection_totals, CollectionItemAmounts};
use shared::types::CtnPcs;
use shared::validation::{validate_money_field, validate_quantity_field};

use crate::error::{AppError, AppResult};
use crate::services::numbering::{self, DocumentSeries};
use crate::services::price::resolve_snapshot;
use crate::services::protect::{ensure_exists, lock_row};

/// Sales collection service
#[derive(Clone)]
pub struct SalesCollectionService {
    db: PgPool,
    numbering_attempts: u32,
    default_deduction_percentage: Decimal,
}

/// Sales collection record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SalesCollection {
    pub id: Uuid,
    pub sales_id: String,
    pub sales_date: NaiveDate,
    pub sales_by: Option<Uuid>,
    pub customer_id: Uuid,
    pub commission_in_percentage: Decimal,
    pub special_discount_in_percentage: Decimal,
    pub deduction_percentage: Decimal,
    pub collection_amount: Decimal,
    pub collection_by_personal_loan: Decimal,
    pub total_sale: Decimal,
    pub due_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COLLECTION_COLUMNS: &str = "id, sales_id, sales_date, sales_by, customer_id, \
     commission_in_percentage, special_discount_in_percentage, deduction_percentage, \
     collection_amount, collection_by_personal_loan, total_sale, due_amount, created_at, updated_at";

/// Collection item record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CollectionItem {
    pub id: Uuid,
    pub sales_collection_id: Uuid,
    pub product_id: Uuid,
    pub price_id: Option<Uuid>,
    pub order_ctn: i32,
    pub order_pcs: i32,
    pub damage_ctn: i32,
    pub damage_pcs: i32,
    pub free_ctn: i32,
    pub free_pcs: i32,
    pub order_amount: Decimal,
    pub damage_amount: Decimal,
    pub free_amount: Decimal,
    pub net_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

const ITEM_COLUMNS: &str = "id, sales_collection_id, product_id, price_id, order_ctn, order_pcs, \
     damage_ctn, damage_pcs, free_ctn, free_pcs, order_amount, damage_amount, free_amount, \
     net_amount, created_at";

/// Sales collection with its items
#[derive(Debug, Clone, Serialize)]
pub struct SalesCollectionDetail {
    #[serde(flatten)]
    pub collection: SalesCollection,
    pub items: Vec<CollectionItem>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CollectionItemInput {
    pub product_id: Uuid,
    pub price_id: Option<Uuid>,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub order_ctn: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub order_pcs: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub damage_ctn: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub damage_pcs: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub free_ctn: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub free_pcs: i32,
}

impl CollectionItemInput {
    fn line(&self) -> CollectionLine {
        CollectionLine {
            order: CtnPcs::new(self.order_ctn, self.order_pcs),
            damage: CtnPcs::new(self.damage_ctn, self.damage_pcs),
            free: CtnPcs::new(self.free_ctn, self.free_pcs),
        }
    }
}

/// Input for creating a sales collection.
///
/// The damage deduction percentage is not accepted here; it is taken from
/// the `sales.default_deduction_percentage` setting.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSalesCollectionInput {
    pub customer_id: Uuid,
    pub sales_date: Option<NaiveDate>,
    pub sales_by: Option<Uuid>,
    #[validate(custom = "validate_money_field")]
    pub collection_amount: Option<Decimal>,
    #[validate(custom = "validate_money_field")]
    pub collection_by_personal_loan: Option<Decimal>,
    #[validate]
    pub items: Vec<CollectionItemInput>,
}

/// Input for editing a sales collection; `items`, when present, replace all lines
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSalesCollectionInput {
    pub customer_id: Option<Uuid>,
    pub sales_date: Option<NaiveDate>,
    pub sales_by: Option<Uuid>,
    #[validate(custom = "validate_money_field")]
    pub collection_amount: Option<Decimal>,
    #[validate(custom = "validate_money_field")]
    pub collection_by_personal_loan: Option<Decimal>,
    #[validate(custom = "validate_replacement_items")]
    pub items: Option<Vec<CollectionItemInput>>,
}

#[allow(clippy::ptr_arg)]
fn validate_replacement_items(items: &Vec<CollectionItemInput>) -> Result<(), ValidationError> {
    for item in items {
        if let Err(errors) = item.validate() {
            let mut err = ValidationError::new("items");
            err.message = Some(errors.to_string().into());
            return Err(err);
        }
    }
    Ok(())
}

/// A collection line with its resolved price and derived amounts
type PricedItem<'a> = (&'a CollectionItemInput, Option<Uuid>, CollectionItemAmounts);

#[derive(Debug, FromRow)]
struct CustomerTermsRow {
    order_discount_percent: Decimal,
    have_special_discount: bool,
    special_discount_percent: Decimal,
}

impl From<CustomerTermsRow> for CustomerTerms {
    fn from(row: CustomerTermsRow) -> Self {
        CustomerTerms {
            order_discount_percent: row.order_discount_percent,
            have_special_discount: row.have_special_discount,
            special_discount_percent: row.special_discount_percent,
        }
    }
}

impl SalesCollectionService {
    /// Create a new SalesCollectionService instance
    pub fn new(db: PgPool, numbering_attempts: u32, default_deduction_percentage: Decimal) -> Self {
        Self {
            db,
            numbering_attempts,
            default_deduction_percentage,
        }
    }

    async fn customer_terms(
        conn: &mut PgConnection,
        customer_id: Uuid,
    ) -> AppResult<CustomerTerms> {
        let terms = sqlx::query_as::<_, CustomerTermsRow>(
            r#"
            SELECT order_discount_percent, have_special_discount, special_discount_percent
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        Ok(terms.into())
    }

    /// Resolve each line's price and derive its amounts
    async fn price_items<'a>(
        conn: &mut PgConnection,
        items: &'a [CollectionItemInput],
        deduction_percentage: Decimal,
    ) -> AppResult<Vec<PricedItem<'a>>> {
        if items.is_empty() {
            return Err(AppError::validation(
                "items",
                "A sales collection needs at least one item",
            ));
        }

        let mut priced = Vec::with_capacity(items.len());
        for item in items {
            let price = resolve_snapshot(&mut *conn, item.product_id, item.price_id).await?;
            let amounts =
                collection_item_amounts(&item.line(), price.as_ref(), deduction_percentage)?;
            priced.push((item, price.map(|p| p.id), amounts));
        }
        Ok(priced)
    }

    async fn insert_items(
        conn: &mut PgConnection,
        collection_id: Uuid,
        priced: Vec<PricedItem<'_>>,
    ) -> AppResult<Vec<CollectionItem>> {
        let mut items = Vec::with_capacity(priced.len());
        for (item, price_id, amounts) in priced {
            let row = sqlx::query_as::<_, CollectionItem>(&format!(
                r#"
                INSERT INTO collection_items (
                    sales_collection_id, product_id, price_id,
                    order_ctn, order_pcs, damage_ctn, damage_pcs, free_ctn, free_pcs,
                    order_amount, damage_amount, free_amount, net_amount
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                RETURNING {ITEM_COLUMNS}
                "#
            ))
            .bind(collection_id)
            .bind(item.product_id)
            .bind(price_id)
            .bind(item.order_ctn)
            .bind(item.order_pcs)
            .bind(item.damage_ctn)
            .bind(item.damage_pcs)
            .bind(item.free_ctn)
            .bind(item.free_pcs)
            .bind(amounts.order_amount)
            .bind(amounts.damage_amount)
            .bind(amounts.free_amount)
            .bind(amounts.net_amount)
            .fetch_one(&mut *conn)
            .await?;
            items.push(row);
        }
        Ok(items)
    }

    /// Create a sales collection; discounts come from the customer, totals are derived
    #[tracing::instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_collection(
        &self,
        input: CreateSalesCollectionInput,
    ) -> AppResult<SalesCollectionDetail> {
        let deduction_percentage = self.default_deduction_percentage;
        let collection_amount = input.collection_amount.unwrap_or(Decimal::ZERO);
        let personal_loan = input.collection_by_personal_loan.unwrap_or(Decimal::ZERO);

        let mut tx = self.db.begin().await?;

        let terms = Self::customer_terms(&mut tx, input.customer_id).await?;
        if let Some(staff_id) = input.sales_by {
            ensure_exists(&mut tx, "staff", staff_id, "Staff member").await?;
        }

        let priced = Self::price_items(&mut tx, &input.items, deduction_percentage).await?;
        let totals = collection_totals(
            priced.iter().map(|(_, _, amounts)| *amounts),
            collection_amount,
            personal_loan,
        )?;

        let sales_id =
            numbering::reserve(&mut tx, DocumentSeries::Sales, self.numbering_attempts).await?;

        let collection = sqlx::query_as::<_, SalesCollection>(&format!(
            r#"
            INSERT INTO sales_collections (
                sales_id, sales_date, sales_by, customer_id,
                commission_in_percentage, special_discount_in_percentage, deduction_percentage,
                collection_amount, collection_by_personal_loan, total_sale, due_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {COLLECTION_COLUMNS}
            "#
        ))
        .bind(&sales_id)
        .bind(input.sales_date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(input.sales_by)
        .bind(input.customer_id)
        .bind(terms.commission_percent())
        .bind(terms.special_discount())
        .bind(deduction_percentage)
        .bind(collection_amount)
        .bind(personal_loan)
        .bind(totals.total_sale)
        .bind(totals.due_amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "sales_id"))?;

        let items = Self::insert_items(&mut tx, collection.id, priced).await?;

        tx.commit().await?;

        tracing::info!(
            collection_id = %collection.id,
            sales_id = %collection.sales_id,
            total_sale = %collection.total_sale,
            due_amount = %collection.due_amount,
            "Sales collection created"
        );

        Ok(SalesCollectionDetail { collection, items })
    }

    /// Edit a sales collection.
    ///
    /// New items replace the old ones and are priced with the deduction
    /// stored on the collection. A customer change re-copies that customer's
    /// discounts. The total sale and due are always recomputed.
    #[tracing::instrument(skip(self, input))]
    pub async fn update_collection(
        &self,
        collection_id: Uuid,
        input: UpdateSalesCollectionInput,
    ) -> AppResult<SalesCollectionDetail> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, SalesCollection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM sales_collections WHERE id = $1 FOR UPDATE"
        ))
        .bind(collection_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sales collection".to_string()))?;

        let customer_id = input.customer_id.unwrap_or(current.customer_id);
        let (commission, special_discount) = if customer_id != current.customer_id {
            let terms = Self::customer_terms(&mut tx, customer_id).await?;
            (terms.commission_percent(), terms.special_discount())
        } else {
            (
                current.commission_in_percentage,
                current.special_discount_in_percentage,
            )
        };
        if let Some(staff_id) = input.sales_by {
            ensure_exists(&mut tx, "staff", staff_id, "Staff member").await?;
        }

        let net_amounts = match &input.items {
            Some(items) => {
                let priced =
                    Self::price_items(&mut tx, items, current.deduction_percentage).await?;
                let nets: Vec<CollectionItemAmounts> =
                    priced.iter().map(|(_, _, amounts)| *amounts).collect();

                sqlx::query("DELETE FROM collection_items WHERE sales_collection_id = $1")
                    .bind(collection_id)
                    .execute(&mut *tx)
                    .await?;
                Self::insert_items(&mut tx, collection_id, priced).await?;
                nets
            }
            None => sqlx::query_scalar::<_, Decimal>(
                "SELECT net_amount FROM collection_items WHERE sales_collection_id = $1",
            )
            .bind(collection_id)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|net_amount| CollectionItemAmounts {
                net_amount,
                ..Default::default()
            })
            .collect(),
        };

        let collection_amount = input.collection_amount.unwrap_or(current.collection_amount);
        let personal_loan = input
            .collection_by_personal_loan
            .unwrap_or(current.collection_by_personal_loan);
        let totals = collection_totals(net_amounts, collection_amount, personal_loan)?;

        sqlx::query(
            r#"
            UPDATE sales_collections
            SET customer_id = $2,
                sales_date = COALESCE($3, sales_date),
                sales_by = COALESCE($4, sales_by),
                commission_in_percentage = $5,
                special_discount_in_percentage = $6,
                collection_amount = $7,
                collection_by_personal_loan = $8,
                total_sale = $9,
                due_amount = $10,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(collection_id)
        .bind(customer_id)
        .bind(input.sales_date)
        .bind(input.sales_by)
        .bind(commission)
        .bind(special_discount)
        .bind(collection_amount)
        .bind(personal_loan)
        .bind(totals.total_sale)
        .bind(totals.due_amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            collection_id = %collection_id,
            total_sale = %totals.total_sale,
            due_amount = %totals.due_amount,
            "Sales collection updated"
        );

        self.get_collection(collection_id).await
    }

    /// Delete a sales collection and its items
    #[tracing::instrument(skip(self))]
    pub async fn delete_collection(&self, collection_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "sales_collections", collection_id, "Sales collection").await?;

        sqlx::query("DELETE FROM collection_items WHERE sales_collection_id = $1")
            .bind(collection_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sales_collections WHERE id = $1")
            .bind(collection_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(collection_id = %collection_id, "Sales collection deleted");
        Ok(())
    }

    /// List sales collections, newest first
    pub async fn list_collections(&self) -> AppResult<Vec<SalesCollection>> {
        let collections = sqlx::query_as::<_, SalesCollection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM sales_collections ORDER BY sales_date DESC, created_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(collections)
    }

    /// Get a sales collection with its items
    pub async fn get_collection(&self, collection_id: Uuid) -> AppResult<SalesCollectionDetail> {
        let collection = sqlx::query_as::<_, SalesCollection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM sales_collections WHERE id = $1"
        ))
        .bind(collection_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sales collection".to_string()))?;

        let items = sqlx::query_as::<_, CollectionItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM collection_items WHERE sales_collection_id = $1 ORDER BY created_at, id"
        ))
        .bind(collection_id)
        .fetch_all(&self.db)
        .await?;

        Ok(SalesCollectionDetail { collection, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_input_maps_to_line() {
        let input = CollectionItemInput {
            product_id: Uuid::nil(),
            price_id: None,
            order_ctn: 10,
            order_pcs: 2,
            damage_ctn: 1,
            damage_pcs: 0,
            free_ctn: 0,
            free_pcs: 6,
        };
        let line = input.line();
        assert_eq!(line.order, CtnPcs::new(10, 2));
        assert_eq!(line.damage, CtnPcs::new(1, 0));
        assert_eq!(line.free, CtnPcs::new(0, 6));
    }

    #[test]
    fn test_item_quantities_are_bounded() {
        let input = CollectionItemInput {
            product_id: Uuid::nil(),
            price_id: None,
            order_ctn: 1_000_001,
            order_pcs: 0,
            damage_ctn: 0,
            damage_pcs: 0,
            free_ctn: 0,
            free_pcs: -1,
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("order_ctn"));
        assert!(fields.contains_key("free_pcs"));
    }

    #[test]
    fn test_create_input_ignores_deduction_percentage() {
        let input: CreateSalesCollectionInput = serde_json::from_value(serde_json::json!({
            "customer_id": Uuid::nil(),
            "deduction_percentage": "55",
            "items": [],
        }))
        .unwrap();
        assert!(input.validate().is_ok());
        assert!(input.items.is_empty());
    }

    #[test]
    fn test_update_input_validates_replacement_items() {
        let input: UpdateSalesCollectionInput = serde_json::from_value(serde_json::json!({
            "collection_amount": "10.00",
            "items": [{ "product_id": Uuid::nil(), "order_ctn": 2147483647 }],
        }))
        .unwrap();
        assert!(input.validate().is_err());

        let input = UpdateSalesCollectionInput {
            collection_amount: Some(Decimal::from(10)),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_terms_row_conversion() {
        let terms: CustomerTerms = CustomerTermsRow {
            order_discount_percent: Decimal::from(2),
            have_special_discount: true,
            special_discount_percent: Decimal::from(4),
        }
        .into();
        assert_eq!(terms.commission_percent(), Decimal::from(2));
        assert_eq!(terms.special_discount(), Decimal::from(4));
    }
}
