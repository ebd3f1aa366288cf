//! Order delivery service
//!
//! Creating an order writes the header, every line item and the ledger
//! postings those items imply in a single database transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use shared::ledger::{damage_item_postings, free_offer_postings, order_item_postings, Posting};
use shared::models::{DamageLine, FreeOfferLine, OrderLine, Shift};
use shared::pricing::{damage_item_amount, free_offer_amount, order_item_amount};
use shared::types::{CtnPcs, DateRange};
use shared::validation::{
    validate_money_field, validate_order_lines, validate_percentage_field, validate_quantity_field,
};

use crate::error::{AppError, AppResult};
use crate::services::numbering::{self, DocumentSeries};
use crate::services::price::resolve_snapshot;
use crate::services::protect::{ensure_exists, lock_row};
use crate::services::stock::{insert_postings, StockTypeRegistry};

/// Order service for deliveries and their stock postings
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    stock_types: Arc<StockTypeRegistry>,
    numbering_attempts: u32,
}

/// Order header record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub order_date: NaiveDate,
    pub order_by: Option<Uuid>,
    pub narration: Option<String>,
    pub cash_sell_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ORDER_COLUMNS: &str =
    "id, order_number, order_date, order_by, narration, cash_sell_amount, created_at, updated_at";

/// Order header with derived line totals
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub total_order_items: Decimal,
    pub total_damage_items: Decimal,
    pub total_free_offer_items: Decimal,
}

/// Order item record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub price_id: Option<Uuid>,
    pub shift: String,
    pub quantity_ctn: i32,
    pub quantity_pcs: i32,
    pub advanced_ctn: i32,
    pub advanced_pcs: i32,
    pub return_ctn: i32,
    pub return_pcs: i32,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Damage order item record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DamageOrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub price_id: Option<Uuid>,
    pub quantity_ctn: i32,
    pub quantity_pcs: i32,
    pub damage_reason: Option<String>,
    pub inventory_damage_deduction_percent: Option<Decimal>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Free offer item record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FreeOfferItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub price_id: Option<Uuid>,
    pub quantity_ctn: i32,
    pub quantity_pcs: i32,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Order with all of its line items
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub summary: OrderSummary,
    pub items: Vec<OrderItem>,
    pub damage_items: Vec<DamageOrderItem>,
    pub free_offer_items: Vec<FreeOfferItem>,
}

/// Sold line of a new order
#[derive(Debug, Deserialize, Validate)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub price_id: Option<Uuid>,
    pub shift: Shift,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub quantity_ctn: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub quantity_pcs: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub advanced_ctn: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub advanced_pcs: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub return_ctn: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub return_pcs: i32,
}

/// Damaged line of a new order
#[derive(Debug, Deserialize, Validate)]
pub struct DamageItemInput {
    pub product_id: Uuid,
    pub price_id: Option<Uuid>,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub quantity_ctn: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub quantity_pcs: i32,
    #[validate(length(max = 1000))]
    pub damage_reason: Option<String>,
    #[validate(custom = "validate_percentage_field")]
    pub inventory_damage_deduction_percent: Option<Decimal>,
}

/// Free offer line of a new order
#[derive(Debug, Deserialize, Validate)]
pub struct FreeOfferItemInput {
    pub product_id: Uuid,
    pub price_id: Option<Uuid>,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub quantity_ctn: i32,
    #[serde(default)]
    #[validate(custom = "validate_quantity_field")]
    pub quantity_pcs: i32,
}

/// Input for creating an order
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub order_date: Option<NaiveDate>,
    pub order_by: Option<Uuid>,
    pub narration: Option<String>,
    #[validate(custom = "validate_money_field")]
    pub cash_sell_amount: Option<Decimal>,
    #[serde(default)]
    #[validate]
    pub items: Vec<OrderItemInput>,
    #[serde(default)]
    #[validate]
    pub damage_items: Vec<DamageItemInput>,
    #[serde(default)]
    #[validate]
    pub free_offer_items: Vec<FreeOfferItemInput>,
}

/// Input for updating an order header
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderInput {
    pub order_date: Option<NaiveDate>,
    pub order_by: Option<Uuid>,
    pub narration: Option<String>,
    #[validate(custom = "validate_money_field")]
    pub cash_sell_amount: Option<Decimal>,
}

/// Query filters for listing orders
#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl OrderFilter {
    /// Date window of the filter; a missing end is open
    pub fn range(&self) -> AppResult<Option<DateRange>> {
        let Some(start) = self.start_date else {
            return Ok(None);
        };
        let end = self.end_date.unwrap_or(NaiveDate::MAX);
        if end < start {
            return Err(AppError::validation(
                "end_date",
                "end_date must not be before start_date",
            ));
        }
        Ok(Some(DateRange { start, end }))
    }
}

const SUMMARY_SELECT: &str = r#"
    SELECT o.id, o.order_number, o.order_date, o.order_by, o.narration, o.cash_sell_amount,
           o.created_at, o.updated_at,
           COALESCE((SELECT SUM(total_amount) FROM order_items WHERE order_id = o.id), 0)
               AS total_order_items,
           COALESCE((SELECT SUM(total_amount) FROM damage_order_items WHERE order_id = o.id), 0)
               AS total_damage_items,
           COALESCE((SELECT SUM(total_amount) FROM free_offer_items WHERE order_id = o.id), 0)
               AS total_free_offer_items
    FROM orders o
"#;

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool, stock_types: Arc<StockTypeRegistry>, numbering_attempts: u32) -> Self {
        Self {
            db,
            stock_types,
            numbering_attempts,
        }
    }

    /// Create an order with its line items and ledger postings, all or nothing
    #[tracing::instrument(skip(self, input))]
    pub async fn create_order(&self, input: CreateOrderInput) -> AppResult<OrderDetail> {
        validate_order_lines(
            input.items.len(),
            input.damage_items.len(),
            input.free_offer_items.len(),
        )
        .map_err(|msg| AppError::ValidationError(msg.to_string()))?;

        let mut tx = self.db.begin().await?;

        if let Some(staff_id) = input.order_by {
            ensure_exists(&mut tx, "staff", staff_id, "Staff member").await?;
        }

        let order_number =
            numbering::reserve(&mut tx, DocumentSeries::Order, self.numbering_attempts).await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (order_number, order_date, order_by, narration, cash_sell_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(&order_number)
        .bind(input.order_date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(input.order_by)
        .bind(&input.narration)
        .bind(input.cash_sell_amount.unwrap_or(Decimal::ZERO))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "order_number"))?;

        let mut postings: Vec<Posting> = Vec::new();
        let mut items = Vec::with_capacity(input.items.len());
        let mut damage_items = Vec::with_capacity(input.damage_items.len());
        let mut free_offer_items = Vec::with_capacity(input.free_offer_items.len());

        for item in &input.items {
            let price = resolve_snapshot(&mut tx, item.product_id, item.price_id).await?;
            let line = OrderLine {
                id: Uuid::new_v4(),
                product_id: item.product_id,
                shift: item.shift,
                quantity: CtnPcs::new(item.quantity_ctn, item.quantity_pcs),
                advanced: CtnPcs::new(item.advanced_ctn, item.advanced_pcs),
                returned: CtnPcs::new(item.return_ctn, item.return_pcs),
            };

            let row = sqlx::query_as::<_, OrderItem>(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, price_id, shift,
                    quantity_ctn, quantity_pcs, advanced_ctn, advanced_pcs,
                    return_ctn, return_pcs, total_amount
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                RETURNING id, order_id, product_id, price_id, shift,
                          quantity_ctn, quantity_pcs, advanced_ctn, advanced_pcs,
                          return_ctn, return_pcs, total_amount, created_at
                "#,
            )
            .bind(line.id)
            .bind(order.id)
            .bind(line.product_id)
            .bind(price.map(|p| p.id))
            .bind(line.shift.as_str())
            .bind(line.quantity.ctn)
            .bind(line.quantity.pcs)
            .bind(line.advanced.ctn)
            .bind(line.advanced.pcs)
            .bind(line.returned.ctn)
            .bind(line.returned.pcs)
            .bind(order_item_amount(&line, price.as_ref())?)
            .fetch_one(&mut *tx)
            .await?;

            postings.extend(order_item_postings(&order_number, &line, price.as_ref())?);
            items.push(row);
        }

        for item in &input.damage_items {
            let price = resolve_snapshot(&mut tx, item.product_id, item.price_id).await?;
            let line = DamageLine {
                id: Uuid::new_v4(),
                product_id: item.product_id,
                quantity: CtnPcs::new(item.quantity_ctn, item.quantity_pcs),
                damage_reason: item.damage_reason.clone(),
                deduction_percent: item.inventory_damage_deduction_percent,
            };

            let row = sqlx::query_as::<_, DamageOrderItem>(
                r#"
                INSERT INTO damage_order_items (
                    id, order_id, product_id, price_id, quantity_ctn, quantity_pcs,
                    damage_reason, inventory_damage_deduction_percent, total_amount
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING id, order_id, product_id, price_id, quantity_ctn, quantity_pcs,
                          damage_reason, inventory_damage_deduction_percent, total_amount,
                          created_at
                "#,
            )
            .bind(line.id)
            .bind(order.id)
            .bind(line.product_id)
            .bind(price.map(|p| p.id))
            .bind(line.quantity.ctn)
            .bind(line.quantity.pcs)
            .bind(&line.damage_reason)
            .bind(line.deduction_percent)
            .bind(damage_item_amount(&line, price.as_ref())?)
            .fetch_one(&mut *tx)
            .await?;

            postings.extend(damage_item_postings(&order_number, &line, price.as_ref())?);
            damage_items.push(row);
        }

        for item in &input.free_offer_items {
            let price = resolve_snapshot(&mut tx, item.product_id, item.price_id).await?;
            let line = FreeOfferLine {
                id: Uuid::new_v4(),
                product_id: item.product_id,
                quantity: CtnPcs::new(item.quantity_ctn, item.quantity_pcs),
            };

            let row = sqlx::query_as::<_, FreeOfferItem>(
                r#"
                INSERT INTO free_offer_items (
                    id, order_id, product_id, price_id, quantity_ctn, quantity_pcs, total_amount
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id, order_id, product_id, price_id, quantity_ctn, quantity_pcs,
                          total_amount, created_at
                "#,
            )
            .bind(line.id)
            .bind(order.id)
            .bind(line.product_id)
            .bind(price.map(|p| p.id))
            .bind(line.quantity.ctn)
            .bind(line.quantity.pcs)
            .bind(free_offer_amount(&line, price.as_ref())?)
            .fetch_one(&mut *tx)
            .await?;

            postings.extend(free_offer_postings(&order_number, &line, price.as_ref())?);
            free_offer_items.push(row);
        }

        let posted = insert_postings(&mut tx, &self.stock_types, &postings).await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            items = items.len(),
            damage_items = damage_items.len(),
            free_offer_items = free_offer_items.len(),
            postings = posted.len(),
            "Order created"
        );

        let summary = OrderSummary {
            total_order_items: items.iter().map(|i| i.total_amount).sum(),
            total_damage_items: damage_items.iter().map(|i| i.total_amount).sum(),
            total_free_offer_items: free_offer_items.iter().map(|i| i.total_amount).sum(),
            order,
        };

        Ok(OrderDetail {
            summary,
            items,
            damage_items,
            free_offer_items,
        })
    }

    /// List orders, newest first
    pub async fn list_orders(&self, filter: OrderFilter) -> AppResult<Vec<OrderSummary>> {
        let range = filter.range()?;

        let orders = sqlx::query_as::<_, OrderSummary>(&format!(
            r#"
            {SUMMARY_SELECT}
            WHERE ($1::date IS NULL OR o.order_date BETWEEN $1 AND $2)
            ORDER BY o.order_date DESC, o.created_at DESC
            "#
        ))
        .bind(range.as_ref().map(|r| r.start))
        .bind(range.as_ref().map(|r| r.end))
        .fetch_all(&self.db)
        .await?;

        Ok(orders)
    }

    /// Get an order with all of its line items
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderDetail> {
        let summary = sqlx::query_as::<_, OrderSummary>(&format!("{SUMMARY_SELECT} WHERE o.id = $1"))
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, price_id, shift,
                   quantity_ctn, quantity_pcs, advanced_ctn, advanced_pcs,
                   return_ctn, return_pcs, total_amount, created_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        let damage_items = sqlx::query_as::<_, DamageOrderItem>(
            r#"
            SELECT id, order_id, product_id, price_id, quantity_ctn, quantity_pcs,
                   damage_reason, inventory_damage_deduction_percent, total_amount, created_at
            FROM damage_order_items
            WHERE order_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        let free_offer_items = sqlx::query_as::<_, FreeOfferItem>(
            r#"
            SELECT id, order_id, product_id, price_id, quantity_ctn, quantity_pcs,
                   total_amount, created_at
            FROM free_offer_items
            WHERE order_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(OrderDetail {
            summary,
            items,
            damage_items,
            free_offer_items,
        })
    }

    /// Update header fields; line items and their postings are immutable
    #[tracing::instrument(skip(self, input))]
    pub async fn update_order(&self, order_id: Uuid, input: UpdateOrderInput) -> AppResult<OrderDetail> {
        if let Some(staff_id) = input.order_by {
            let mut conn = self.db.acquire().await?;
            ensure_exists(&mut conn, "staff", staff_id, "Staff member").await?;
        }

        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE orders
            SET order_date = COALESCE($2, order_date),
                order_by = COALESCE($3, order_by),
                narration = COALESCE($4, narration),
                cash_sell_amount = COALESCE($5, cash_sell_amount),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(order_id)
        .bind(input.order_date)
        .bind(input.order_by)
        .bind(&input.narration)
        .bind(input.cash_sell_amount)
        .fetch_optional(&self.db)
        .await?;

        if updated.is_none() {
            return Err(AppError::NotFound("Order".to_string()));
        }

        self.get_order(order_id).await
    }

    /// Delete an order whose items never reached the ledger
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "orders", order_id, "Order").await?;

        let postings = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM stock_transactions st
            WHERE st.order_item_id IN (SELECT id FROM order_items WHERE order_id = $1)
               OR st.damage_order_item_id IN (SELECT id FROM damage_order_items WHERE order_id = $1)
               OR st.free_offer_item_id IN (SELECT id FROM free_offer_items WHERE order_id = $1)
            "#,
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        if postings > 0 {
            return Err(AppError::Protected {
                resource: "order".to_string(),
                count: postings,
                referenced_by: "stock transactions".to_string(),
            });
        }

        for table in ["order_items", "damage_order_items", "free_offer_items"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE order_id = $1"))
                .bind(order_id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, "Order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_filter_without_start_is_unbounded() {
        let filter = OrderFilter {
            start_date: None,
            end_date: Some(date(2025, 1, 31)),
        };
        assert!(filter.range().unwrap().is_none());
    }

    #[test]
    fn test_filter_open_end() {
        let filter = OrderFilter {
            start_date: Some(date(2025, 1, 1)),
            end_date: None,
        };
        let range = filter.range().unwrap().unwrap();
        assert!(range.contains(date(2030, 6, 1)));
        assert!(!range.contains(date(2024, 12, 31)));
    }

    #[test]
    fn test_filter_rejects_inverted_range() {
        let filter = OrderFilter {
            start_date: Some(date(2025, 2, 1)),
            end_date: Some(date(2025, 1, 1)),
        };
        assert!(matches!(filter.range(), Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_create_input_rejects_negative_quantities() {
        let input: CreateOrderInput = serde_json::from_value(serde_json::json!({
            "items": [{
                "product_id": Uuid::nil(),
                "shift": "MORNING",
                "quantity_ctn": -1
            }]
        }))
        .unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_create_input_rejects_quantity_over_bound() {
        let input: CreateOrderInput = serde_json::from_value(serde_json::json!({
            "items": [{
                "product_id": Uuid::nil(),
                "shift": "MORNING",
                "quantity_ctn": i32::MAX,
                "advanced_ctn": 1
            }]
        }))
        .unwrap();
        let err = input.validate().unwrap_err();
        assert!(err.to_string().contains("quantity_ctn"));
    }

    #[test]
    fn test_create_input_rejects_huge_cash_sell() {
        let input: CreateOrderInput = serde_json::from_value(serde_json::json!({
            "cash_sell_amount": "79228162514264337593543950335",
            "free_offer_items": [{ "product_id": Uuid::nil(), "quantity_pcs": 1 }]
        }))
        .unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_create_input_accepts_bounded_quantities() {
        let input: CreateOrderInput = serde_json::from_value(serde_json::json!({
            "items": [{
                "product_id": Uuid::nil(),
                "shift": "EVENING",
                "quantity_ctn": 1_000_000,
                "advanced_ctn": 1_000_000,
                "return_pcs": 3
            }]
        }))
        .unwrap();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_create_input_rejects_deduction_over_hundred() {
        let input: CreateOrderInput = serde_json::from_value(serde_json::json!({
            "damage_items": [{
                "product_id": Uuid::nil(),
                "quantity_ctn": 2,
                "inventory_damage_deduction_percent": "120"
            }]
        }))
        .unwrap();
        assert!(input.validate().is_err());
    }
}
