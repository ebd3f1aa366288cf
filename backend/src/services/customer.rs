//! Customer credit service: customers, due sells and due collections

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::customer_balance;
use shared::validation::{validate_balance_field, validate_money_field, validate_percentage_field};

use crate::error::{AppError, AppResult};
use crate::services::protect::{ensure_exists, ensure_unreferenced, lock_row, Reference};

/// Tables that keep a customer alive
const CUSTOMER_REFERENCES: [Reference; 3] = [
    Reference::new("sales_collections", "customer_id", "sales collections"),
    Reference::new("due_sells", "customer_id", "due sells"),
    Reference::new("due_collections", "customer_id", "due collections"),
];

/// Customer service
#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

/// Customer record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub shop_name: String,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub area_id: Option<Uuid>,
    pub opening_balance: Decimal,
    pub due_limit: Decimal,
    pub order_discount_percent: Decimal,
    pub have_special_discount: bool,
    pub special_discount_percent: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CUSTOMER_COLUMNS: &str = "id, name, shop_name, contact_number, address, area_id, opening_balance, \
     due_limit, order_discount_percent, have_special_discount, special_discount_percent, \
     created_at, updated_at";

/// Customer with derived credit figures
#[derive(Debug, Clone, Serialize)]
pub struct CustomerAccount {
    #[serde(flatten)]
    pub customer: Customer,
    pub due_sell: Decimal,
    pub due_collection: Decimal,
    /// Negative when the customer owes money
    pub balance: Decimal,
}

/// Due sell record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DueSell {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub deliver_by: Option<Uuid>,
    pub sale_date: NaiveDate,
    pub amount: Decimal,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Due collection record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DueCollection {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub collected_by: Option<Uuid>,
    pub collection_date: NaiveDate,
    pub amount: Decimal,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a customer
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub shop_name: String,
    #[validate(length(max = 50))]
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub area_id: Option<Uuid>,
    #[validate(custom = "validate_balance_field")]
    pub opening_balance: Option<Decimal>,
    #[validate(custom = "validate_money_field")]
    pub due_limit: Option<Decimal>,
    #[validate(custom = "validate_percentage_field")]
    pub order_discount_percent: Option<Decimal>,
    #[serde(default)]
    pub have_special_discount: bool,
    #[validate(custom = "validate_percentage_field")]
    pub special_discount_percent: Option<Decimal>,
}

/// Partial customer update; absent fields keep their value
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub shop_name: Option<String>,
    #[validate(length(max = 50))]
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub area_id: Option<Uuid>,
    #[validate(custom = "validate_balance_field")]
    pub opening_balance: Option<Decimal>,
    #[validate(custom = "validate_money_field")]
    pub due_limit: Option<Decimal>,
    #[validate(custom = "validate_percentage_field")]
    pub order_discount_percent: Option<Decimal>,
    pub have_special_discount: Option<bool>,
    #[validate(custom = "validate_percentage_field")]
    pub special_discount_percent: Option<Decimal>,
}

/// Input for recording a due sell
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDueSellInput {
    pub customer_id: Uuid,
    pub deliver_by: Option<Uuid>,
    pub sale_date: Option<NaiveDate>,
    #[validate(custom = "validate_money_field")]
    pub amount: Decimal,
    pub note: Option<String>,
}

/// Input for recording a due collection
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDueCollectionInput {
    pub customer_id: Uuid,
    pub collected_by: Option<Uuid>,
    pub collection_date: Option<NaiveDate>,
    #[validate(custom = "validate_money_field")]
    pub amount: Decimal,
    pub note: Option<String>,
}

/// Optional customer filter for due listings
#[derive(Debug, Default, Deserialize)]
pub struct CustomerFilter {
    pub customer_id: Option<Uuid>,
}

impl CustomerService {
    /// Create a new CustomerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a customer
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_customer(&self, input: CreateCustomerInput) -> AppResult<Customer> {
        let mut conn = self.db.acquire().await?;
        if let Some(area_id) = input.area_id {
            ensure_exists(&mut conn, "areas", area_id, "Area").await?;
        }

        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (
                name, shop_name, contact_number, address, area_id, opening_balance, due_limit,
                order_discount_percent, have_special_discount, special_discount_percent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.shop_name)
        .bind(&input.contact_number)
        .bind(&input.address)
        .bind(input.area_id)
        .bind(input.opening_balance.unwrap_or(Decimal::ZERO))
        .bind(input.due_limit.unwrap_or(Decimal::ZERO))
        .bind(input.order_discount_percent.unwrap_or(Decimal::ZERO))
        .bind(input.have_special_discount)
        .bind(input.special_discount_percent.unwrap_or(Decimal::ZERO))
        .fetch_one(&mut *conn)
        .await?;

        tracing::info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    /// Update a customer's profile, area or terms
    #[tracing::instrument(skip(self, input))]
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        input: UpdateCustomerInput,
    ) -> AppResult<Customer> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "customers", customer_id, "Customer").await?;
        if let Some(area_id) = input.area_id {
            ensure_exists(&mut tx, "areas", area_id, "Area").await?;
        }

        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            UPDATE customers
            SET name = COALESCE($2, name),
                shop_name = COALESCE($3, shop_name),
                contact_number = COALESCE($4, contact_number),
                address = COALESCE($5, address),
                area_id = COALESCE($6, area_id),
                opening_balance = COALESCE($7, opening_balance),
                due_limit = COALESCE($8, due_limit),
                order_discount_percent = COALESCE($9, order_discount_percent),
                have_special_discount = COALESCE($10, have_special_discount),
                special_discount_percent = COALESCE($11, special_discount_percent),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(customer_id)
        .bind(&input.name)
        .bind(&input.shop_name)
        .bind(&input.contact_number)
        .bind(&input.address)
        .bind(input.area_id)
        .bind(input.opening_balance)
        .bind(input.due_limit)
        .bind(input.order_discount_percent)
        .bind(input.have_special_discount)
        .bind(input.special_discount_percent)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(customer_id = %customer.id, "Customer updated");
        Ok(customer)
    }

    /// Delete a customer with no collections or dues on record
    #[tracing::instrument(skip(self))]
    pub async fn delete_customer(&self, customer_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "customers", customer_id, "Customer").await?;
        ensure_unreferenced(&mut tx, "customer", customer_id, &CUSTOMER_REFERENCES).await?;

        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(customer_id = %customer_id, "Customer deleted");
        Ok(())
    }

    /// List customers ordered by name
    pub async fn list_customers(&self) -> AppResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(customers)
    }

    /// Get a customer with their running balance
    pub async fn get_customer(&self, customer_id: Uuid) -> AppResult<CustomerAccount> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        let (due_sell, due_collection) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT
                COALESCE((SELECT SUM(amount) FROM due_sells WHERE customer_id = $1), 0),
                COALESCE((SELECT SUM(amount) FROM due_collections WHERE customer_id = $1), 0)
            "#,
        )
        .bind(customer_id)
        .fetch_one(&self.db)
        .await?;

        let balance = customer_balance(customer.opening_balance, due_collection, due_sell);

        Ok(CustomerAccount {
            customer,
            due_sell,
            due_collection,
            balance,
        })
    }

    /// The customer must exist, and so must the staff member when one is named
    async fn ensure_parties(&self, customer_id: Uuid, staff_id: Option<Uuid>) -> AppResult<()> {
        let mut conn = self.db.acquire().await?;
        ensure_exists(&mut conn, "customers", customer_id, "Customer").await?;
        if let Some(staff_id) = staff_id {
            ensure_exists(&mut conn, "staff", staff_id, "Staff member").await?;
        }
        Ok(())
    }

    /// Record goods sold on credit
    #[tracing::instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_due_sell(&self, input: CreateDueSellInput) -> AppResult<DueSell> {
        self.ensure_parties(input.customer_id, input.deliver_by).await?;

        let due_sell = sqlx::query_as::<_, DueSell>(
            r#"
            INSERT INTO due_sells (customer_id, deliver_by, sale_date, amount, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, customer_id, deliver_by, sale_date, amount, note, created_at
            "#,
        )
        .bind(input.customer_id)
        .bind(input.deliver_by)
        .bind(input.sale_date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(input.amount)
        .bind(&input.note)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(due_sell_id = %due_sell.id, amount = %due_sell.amount, "Due sell recorded");
        Ok(due_sell)
    }

    pub async fn list_due_sells(&self, filter: CustomerFilter) -> AppResult<Vec<DueSell>> {
        let due_sells = sqlx::query_as::<_, DueSell>(
            r#"
            SELECT id, customer_id, deliver_by, sale_date, amount, note, created_at
            FROM due_sells
            WHERE ($1::uuid IS NULL OR customer_id = $1)
            ORDER BY sale_date DESC, created_at DESC
            "#,
        )
        .bind(filter.customer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(due_sells)
    }

    /// Record money collected against a customer's dues
    #[tracing::instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_due_collection(
        &self,
        input: CreateDueCollectionInput,
    ) -> AppResult<DueCollection> {
        self.ensure_parties(input.customer_id, input.collected_by).await?;

        let collection = sqlx::query_as::<_, DueCollection>(
            r#"
            INSERT INTO due_collections (customer_id, collected_by, collection_date, amount, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, customer_id, collected_by, collection_date, amount, note, created_at
            "#,
        )
        .bind(input.customer_id)
        .bind(input.collected_by)
        .bind(input.collection_date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(input.amount)
        .bind(&input.note)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            due_collection_id = %collection.id,
            amount = %collection.amount,
            "Due collection recorded"
        );
        Ok(collection)
    }

    pub async fn list_due_collections(&self, filter: CustomerFilter) -> AppResult<Vec<DueCollection>> {
        let collections = sqlx::query_as::<_, DueCollection>(
            r#"
            SELECT id, customer_id, collected_by, collection_date, amount, note, created_at
            FROM due_collections
            WHERE ($1::uuid IS NULL OR customer_id = $1)
            ORDER BY collection_date DESC, created_at DESC
            "#,
        )
        .bind(filter.customer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(collections)
    }
}
