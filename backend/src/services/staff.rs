//! Staff directory service
//!
//! Staff members are the people named on documents (order taker, salesman,
//! delivery man, collector). Login credentials are not kept here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::StaffRole;

use crate::error::{AppError, AppResult};
use crate::services::protect::{ensure_unreferenced, lock_row, Reference};

/// Documents that name a staff member
const STAFF_REFERENCES: [Reference; 4] = [
    Reference::new("orders", "order_by", "orders"),
    Reference::new("sales_collections", "sales_by", "sales collections"),
    Reference::new("due_sells", "deliver_by", "due sells"),
    Reference::new("due_collections", "collected_by", "due collections"),
];

#[derive(Clone)]
pub struct StaffService {
    db: PgPool,
}

/// Staff record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StaffMember {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub nid: Option<String>,
    pub dob: Option<NaiveDate>,
    pub role: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const STAFF_COLUMNS: &str = "id, username, email, first_name, last_name, phone_number, nid, dob, \
     role, is_active, date_joined, updated_at";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStaffInput {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
    #[validate(length(max = 50))]
    pub nid: Option<String>,
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub role: StaffRole,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateStaffInput {
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
    #[validate(length(max = 50))]
    pub nid: Option<String>,
    pub dob: Option<NaiveDate>,
    pub role: Option<StaffRole>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StaffFilter {
    pub role: Option<StaffRole>,
    pub is_active: Option<bool>,
}

impl StaffService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    #[tracing::instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_staff(&self, input: CreateStaffInput) -> AppResult<StaffMember> {
        let member = sqlx::query_as::<_, StaffMember>(&format!(
            r#"
            INSERT INTO staff (
                username, email, first_name, last_name, phone_number, nid, dob, role, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {STAFF_COLUMNS}
            "#
        ))
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone_number)
        .bind(&input.nid)
        .bind(input.dob)
        .bind(input.role.as_str())
        .bind(input.is_active.unwrap_or(true))
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "username"))?;

        tracing::info!(staff_id = %member.id, role = %member.role, "Staff member created");
        Ok(member)
    }

    pub async fn list_staff(&self, filter: StaffFilter) -> AppResult<Vec<StaffMember>> {
        let staff = sqlx::query_as::<_, StaffMember>(&format!(
            r#"
            SELECT {STAFF_COLUMNS}
            FROM staff
            WHERE ($1::text IS NULL OR role = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY username
            "#
        ))
        .bind(filter.role.map(|r| r.as_str()))
        .bind(filter.is_active)
        .fetch_all(&self.db)
        .await?;

        Ok(staff)
    }

    pub async fn get_staff(&self, staff_id: Uuid) -> AppResult<StaffMember> {
        sqlx::query_as::<_, StaffMember>(&format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = $1"))
            .bind(staff_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Staff member".to_string()))
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_staff(
        &self,
        staff_id: Uuid,
        input: UpdateStaffInput,
    ) -> AppResult<StaffMember> {
        sqlx::query_as::<_, StaffMember>(&format!(
            r#"
            UPDATE staff
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                phone_number = COALESCE($6, phone_number),
                nid = COALESCE($7, nid),
                dob = COALESCE($8, dob),
                role = COALESCE($9, role),
                is_active = COALESCE($10, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {STAFF_COLUMNS}
            "#
        ))
        .bind(staff_id)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone_number)
        .bind(&input.nid)
        .bind(input.dob)
        .bind(input.role.map(|r| r.as_str()))
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "username"))?
        .ok_or_else(|| AppError::NotFound("Staff member".to_string()))
    }

    /// Delete a staff member no document names; deactivate instead otherwise
    #[tracing::instrument(skip(self))]
    pub async fn delete_staff(&self, staff_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_row(&mut tx, "staff", staff_id, "Staff member").await?;
        ensure_unreferenced(&mut tx, "staff member", staff_id, &STAFF_REFERENCES).await?;

        sqlx::query("DELETE FROM staff WHERE id = $1")
            .bind(staff_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(staff_id = %staff_id, "Staff member deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_defaults_to_salesman() {
        let input: CreateStaffInput =
            serde_json::from_value(serde_json::json!({ "username": "karim" })).unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(input.role, StaffRole::Salesman);
    }

    #[test]
    fn test_email_is_checked() {
        let input = UpdateStaffInput {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_role_filter_parses_wire_value() {
        let filter: StaffFilter =
            serde_json::from_value(serde_json::json!({ "role": "DELIVERY_MAN" })).unwrap();
        assert_eq!(filter.role, Some(StaffRole::DeliveryMan));
    }

    #[test]
    fn test_every_document_column_is_guarded() {
        let columns: Vec<&str> = STAFF_REFERENCES.iter().map(|r| r.column).collect();
        assert_eq!(columns, ["order_by", "sales_by", "deliver_by", "collected_by"]);
    }
}
