//! Delete guards for rows referenced under `ON DELETE RESTRICT`

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A table whose rows may point at the row being deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub table: &'static str,
    pub column: &'static str,
    /// Plural label used in the error message
    pub label: &'static str,
}

impl Reference {
    pub const fn new(table: &'static str, column: &'static str, label: &'static str) -> Self {
        Self {
            table,
            column,
            label,
        }
    }
}

/// `Protected` error for the first reference with a non-zero count
pub fn check_reference_count(resource: &str, reference: &Reference, count: i64) -> AppResult<()> {
    if count > 0 {
        return Err(AppError::Protected {
            resource: resource.to_string(),
            count,
            referenced_by: reference.label.to_string(),
        });
    }
    Ok(())
}

/// Fail with `Protected` on the first reference that still points at `id`
pub async fn ensure_unreferenced(
    conn: &mut PgConnection,
    resource: &str,
    id: Uuid,
    references: &[Reference],
) -> AppResult<()> {
    for reference in references {
        let count = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            reference.table, reference.column
        ))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        check_reference_count(resource, reference, count)?;
    }
    Ok(())
}

/// Fail with `NotFound(label)` unless `table` has a row with this id
pub async fn ensure_exists(
    conn: &mut PgConnection,
    table: &'static str,
    id: Uuid,
    label: &str,
) -> AppResult<()> {
    let found = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)"
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    if !found {
        return Err(AppError::NotFound(label.to_string()));
    }
    Ok(())
}

/// Lock the row about to be deleted or fail with `NotFound(label)`
pub async fn lock_row(
    conn: &mut PgConnection,
    table: &'static str,
    id: Uuid,
    label: &str,
) -> AppResult<()> {
    sqlx::query_scalar::<_, Uuid>(&format!("SELECT id FROM {table} WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(label.to_string()))?;
    Ok(())
}
