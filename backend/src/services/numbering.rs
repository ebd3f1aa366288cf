//! Document number generation backed by the stored identifiers

use chrono::{Datelike, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::collections::HashSet;

use shared::numbering::{allocate, Allocated, NumberScheme};

use crate::error::AppResult;

/// Identifier series the backend hands out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSeries {
    Sku,
    Order,
    Voucher,
    Sales,
}

impl DocumentSeries {
    /// Table and column holding issued identifiers
    fn source(&self) -> (&'static str, &'static str) {
        match self {
            DocumentSeries::Sku => ("products", "sku"),
            DocumentSeries::Order => ("orders", "order_number"),
            DocumentSeries::Voucher => ("purchases", "voucher_number"),
            DocumentSeries::Sales => ("sales_collections", "sales_id"),
        }
    }

    pub fn scheme(&self, year: i32) -> NumberScheme {
        match self {
            DocumentSeries::Sku => NumberScheme::sku(),
            DocumentSeries::Order => NumberScheme::order(year),
            DocumentSeries::Voucher => NumberScheme::voucher(year),
            DocumentSeries::Sales => NumberScheme::sales(year),
        }
    }
}

/// Numbering service for generator endpoints and create paths
#[derive(Clone)]
pub struct DocumentNumberService {
    db: PgPool,
    max_attempts: u32,
}

impl DocumentNumberService {
    pub fn new(db: PgPool, max_attempts: u32) -> Self {
        Self { db, max_attempts }
    }

    /// Preview the next number of a series without reserving it
    pub async fn generate(&self, series: DocumentSeries) -> AppResult<String> {
        let mut conn = self.db.acquire().await?;
        let allocated = allocate_on(&mut conn, series, self.max_attempts).await?;
        Ok(allocated.number)
    }
}

/// Allocate a number inside the caller's transaction.
///
/// Takes a transaction-scoped advisory lock on the series scope so concurrent
/// creators of the same series queue up until the caller commits.
pub async fn reserve(
    tx: &mut Transaction<'_, Postgres>,
    series: DocumentSeries,
    max_attempts: u32,
) -> AppResult<String> {
    let scope = series.scheme(Utc::now().year()).scope();
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&scope)
        .execute(&mut **tx)
        .await?;

    let allocated = allocate_on(&mut **tx, series, max_attempts).await?;
    tracing::debug!(scope = %scope, number = %allocated.number, "Reserved document number");
    Ok(allocated.number)
}

async fn allocate_on(
    conn: &mut PgConnection,
    series: DocumentSeries,
    max_attempts: u32,
) -> AppResult<Allocated> {
    let now = Utc::now();
    let scheme = series.scheme(now.year());
    let (table, column) = series.source();

    let existing: HashSet<String> = sqlx::query_scalar::<_, String>(&format!(
        "SELECT {column} FROM {table} WHERE {column} LIKE $1"
    ))
    .bind(scheme.like_pattern())
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    let allocated = allocate(
        &scheme,
        existing.iter(),
        |candidate| existing.contains(candidate),
        max_attempts,
        now,
    );

    if allocated.fallback {
        tracing::warn!(
            scope = %scheme.scope(),
            number = %allocated.number,
            max_attempts,
            "Sequential numbering exhausted, using timestamp-derived number"
        );
    }

    Ok(allocated)
}
