//! # Transaction Repository
//!
//! Read access to sold lines (transaksi) plus the connection-level writers
//! used by the checkout and return executors.

use chrono::{DateTime, Utc};
use kasir_core::{Transaction, TransactionStatus};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

pub(crate) const TRANSACTION_COLUMNS: &str = "id, receipt_number, business_id, branch_id, \
     product_id, member_id, cashier_id, product_name, quantity, unit_price, subtotal, \
     points_used, discount, total, points_earned, payment_method, status, created_at";

/// Filter for listing transaction lines of a branch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

/// Repository for transaction lines.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// All lines of one receipt, in insertion order.
    pub async fn list_by_receipt(&self, receipt_number: &str) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE receipt_number = ?1 ORDER BY rowid"
        ))
        .bind(receipt_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lines of a branch, newest first.
    pub async fn list(&self, branch_id: &str, filter: &TransactionFilter) -> DbResult<Vec<Transaction>> {
        let limit = filter.limit.unwrap_or(200).min(1_000);

        debug!(branch_id = %branch_id, ?filter, "Listing transactions");

        let rows = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE branch_id = ?1
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?4
            "#
        ))
        .bind(branch_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Every line of a branch in a period, unbounded (for reports).
    pub async fn list_for_period(
        &self,
        branch_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE branch_id = ?1
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            ORDER BY created_at
            "#
        ))
        .bind(branch_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Transaction>> {
    let row = sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Inserts one sold line. Product name and unit price are snapshots.
pub(crate) async fn insert(conn: &mut SqliteConnection, row: &Transaction) -> DbResult<()> {
    debug!(
        receipt_number = %row.receipt_number,
        product_id = %row.product_id,
        quantity = row.quantity,
        "Inserting transaction line"
    );

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, receipt_number, business_id, branch_id, product_id, member_id, cashier_id,
            product_name, quantity, unit_price, subtotal,
            points_used, discount, total, points_earned,
            payment_method, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
    )
    .bind(&row.id)
    .bind(&row.receipt_number)
    .bind(&row.business_id)
    .bind(&row.branch_id)
    .bind(&row.product_id)
    .bind(&row.member_id)
    .bind(&row.cashier_id)
    .bind(&row.product_name)
    .bind(row.quantity)
    .bind(row.unit_price)
    .bind(row.subtotal)
    .bind(row.points_used)
    .bind(row.discount)
    .bind(row.total)
    .bind(row.points_earned)
    .bind(row.payment_method)
    .bind(row.status)
    .bind(row.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: TransactionStatus,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE transactions SET status = ?2 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Transaction", id));
    }

    Ok(())
}
