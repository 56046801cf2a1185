//! # Return Repository
//!
//! Returns (retur) against single transaction lines. Each return restocks
//! the product, books the refund as a cash keluar and, once nothing is left
//! to return, flips the line to `returned`. All of it commits together.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use kasir_core::report::LineReturns;
use kasir_core::returns::{plan_return, ReturnPlan};
use kasir_core::validation::validate_text;
use kasir_core::{CashEntry, CashFlow, Money, ProductReturn, Transaction, TransactionStatus};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use super::{cash, generate_id, product, transaction};
use crate::error::{DbError, DbResult};

const RETURN_COLUMNS: &str =
    "id, transaction_id, branch_id, quantity, reason, refund_amount, created_by, created_at";

/// Input for a return.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReturn {
    pub transaction_id: String,
    pub quantity: i64,
    pub reason: String,
}

/// Result of a committed return.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnReceipt {
    #[serde(rename = "return")]
    pub record: ProductReturn,
    pub plan: ReturnPlan,
    /// The line as it stands after the return.
    pub transaction: Transaction,
    /// Refund booked in the ledger, absent when the refund rounds to zero.
    pub cash_entry: Option<CashEntry>,
}

/// Repository for returns.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Processes a return atomically.
    pub async fn process(
        &self,
        business_id: &str,
        input: &NewReturn,
        created_by: Option<&str>,
    ) -> DbResult<ReturnReceipt> {
        let reason = validate_text("reason", &input.reason, 500)?;

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let mut line = transaction::fetch(&mut *tx, &input.transaction_id)
            .await?
            .filter(|t| t.business_id == business_id)
            .ok_or_else(|| DbError::not_found("Transaction", &input.transaction_id))?;

        let already = returned_quantity(&mut *tx, &line.id).await?;
        let plan = plan_return(&line, already, input.quantity)?;

        let now = Utc::now();
        let record = ProductReturn {
            id: generate_id(),
            transaction_id: line.id.clone(),
            branch_id: line.branch_id.clone(),
            quantity: plan.quantity,
            reason,
            refund_amount: plan.refund.rupiah(),
            created_by: created_by.map(str::to_string),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO returns (
                id, transaction_id, branch_id, quantity, reason, refund_amount, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&record.id)
        .bind(&record.transaction_id)
        .bind(&record.branch_id)
        .bind(record.quantity)
        .bind(&record.reason)
        .bind(record.refund_amount)
        .bind(&record.created_by)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        product::restock(&mut *tx, &line.product_id, plan.quantity).await?;

        let cash_entry = if plan.refund.is_positive() {
            let entry = CashEntry {
                id: generate_id(),
                branch_id: line.branch_id.clone(),
                flow: CashFlow::Keluar,
                amount: plan.refund.rupiah(),
                description: format!("Retur {}", line.receipt_number),
                reference: Some(line.receipt_number.clone()),
                created_by: record.created_by.clone(),
                created_at: now,
            };
            cash::insert(&mut *tx, &entry).await?;
            Some(entry)
        } else {
            None
        };

        if plan.fully_returned {
            transaction::set_status(&mut *tx, &line.id, TransactionStatus::Returned).await?;
            line.status = TransactionStatus::Returned;
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            receipt_number = %line.receipt_number,
            transaction_id = %line.id,
            quantity = plan.quantity,
            refund = plan.refund.rupiah(),
            fully_returned = plan.fully_returned,
            "Return processed"
        );

        Ok(ReturnReceipt {
            record,
            plan,
            transaction: line,
            cash_entry,
        })
    }

    /// Returns of a branch, newest first.
    pub async fn list(&self, branch_id: &str, limit: u32) -> DbResult<Vec<ProductReturn>> {
        let rows = sqlx::query_as::<_, ProductReturn>(&format!(
            r#"
            SELECT {RETURN_COLUMNS}
            FROM returns
            WHERE branch_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#
        ))
        .bind(branch_id)
        .bind(limit.min(1_000))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_for_transaction(&self, transaction_id: &str) -> DbResult<Vec<ProductReturn>> {
        let rows = sqlx::query_as::<_, ProductReturn>(&format!(
            "SELECT {RETURN_COLUMNS} FROM returns WHERE transaction_id = ?1 ORDER BY rowid"
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returned units and refunds per line, for the lines a branch sold in
    /// `[from, to)`. Keyed by transaction id.
    pub async fn totals_by_line(
        &self,
        branch_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<HashMap<String, LineReturns>> {
        let rows = sqlx::query_as::<_, (String, i64, i64)>(
            r#"
            SELECT r.transaction_id, SUM(r.quantity), SUM(r.refund_amount)
            FROM returns r
            JOIN transactions t ON t.id = r.transaction_id
            WHERE t.branch_id = ?1
              AND (?2 IS NULL OR t.created_at >= ?2)
              AND (?3 IS NULL OR t.created_at < ?3)
            GROUP BY r.transaction_id
            "#,
        )
        .bind(branch_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(transaction_id, quantity, refund)| {
                let totals = LineReturns {
                    quantity,
                    refund: Money::from_rupiah(refund),
                };
                (transaction_id, totals)
            })
            .collect())
    }

    /// Units of a line returned so far.
    pub async fn returned_quantity(&self, transaction_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        returned_quantity(&mut conn, transaction_id).await
    }
}

async fn returned_quantity(conn: &mut SqliteConnection, transaction_id: &str) -> DbResult<i64> {
    let quantity: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM returns WHERE transaction_id = ?1")
            .bind(transaction_id)
            .fetch_one(conn)
            .await?;

    Ok(quantity)
}
