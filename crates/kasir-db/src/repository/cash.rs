//! # Cash Ledger Repository
//!
//! Per-branch cash ledger (kas). Rows come from three places:
//!
//! ```text
//! checkout ──► masuk  "Penjualan INV-…"            (post-discount total)
//!          └─► keluar "Penukaran poin INV-…"       (points × 1000, if any)
//! return   ──► keluar "Retur INV-…"                (refund)
//! manual   ──► masuk / keluar with free description
//! ```
//!
//! Amounts are always positive; `flow` carries the direction.

use chrono::{DateTime, Utc};
use kasir_core::validation::{validate_amount, validate_optional_text, validate_text};
use kasir_core::{CashEntry, CashFlow, Money};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::generate_id;
use crate::error::DbResult;

const CASH_COLUMNS: &str =
    "id, branch_id, flow, amount, description, reference, created_by, created_at";

/// Input for a manual ledger entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCashEntry {
    pub flow: CashFlow,
    pub amount: i64,
    pub description: String,
    pub reference: Option<String>,
}

/// Period filter for ledger queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CashFilter {
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

/// Ledger totals for a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CashSummary {
    pub total_in: Money,
    pub total_out: Money,
    /// `total_in − total_out`.
    pub balance: Money,
}

/// Repository for cash-ledger rows.
#[derive(Debug, Clone)]
pub struct CashRepository {
    pool: SqlitePool,
}

impl CashRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashRepository { pool }
    }

    /// Records a manual entry.
    pub async fn record(
        &self,
        branch_id: &str,
        input: &NewCashEntry,
        created_by: Option<&str>,
    ) -> DbResult<CashEntry> {
        validate_amount(input.amount)?;
        let entry = CashEntry {
            id: generate_id(),
            branch_id: branch_id.to_string(),
            flow: input.flow,
            amount: input.amount,
            description: validate_text("description", &input.description, 500)?,
            reference: validate_optional_text("reference", input.reference.as_deref(), 100)?,
            created_by: created_by.map(str::to_string),
            created_at: Utc::now(),
        };

        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, &entry).await?;

        info!(
            branch_id = %branch_id,
            flow = ?entry.flow,
            amount = entry.amount,
            "Manual cash entry recorded"
        );
        Ok(entry)
    }

    /// Entries of a branch, newest first.
    pub async fn list(&self, branch_id: &str, filter: &CashFilter) -> DbResult<Vec<CashEntry>> {
        let limit = filter.limit.unwrap_or(200).min(1_000);

        let rows = sqlx::query_as::<_, CashEntry>(&format!(
            r#"
            SELECT {CASH_COLUMNS}
            FROM cash_entries
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

    /// Entries carrying a reference (e.g. a receipt number), oldest first.
    pub async fn list_by_reference(&self, reference: &str) -> DbResult<Vec<CashEntry>> {
        let rows = sqlx::query_as::<_, CashEntry>(&format!(
            "SELECT {CASH_COLUMNS} FROM cash_entries WHERE reference = ?1 ORDER BY rowid"
        ))
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Totals for a branch over the filter's period (limit is ignored).
    pub async fn summary(&self, branch_id: &str, filter: &CashFilter) -> DbResult<CashSummary> {
        let (total_in, total_out): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN flow = 'masuk' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN flow = 'keluar' THEN amount ELSE 0 END), 0)
            FROM cash_entries
            WHERE branch_id = ?1
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at < ?3)
            "#,
        )
        .bind(branch_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await?;

        let total_in = Money::from_rupiah(total_in);
        let total_out = Money::from_rupiah(total_out);
        Ok(CashSummary {
            total_in,
            total_out,
            balance: total_in - total_out,
        })
    }
}

/// Inserts a ledger row on an existing connection or transaction.
pub(crate) async fn insert(conn: &mut SqliteConnection, entry: &CashEntry) -> DbResult<()> {
    debug!(
        branch_id = %entry.branch_id,
        flow = ?entry.flow,
        amount = entry.amount,
        "Inserting cash entry"
    );

    sqlx::query(
        r#"
        INSERT INTO cash_entries (
            id, branch_id, flow, amount, description, reference, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.branch_id)
    .bind(entry.flow)
    .bind(entry.amount)
    .bind(&entry.description)
    .bind(&entry.reference)
    .bind(&entry.created_by)
    .bind(entry.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::Fixture;
    use crate::DbError;

    fn entry(flow: CashFlow, amount: i64, description: &str) -> NewCashEntry {
        NewCashEntry {
            flow,
            amount,
            description: description.to_string(),
            reference: None,
        }
    }

    #[tokio::test]
    async fn test_record_list_and_summary() {
        let fx = Fixture::new().await;
        let repo = fx.db.cash();

        repo.record(&fx.branch.id, &entry(CashFlow::Masuk, 500_000, "Modal awal"), Some(fx.owner.id.as_str()))
            .await
            .unwrap();
        repo.record(&fx.branch.id, &entry(CashFlow::Keluar, 75_000, "Beli galon"), None)
            .await
            .unwrap();

        let rows = repo.list(&fx.branch.id, &CashFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].description, "Beli galon");
        assert_eq!(rows[1].created_by.as_deref(), Some(fx.owner.id.as_str()));

        let summary = repo.summary(&fx.branch.id, &CashFilter::default()).await.unwrap();
        assert_eq!(summary.total_in.rupiah(), 500_000);
        assert_eq!(summary.total_out.rupiah(), 75_000);
        assert_eq!(summary.balance.rupiah(), 425_000);
    }

    #[tokio::test]
    async fn test_period_filter() {
        let fx = Fixture::new().await;
        let repo = fx.db.cash();
        repo.record(&fx.branch.id, &entry(CashFlow::Masuk, 10_000, "Setoran"), None)
            .await
            .unwrap();

        let future = CashFilter {
            from: Some(Utc::now() + chrono::Duration::hours(1)),
            to: None,
            limit: None,
        };
        assert!(repo.list(&fx.branch.id, &future).await.unwrap().is_empty());
        assert_eq!(
            repo.summary(&fx.branch.id, &future).await.unwrap().balance,
            Money::zero()
        );
    }

    #[tokio::test]
    async fn test_invalid_entries_rejected() {
        let fx = Fixture::new().await;
        let repo = fx.db.cash();

        let err = repo
            .record(&fx.branch.id, &entry(CashFlow::Masuk, 0, "Nol"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(_)));

        let err = repo
            .record(&fx.branch.id, &entry(CashFlow::Keluar, 1_000, "  "), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(_)));
    }
}
