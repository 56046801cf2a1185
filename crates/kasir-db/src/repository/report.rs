//! Report queries. Rows are loaded here and aggregated by
//! `kasir_core::report`.

use chrono::{DateTime, Utc};
use kasir_core::report::{inventory_report, summarize_sales, InventoryReport, SalesSummary};
use sqlx::SqlitePool;
use tracing::debug;

use super::{ProductRepository, ReturnRepository, TransactionRepository};
use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sales summary for a branch over `[from, to)`, net of returns on the
    /// period's lines.
    pub async fn sales_summary(
        &self,
        branch_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        top_n: usize,
    ) -> DbResult<SalesSummary> {
        let rows = TransactionRepository::new(self.pool.clone())
            .list_for_period(branch_id, from, to)
            .await?;
        let returns = ReturnRepository::new(self.pool.clone())
            .totals_by_line(branch_id, from, to)
            .await?;

        debug!(
            branch_id = %branch_id,
            rows = rows.len(),
            returned_lines = returns.len(),
            "Summarizing sales"
        );
        Ok(summarize_sales(&rows, &returns, top_n))
    }

    /// Stock position of every active product in a branch.
    pub async fn inventory(&self, branch_id: &str, threshold: i64) -> DbResult<InventoryReport> {
        let products = ProductRepository::new(self.pool.clone())
            .list(branch_id, false)
            .await?;

        Ok(inventory_report(&products, threshold))
    }
}
