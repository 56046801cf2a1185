//! # Stock Transfer Repository
//!
//! Moves stock from a product in one branch to the product with the same
//! barcode in another branch of the same business.

use chrono::Utc;
use kasir_core::validation::validate_optional_text;
use kasir_core::{CoreError, StockTransfer, ValidationError};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use super::{branch, generate_id, product};
use crate::error::{DbError, DbResult};

const TRANSFER_COLUMNS: &str = "id, business_id, from_branch_id, to_branch_id, from_product_id, \
     to_product_id, quantity, note, created_by, created_at";

/// Input for a transfer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransfer {
    pub from_product_id: String,
    pub to_branch_id: String,
    pub quantity: i64,
    pub note: Option<String>,
}

/// Repository for stock transfers.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    /// Moves `quantity` units atomically and records the transfer.
    pub async fn transfer(
        &self,
        business_id: &str,
        input: &NewTransfer,
        created_by: Option<&str>,
    ) -> DbResult<StockTransfer> {
        if input.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        let note = validate_optional_text("note", input.note.as_deref(), 500)?;

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let source = product::fetch(&mut *tx, &input.from_product_id)
            .await?
            .filter(|p| p.business_id == business_id && p.is_active)
            .ok_or_else(|| DbError::not_found("Product", &input.from_product_id))?;

        if source.branch_id == input.to_branch_id {
            return Err(CoreError::SameBranchTransfer.into());
        }
        branch::require_active(&mut *tx, business_id, &source.branch_id).await?;
        branch::require_active(&mut *tx, business_id, &input.to_branch_id).await?;

        let barcode = source
            .barcode
            .as_deref()
            .ok_or_else(|| DbError::not_found("Product barcode", &source.id))?;
        let destination = product::fetch_by_barcode(&mut *tx, &input.to_branch_id, barcode)
            .await?
            .ok_or_else(|| DbError::not_found("Product", barcode))?;

        if !product::take_stock(&mut *tx, &source.id, input.quantity).await? {
            return Err(CoreError::InsufficientStock {
                product: source.name.clone(),
                available: source.stock,
                requested: input.quantity,
            }
            .into());
        }
        product::restock(&mut *tx, &destination.id, input.quantity).await?;

        let record = StockTransfer {
            id: generate_id(),
            business_id: business_id.to_string(),
            from_branch_id: source.branch_id.clone(),
            to_branch_id: destination.branch_id.clone(),
            from_product_id: source.id.clone(),
            to_product_id: destination.id.clone(),
            quantity: input.quantity,
            note,
            created_by: created_by.map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO stock_transfers (
                id, business_id, from_branch_id, to_branch_id, from_product_id,
                to_product_id, quantity, note, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&record.id)
        .bind(&record.business_id)
        .bind(&record.from_branch_id)
        .bind(&record.to_branch_id)
        .bind(&record.from_product_id)
        .bind(&record.to_product_id)
        .bind(record.quantity)
        .bind(&record.note)
        .bind(&record.created_by)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            product = %source.name,
            from_branch = %record.from_branch_id,
            to_branch = %record.to_branch_id,
            quantity = record.quantity,
            "Stock transferred"
        );
        Ok(record)
    }

    /// Transfers touching a business, newest first.
    pub async fn list(&self, business_id: &str, limit: u32) -> DbResult<Vec<StockTransfer>> {
        let rows = sqlx::query_as::<_, StockTransfer>(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM stock_transfers
            WHERE business_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#
        ))
        .bind(business_id)
        .bind(limit.min(1_000))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::Fixture;

    fn move_units(product_id: &str, to_branch_id: &str, quantity: i64) -> NewTransfer {
        NewTransfer {
            from_product_id: product_id.to_string(),
            to_branch_id: to_branch_id.to_string(),
            quantity,
            note: Some("Restock cabang".to_string()),
        }
    }

    async fn stock_of(fx: &Fixture, id: &str) -> i64 {
        fx.db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_transfer_moves_stock() {
        let fx = Fixture::new().await;
        let timur = fx.add_branch("Cabang Timur").await;
        let pusat = fx
            .add_product_in(&fx.branch.id, "Indomie Goreng", Some("8998866200301"), 3_500, None, 40)
            .await;
        let cabang = fx
            .add_product_in(&timur.id, "Indomie Goreng", Some("8998866200301"), 3_500, None, 2)
            .await;

        let record = fx
            .db
            .transfers()
            .transfer(&fx.business.id, &move_units(&pusat.id, &timur.id, 15), Some(fx.owner.id.as_str()))
            .await
            .unwrap();
        assert_eq!(record.to_product_id, cabang.id);

        assert_eq!(stock_of(&fx, &pusat.id).await, 25);
        assert_eq!(stock_of(&fx, &cabang.id).await, 17);
        assert_eq!(fx.db.transfers().list(&fx.business.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_rejections_leave_stock_untouched() {
        let fx = Fixture::new().await;
        let timur = fx.add_branch("Cabang Timur").await;
        let barat = fx.add_branch("Cabang Barat").await;
        let pusat = fx
            .add_product_in(&fx.branch.id, "Aqua 600ml", Some("AQ-600"), 4_000, None, 5)
            .await;
        fx.add_product_in(&timur.id, "Aqua 600ml", Some("AQ-600"), 4_000, None, 0)
            .await;
        let repo = fx.db.transfers();

        let err = repo
            .transfer(&fx.business.id, &move_units(&pusat.id, &fx.branch.id, 1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::SameBranchTransfer)));

        let err = repo
            .transfer(&fx.business.id, &move_units(&pusat.id, &barat.id, 1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = repo
            .transfer(&fx.business.id, &move_units(&pusat.id, &timur.id, 6), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));

        let err = repo
            .transfer(&fx.business.id, &move_units(&pusat.id, &timur.id, 0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(_)));

        assert_eq!(stock_of(&fx, &pusat.id).await, 5);
        assert!(repo.list(&fx.business.id, 10).await.unwrap().is_empty());
    }
}
