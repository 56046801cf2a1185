//! # Checkout Executor
//!
//! Runs a checkout as one database transaction.
//!
//! ## Flow
//! ```text
//! CheckoutRequest
//!      │ merge duplicate lines, validate quantities
//!      ▼
//! BEGIN
//!      │ load business flag, branch, member + balance, products
//!      ▼
//! plan_checkout (kasir-core, pure)
//!      │ prices, stock check, points allocation, ledger amounts
//!      ▼
//! per line: conditional stock decrement ─► INSERT transactions
//!      │
//!      ▼
//! cash ledger: masuk (total), keluar (redeemed points)
//!      │
//!      ▼
//! COMMIT  (any error before this drops the transaction = rollback)
//! ```

use chrono::{DateTime, Utc};
use kasir_core::checkout::{generate_receipt_number, merge_lines, plan_checkout, CheckoutLine, CheckoutPlan, PointsContext};
use kasir_core::{CashEntry, CashFlow, CoreError, PaymentMethod, Product, Transaction, TransactionStatus};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{branch, business, cash, generate_id, member, product, transaction};
use crate::error::{DbError, DbResult};

/// Everything needed to ring up a sale.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub business_id: String,
    pub branch_id: String,
    pub cashier_id: String,
    pub member_id: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub points_to_use: i64,
    pub lines: Vec<CheckoutLine>,
}

/// Result of a committed checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub receipt_number: String,
    pub created_at: DateTime<Utc>,
    pub plan: CheckoutPlan,
    pub transactions: Vec<Transaction>,
    pub cash_entries: Vec<CashEntry>,
}

/// Executes checkouts atomically.
#[derive(Debug, Clone)]
pub struct CheckoutRepository {
    pool: SqlitePool,
}

impl CheckoutRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutRepository { pool }
    }

    /// Validates, prices and records a sale.
    ///
    /// Either every line, stock decrement and ledger row is written, or
    /// nothing is.
    pub async fn checkout(&self, request: &CheckoutRequest) -> DbResult<CheckoutReceipt> {
        let lines = merge_lines(&request.lines)?;

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let business = business::fetch(&mut *tx, &request.business_id)
            .await?
            .ok_or_else(|| DbError::not_found("Business", &request.business_id))?;
        branch::require_active(&mut *tx, &business.id, &request.branch_id).await?;

        let member_balance = match request.member_id.as_deref() {
            Some(member_id) => {
                let member = member::fetch_in_business(&mut *tx, &business.id, member_id)
                    .await?
                    .filter(|m| m.is_active)
                    .ok_or_else(|| DbError::not_found("Member", member_id))?;
                member::points_balance(&mut *tx, &member.id).await?
            }
            None => 0,
        };

        let mut priced: Vec<(Product, i64)> = Vec::with_capacity(lines.len());
        for line in &lines {
            let found = product::fetch(&mut *tx, &line.product_id)
                .await?
                .filter(|p| p.business_id == business.id)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            priced.push((found, line.quantity));
        }

        let plan = plan_checkout(
            &request.branch_id,
            &priced,
            PointsContext {
                enabled: business.points_enabled,
                has_member: request.member_id.is_some(),
                member_balance,
                requested: request.points_to_use,
            },
        )?;

        let created_at = Utc::now();
        let suffix = (Uuid::new_v4().as_u128() % 10_000) as u32;
        let receipt_number = generate_receipt_number(created_at, suffix);

        debug!(
            receipt_number = %receipt_number,
            lines = plan.lines.len(),
            total = plan.total.rupiah(),
            "Writing checkout"
        );

        let mut transactions = Vec::with_capacity(plan.lines.len());
        for (line, (stocked, _)) in plan.lines.iter().zip(&priced) {
            if !product::take_stock(&mut *tx, &line.product_id, line.quantity).await? {
                return Err(CoreError::InsufficientStock {
                    product: line.product_name.clone(),
                    available: stocked.stock,
                    requested: line.quantity,
                }
                .into());
            }

            let row = Transaction {
                id: generate_id(),
                receipt_number: receipt_number.clone(),
                business_id: business.id.clone(),
                branch_id: request.branch_id.clone(),
                product_id: line.product_id.clone(),
                member_id: request.member_id.clone(),
                cashier_id: request.cashier_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price.rupiah(),
                subtotal: line.subtotal.rupiah(),
                points_used: line.points_used,
                discount: line.discount.rupiah(),
                total: line.total.rupiah(),
                points_earned: line.points_earned,
                payment_method: request.payment_method,
                status: TransactionStatus::Completed,
                created_at,
            };
            transaction::insert(&mut *tx, &row).await?;
            transactions.push(row);
        }

        let mut cash_entries = Vec::with_capacity(2);
        // The ledger rejects zero amounts; a fully redeemed sale has no masuk row.
        if plan.cash_in.is_positive() {
            cash_entries.push(ledger_row(
                request,
                CashFlow::Masuk,
                plan.cash_in.rupiah(),
                format!("Penjualan {receipt_number}"),
                &receipt_number,
                created_at,
            ));
        }
        if let Some(redeemed) = plan.cash_out.filter(|m| m.is_positive()) {
            cash_entries.push(ledger_row(
                request,
                CashFlow::Keluar,
                redeemed.rupiah(),
                format!("Penukaran poin {receipt_number}"),
                &receipt_number,
                created_at,
            ));
        }
        for entry in &cash_entries {
            cash::insert(&mut *tx, entry).await?;
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            receipt_number = %receipt_number,
            branch_id = %request.branch_id,
            items = plan.total_quantity(),
            total = plan.total.rupiah(),
            points_redeemed = plan.points_redeemed,
            points_earned = plan.points_earned,
            payment_method = request.payment_method.as_str(),
            "Checkout completed"
        );

        Ok(CheckoutReceipt {
            receipt_number,
            created_at,
            plan,
            transactions,
            cash_entries,
        })
    }
}

fn ledger_row(
    request: &CheckoutRequest,
    flow: CashFlow,
    amount: i64,
    description: String,
    receipt_number: &str,
    created_at: DateTime<Utc>,
) -> CashEntry {
    CashEntry {
        id: generate_id(),
        branch_id: request.branch_id.clone(),
        flow,
        amount,
        description,
        reference: Some(receipt_number.to_string()),
        created_by: Some(request.cashier_id.clone()),
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::Fixture;
    use crate::repository::CashFilter;

    fn request(fx: &Fixture, lines: Vec<(&str, i64)>) -> CheckoutRequest {
        CheckoutRequest {
            business_id: fx.business.id.clone(),
            branch_id: fx.branch.id.clone(),
            cashier_id: fx.cashier.id.clone(),
            member_id: None,
            payment_method: PaymentMethod::Cash,
            points_to_use: 0,
            lines: lines
                .into_iter()
                .map(|(id, quantity)| CheckoutLine {
                    product_id: id.to_string(),
                    quantity,
                })
                .collect(),
        }
    }

    async fn stock_of(fx: &Fixture, id: &str) -> i64 {
        fx.db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_checkout_writes_lines_stock_and_ledger() {
        let fx = Fixture::new().await;
        let kopi = fx.add_product("Kopi Kapal Api", 2_500, 50).await;
        let gula = fx.add_product("Gula 1kg", 16_000, 10).await;

        let receipt = fx
            .db
            .checkout()
            .checkout(&request(&fx, vec![(&kopi.id, 4), (&gula.id, 1), (&kopi.id, 2)]))
            .await
            .unwrap();

        assert!(receipt.receipt_number.starts_with("INV-"));
        assert_eq!(receipt.transactions.len(), 2);
        assert_eq!(receipt.plan.total.rupiah(), 6 * 2_500 + 16_000);

        assert_eq!(stock_of(&fx, &kopi.id).await, 44);
        assert_eq!(stock_of(&fx, &gula.id).await, 9);

        let stored = fx
            .db
            .transactions()
            .list_by_receipt(&receipt.receipt_number)
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].product_name, "Kopi Kapal Api");
        assert_eq!(stored[0].quantity, 6);
        assert_eq!(stored[0].cashier_id, fx.cashier.id);

        let ledger = fx.db.cash().list_by_reference(&receipt.receipt_number).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].flow, CashFlow::Masuk);
        assert_eq!(ledger[0].amount, 31_000);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let fx = Fixture::new().await;
        let roti = fx.add_product("Roti Tawar", 15_000, 5).await;
        let susu = fx.add_product("Susu UHT", 6_000, 2).await;

        let err = fx
            .db
            .checkout()
            .checkout(&request(&fx, vec![(&roti.id, 1), (&susu.id, 3)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 2, requested: 3, .. })
        ));

        assert_eq!(stock_of(&fx, &roti.id).await, 5);
        assert_eq!(stock_of(&fx, &susu.id).await, 2);
        assert!(fx
            .db
            .transactions()
            .list(&fx.branch.id, &Default::default())
            .await
            .unwrap()
            .is_empty());
        assert!(fx
            .db
            .cash()
            .list(&fx.branch.id, &CashFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_product_from_other_branch_rejected() {
        let fx = Fixture::new().await;
        let other = fx.add_branch("Cabang Timur").await;
        let sabun = fx
            .add_product_in(&other.id, "Sabun", None, 4_000, None, 10)
            .await;

        let err = fx
            .db
            .checkout()
            .checkout(&request(&fx, vec![(&sabun.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ProductNotFound(_))));
        assert_eq!(stock_of(&fx, &sabun.id).await, 10);
    }

    #[tokio::test]
    async fn test_points_ignored_when_disabled() {
        let fx = Fixture::new().await;
        let member = fx.add_member("Siti").await;
        let beras = fx.add_product("Beras 5kg", 70_000, 10).await;

        let mut req = request(&fx, vec![(&beras.id, 2)]);
        req.member_id = Some(member.id.clone());
        req.points_to_use = 50;

        let receipt = fx.db.checkout().checkout(&req).await.unwrap();
        assert_eq!(receipt.plan.points_redeemed, 0);
        assert_eq!(receipt.plan.points_earned, 0);
        assert_eq!(receipt.plan.total.rupiah(), 140_000);
        assert_eq!(receipt.cash_entries.len(), 1);
        assert_eq!(fx.db.members().points_balance(&member.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_member_price_and_points_cycle() {
        let mut fx = Fixture::new().await;
        fx.enable_points().await;
        let member = fx.add_member("Siti").await;
        let minyak = fx
            .add_product_in(&fx.branch.id, "Minyak 2L", None, 40_000, Some(36_000), 20)
            .await;
        let teh = fx.add_product("Teh Celup", 10_000, 20).await;

        // 4 × 36_000 member price = 144_000 → 14 points.
        let mut first = request(&fx, vec![(&minyak.id, 4)]);
        first.member_id = Some(member.id.clone());
        let receipt = fx.db.checkout().checkout(&first).await.unwrap();
        assert_eq!(receipt.plan.subtotal.rupiah(), 144_000);
        assert_eq!(receipt.plan.points_earned, 14);
        assert_eq!(fx.db.members().points_balance(&member.id).await.unwrap(), 14);

        // Redeem 5 over 36_000 + 10_000: floor(5×36/46)=3, floor(5×10/46)=1.
        let mut second = request(&fx, vec![(&minyak.id, 1), (&teh.id, 1)]);
        second.member_id = Some(member.id.clone());
        second.points_to_use = 5;
        second.payment_method = PaymentMethod::Qris;
        let receipt = fx.db.checkout().checkout(&second).await.unwrap();

        assert_eq!(receipt.plan.points_redeemed, 5);
        assert_eq!(receipt.plan.discount.rupiah(), 5_000);
        assert_eq!(receipt.plan.total.rupiah(), 41_000);
        assert_eq!(receipt.plan.unallocated_points, 1);
        assert_eq!(receipt.transactions[0].points_used, 3);
        assert_eq!(receipt.transactions[1].points_used, 1);

        let flows: Vec<(CashFlow, i64)> = receipt
            .cash_entries
            .iter()
            .map(|e| (e.flow, e.amount))
            .collect();
        assert_eq!(flows, vec![(CashFlow::Masuk, 41_000), (CashFlow::Keluar, 5_000)]);

        // Line totals 33_000 and 9_000 earn 3 + 0. Only the 4 allocated
        // points are stored on lines, so only those leave the balance.
        assert_eq!(receipt.plan.points_earned, 3);
        assert_eq!(
            fx.db.members().points_balance(&member.id).await.unwrap(),
            14 - 4 + 3
        );
    }

    #[tokio::test]
    async fn test_redemption_rules_enforced() {
        let mut fx = Fixture::new().await;
        fx.enable_points().await;
        let member = fx.add_member("Budi").await;
        let kopi = fx.add_product("Kopi", 20_000, 10).await;

        let mut no_member = request(&fx, vec![(&kopi.id, 1)]);
        no_member.points_to_use = 1;
        let err = fx.db.checkout().checkout(&no_member).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::MemberRequired)));

        let mut broke = request(&fx, vec![(&kopi.id, 1)]);
        broke.member_id = Some(member.id.clone());
        broke.points_to_use = 1;
        let err = fx.db.checkout().checkout(&broke).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientPoints { balance: 0, requested: 1 })
        ));

        assert_eq!(stock_of(&fx, &kopi.id).await, 10);
    }

    #[tokio::test]
    async fn test_empty_cart_and_unknown_member() {
        let fx = Fixture::new().await;
        let err = fx.db.checkout().checkout(&request(&fx, vec![])).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::EmptyCart)));

        let kopi = fx.add_product("Kopi", 20_000, 10).await;
        let mut req = request(&fx, vec![(&kopi.id, 1)]);
        req.member_id = Some(generate_id());
        let err = fx.db.checkout().checkout(&req).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
