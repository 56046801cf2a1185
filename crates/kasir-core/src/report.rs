//! # Reports
//!
//! Aggregation over transaction rows and product stock. Pure functions: the
//! db crate loads the rows for a branch and period, this module folds them.
//!
//! ```text
//! transactions (period, branch) ─┐
//! returns per line              ─┴► summarize_sales() ──► SalesSummary
//! products (branch)             ──► inventory_report() ──► InventoryReport
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentMethod, Product, Transaction, TransactionStatus};

// =============================================================================
// Sales
// =============================================================================

/// Totals for one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentTotal {
    pub payment_method: PaymentMethod,
    pub order_count: i64,
    pub amount: Money,
}

/// Quantity and revenue for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSales {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub revenue: Money,
}

/// Units and refund returned so far on one transaction line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineReturns {
    pub quantity: i64,
    pub refund: Money,
}

/// Sales summary for a branch over a period.
///
/// Lines with status `returned` are left out of every figure except
/// `returned_lines`. Partly returned lines count only what was kept:
/// returned units and refunds come off `items_sold`, `net_sales`, the
/// payment-method amounts and product revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    /// Distinct receipt numbers.
    pub order_count: i64,
    pub items_sold: i64,
    /// Σ subtotal.
    pub gross_sales: Money,
    /// Σ discount (points redeemed on lines).
    pub discounts: Money,
    /// Refunds on lines that are only partly returned.
    pub refunds: Money,
    /// `Σ total − refunds`.
    pub net_sales: Money,
    pub points_redeemed: i64,
    pub points_earned: i64,
    pub returned_lines: i64,
    pub by_payment_method: Vec<PaymentTotal>,
    pub top_products: Vec<ProductSales>,
}

/// Folds transaction rows into a [`SalesSummary`].
///
/// `returns` maps transaction ids to what was returned on them; lines
/// without an entry had no returns. `top_n` bounds `top_products`, ordered
/// by quantity then revenue.
pub fn summarize_sales(
    rows: &[Transaction],
    returns: &HashMap<String, LineReturns>,
    top_n: usize,
) -> SalesSummary {
    let mut receipts: HashSet<&str> = HashSet::new();
    let mut by_method: BTreeMap<&'static str, (PaymentMethod, HashSet<&str>, Money)> =
        BTreeMap::new();
    let mut by_product: BTreeMap<&str, ProductSales> = BTreeMap::new();

    let mut items_sold = 0;
    let mut gross = Money::zero();
    let mut discounts = Money::zero();
    let mut refunds = Money::zero();
    let mut net = Money::zero();
    let mut points_redeemed = 0;
    let mut points_earned = 0;
    let mut returned_lines = 0;

    for row in rows {
        if row.status == TransactionStatus::Returned {
            returned_lines += 1;
            continue;
        }

        let returned = returns.get(&row.id).copied().unwrap_or_default();
        let kept_quantity = row.quantity - returned.quantity;
        let kept_total = row.total_money() - returned.refund;

        receipts.insert(row.receipt_number.as_str());
        items_sold += kept_quantity;
        gross += Money::from_rupiah(row.subtotal);
        discounts += Money::from_rupiah(row.discount);
        refunds += returned.refund;
        net += kept_total;
        points_redeemed += row.points_used;
        points_earned += row.points_earned;

        let method = by_method
            .entry(row.payment_method.as_str())
            .or_insert_with(|| (row.payment_method, HashSet::new(), Money::zero()));
        method.1.insert(row.receipt_number.as_str());
        method.2 += kept_total;

        let product = by_product
            .entry(row.product_id.as_str())
            .or_insert_with(|| ProductSales {
                product_id: row.product_id.clone(),
                product_name: row.product_name.clone(),
                quantity: 0,
                revenue: Money::zero(),
            });
        product.quantity += kept_quantity;
        product.revenue += kept_total;
    }

    let mut top_products: Vec<ProductSales> = by_product.into_values().collect();
    top_products.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then(b.revenue.cmp(&a.revenue))
    });
    top_products.truncate(top_n);

    SalesSummary {
        order_count: receipts.len() as i64,
        items_sold,
        gross_sales: gross,
        discounts,
        refunds,
        net_sales: net,
        points_redeemed,
        points_earned,
        returned_lines,
        by_payment_method: by_method
            .into_values()
            .map(|(payment_method, orders, amount)| PaymentTotal {
                payment_method,
                order_count: orders.len() as i64,
                amount,
            })
            .collect(),
        top_products,
    }
}

// =============================================================================
// Inventory
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryLine {
    pub product_id: String,
    pub name: String,
    pub barcode: Option<String>,
    pub stock: i64,
    pub stock_value: Money,
    pub low_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryReport {
    pub low_stock_threshold: i64,
    pub product_count: i64,
    pub low_stock_count: i64,
    pub total_stock_value: Money,
    pub lines: Vec<InventoryLine>,
}

/// Builds the inventory report for active products. A product is low on
/// stock when `stock <= threshold`.
pub fn inventory_report(products: &[Product], threshold: i64) -> InventoryReport {
    let lines: Vec<InventoryLine> = products
        .iter()
        .filter(|p| p.is_active)
        .map(|p| InventoryLine {
            product_id: p.id.clone(),
            name: p.name.clone(),
            barcode: p.barcode.clone(),
            stock: p.stock,
            stock_value: p.stock_value(),
            low_stock: p.stock <= threshold,
        })
        .collect();

    InventoryReport {
        low_stock_threshold: threshold,
        product_count: lines.len() as i64,
        low_stock_count: lines.iter().filter(|l| l.low_stock).count() as i64,
        total_stock_value: lines.iter().map(|l| l.stock_value).sum(),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(receipt: &str, product: &str, qty: i64, subtotal: i64, discount: i64, method: PaymentMethod) -> Transaction {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            receipt_number: receipt.to_string(),
            business_id: "biz".to_string(),
            branch_id: "br".to_string(),
            product_id: product.to_string(),
            member_id: None,
            cashier_id: "u1".to_string(),
            product_name: format!("Produk {}", product),
            quantity: qty,
            unit_price: subtotal / qty,
            subtotal,
            points_used: discount / 1_000,
            discount,
            total: subtotal - discount,
            points_earned: 0,
            payment_method: method,
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summarize_sales() {
        let mut returned = row("R3", "c", 1, 9_000, 0, PaymentMethod::Cash);
        returned.status = TransactionStatus::Returned;

        let rows = vec![
            row("R1", "a", 2, 20_000, 2_000, PaymentMethod::Cash),
            row("R1", "b", 1, 5_000, 0, PaymentMethod::Cash),
            row("R2", "a", 3, 30_000, 0, PaymentMethod::Qris),
            returned,
        ];

        let summary = summarize_sales(&rows, &HashMap::new(), 10);
        assert_eq!(summary.order_count, 2);
        assert_eq!(summary.items_sold, 6);
        assert_eq!(summary.gross_sales.rupiah(), 55_000);
        assert_eq!(summary.discounts.rupiah(), 2_000);
        assert_eq!(summary.net_sales.rupiah(), 53_000);
        assert_eq!(summary.points_redeemed, 2);
        assert_eq!(summary.returned_lines, 1);

        assert_eq!(summary.by_payment_method.len(), 2);
        let cash = &summary.by_payment_method[0];
        assert_eq!(cash.payment_method, PaymentMethod::Cash);
        assert_eq!(cash.order_count, 1);
        assert_eq!(cash.amount.rupiah(), 23_000);

        assert_eq!(summary.top_products[0].product_id, "a");
        assert_eq!(summary.top_products[0].quantity, 5);
    }

    #[test]
    fn test_partial_return_reduces_net_figures() {
        let sold = row("R1", "a", 3, 30_000, 0, PaymentMethod::Cash);
        let kept = row("R1", "b", 1, 5_000, 0, PaymentMethod::Cash);
        let returns = HashMap::from([(
            sold.id.clone(),
            LineReturns {
                quantity: 2,
                refund: Money::from_rupiah(20_000),
            },
        )]);

        let summary = summarize_sales(&[sold, kept], &returns, 10);
        assert_eq!(summary.items_sold, 2);
        assert_eq!(summary.gross_sales.rupiah(), 35_000);
        assert_eq!(summary.refunds.rupiah(), 20_000);
        assert_eq!(summary.net_sales.rupiah(), 15_000);
        assert_eq!(summary.returned_lines, 0);
        assert_eq!(summary.by_payment_method[0].amount.rupiah(), 15_000);

        let a = summary.top_products.iter().find(|p| p.product_id == "a").unwrap();
        assert_eq!(a.quantity, 1);
        assert_eq!(a.revenue.rupiah(), 10_000);
    }

    #[test]
    fn test_top_products_truncated() {
        let rows = vec![
            row("R1", "a", 1, 1_000, 0, PaymentMethod::Cash),
            row("R1", "b", 4, 4_000, 0, PaymentMethod::Cash),
            row("R1", "c", 2, 2_000, 0, PaymentMethod::Cash),
        ];
        let summary = summarize_sales(&rows, &HashMap::new(), 2);
        let ids: Vec<&str> = summary.top_products.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_empty_period() {
        let summary = summarize_sales(&[], &HashMap::new(), 5);
        assert_eq!(summary.order_count, 0);
        assert_eq!(summary.net_sales, Money::zero());
        assert!(summary.top_products.is_empty());
    }

    #[test]
    fn test_inventory_report_flags_low_stock() {
        let make = |id: &str, stock: i64, active: bool| Product {
            id: id.to_string(),
            business_id: "biz".to_string(),
            branch_id: "br".to_string(),
            name: id.to_string(),
            barcode: None,
            retail_price: 2_000,
            member_price: None,
            cost_price: Some(1_500),
            stock,
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let products = vec![make("a", 5, true), make("b", 6, true), make("c", 0, false)];

        let report = inventory_report(&products, 5);
        assert_eq!(report.product_count, 2);
        assert_eq!(report.low_stock_count, 1);
        assert!(report.lines[0].low_stock);
        assert!(!report.lines[1].low_stock);
        assert_eq!(report.total_stock_value.rupiah(), 16_500);
    }
}
