//! # Checkout Planning
//!
//! Turns a validated cart into the exact rows a checkout will write. This
//! module decides every number; `kasir-db` only persists the plan inside a
//! single database transaction.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Checkout (one DB transaction)                     │
//! │                                                                         │
//! │  request lines ──► merge_lines() ── duplicates merged, qty/size checks  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  fetch products ──► plan_checkout()                                     │
//! │        │             ├── 1. check_stock()  (any short line rejects all) │
//! │        │             ├── 2. price lines, allocate points per line       │
//! │        │             ├── 3. cash_in (masuk) + optional cash_out (keluar)│
//! │        │             └── 4. stock decrements = line quantities          │
//! │        ▼                                                                │
//! │  CheckoutPlan ──► kasir-db writes transactions, cash entries, stock     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Identities
//! - `subtotal = Σ line.subtotal`
//! - `cash_in = subtotal − points_redeemed × 1000`
//! - `cash_out = points_redeemed × 1000`, present only when points > 0
//! - `Σ line.points_used = points_redeemed − unallocated_points`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::points::{
    allocate_points, effective_redemption, points_earned, redemption_value, validate_redemption,
};
use crate::types::Product;
use crate::validation::{validate_points, validate_quantity};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Inputs
// =============================================================================

/// A requested cart line: product and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutLine {
    pub product_id: String,
    pub quantity: i64,
}

/// Points-related context for one checkout, resolved server-side.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointsContext {
    /// The business's `points_enabled` flag.
    pub enabled: bool,
    /// Whether a member is attached to the sale.
    pub has_member: bool,
    /// Current balance of the attached member (0 without one).
    pub member_balance: i64,
    /// Points the cashier asked to redeem.
    pub requested: i64,
}

// =============================================================================
// Plan
// =============================================================================

/// One priced line of a checkout plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlannedLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    pub points_used: i64,
    pub discount: Money,
    pub total: Money,
    pub points_earned: i64,
}

/// Everything a checkout writes, computed up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutPlan {
    pub lines: Vec<PlannedLine>,
    pub subtotal: Money,
    /// Points taken from the member balance (0 when the feature is off).
    pub points_redeemed: i64,
    /// Rupiah value of the redeemed points.
    pub discount: Money,
    /// Amount the customer pays: `subtotal − discount`.
    pub total: Money,
    /// Cash-ledger masuk amount.
    pub cash_in: Money,
    /// Cash-ledger keluar amount, only when points were redeemed.
    pub cash_out: Option<Money>,
    /// Floor-division remainder not assigned to any line.
    pub unallocated_points: i64,
    pub points_earned: i64,
}

impl CheckoutPlan {
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Validates requested lines and merges duplicate product ids.
///
/// Order of first appearance is kept. Merged quantities are re-checked
/// against the per-line maximum.
pub fn merge_lines(lines: &[CheckoutLine]) -> CoreResult<Vec<CheckoutLine>> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let mut merged: Vec<CheckoutLine> = Vec::with_capacity(lines.len());
    for line in lines {
        validate_quantity(line.quantity)?;
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity += line.quantity;
                if existing.quantity > MAX_ITEM_QUANTITY {
                    return Err(CoreError::QuantityTooLarge {
                        requested: existing.quantity,
                        max: MAX_ITEM_QUANTITY,
                    });
                }
            }
            None => merged.push(line.clone()),
        }
    }

    if merged.len() > MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }

    Ok(merged)
}

/// Rejects the whole checkout if any line wants more than is in stock.
pub fn check_stock(lines: &[(Product, i64)]) -> CoreResult<()> {
    for (product, quantity) in lines {
        if !product.can_sell(*quantity) {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: *quantity,
            });
        }
    }
    Ok(())
}

/// Builds the checkout plan for freshly fetched products.
///
/// `lines` pairs each product (as currently stored) with the requested
/// quantity. Every product must be active and stocked at `branch_id`.
pub fn plan_checkout(
    branch_id: &str,
    lines: &[(Product, i64)],
    points: PointsContext,
) -> CoreResult<CheckoutPlan> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    validate_points(points.requested)?;

    for (product, quantity) in lines {
        if !product.is_active || product.branch_id != branch_id {
            return Err(CoreError::ProductNotFound(product.id.clone()));
        }
        validate_quantity(*quantity)?;
    }

    check_stock(lines)?;

    let as_member = points.has_member;
    let unit_prices: Vec<Money> = lines
        .iter()
        .map(|(product, _)| product.price_for(as_member))
        .collect();
    let subtotals: Vec<Money> = unit_prices
        .iter()
        .zip(lines)
        .map(|(price, (_, qty))| price.checked_mul(*qty).ok_or(CoreError::AmountOverflow))
        .collect::<CoreResult<_>>()?;
    let subtotal = Money::checked_sum(&subtotals).ok_or(CoreError::AmountOverflow)?;

    let redeemed = effective_redemption(points.enabled, points.requested);
    if redeemed > 0 {
        validate_redemption(redeemed, points.has_member, points.member_balance, subtotal)?;
    }

    let allocation = allocate_points(&subtotals, redeemed);
    let earns = points.enabled && points.has_member;

    let planned: Vec<PlannedLine> = lines
        .iter()
        .zip(unit_prices)
        .zip(subtotals)
        .zip(allocation)
        .map(|((((product, quantity), unit_price), line_subtotal), line_points)| {
            let discount = redemption_value(line_points);
            let total = line_subtotal - discount;
            PlannedLine {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity: *quantity,
                unit_price,
                subtotal: line_subtotal,
                points_used: line_points,
                discount,
                total,
                points_earned: if earns { points_earned(total) } else { 0 },
            }
        })
        .collect();

    let allocated: i64 = planned.iter().map(|l| l.points_used).sum();
    let discount = redemption_value(redeemed);
    let total = subtotal - discount;

    Ok(CheckoutPlan {
        points_earned: planned.iter().map(|l| l.points_earned).sum(),
        lines: planned,
        subtotal,
        points_redeemed: redeemed,
        discount,
        total,
        cash_in: total,
        cash_out: (redeemed > 0).then_some(discount),
        unallocated_points: redeemed - allocated,
    })
}

/// Formats a receipt number: `INV-YYYYMMDD-HHMMSS-NNNN`.
///
/// `suffix` disambiguates receipts issued in the same second; only its last
/// four digits are used.
pub fn generate_receipt_number(at: DateTime<Utc>, suffix: u32) -> String {
    format!("INV-{}-{:04}", at.format("%Y%m%d-%H%M%S"), suffix % 10_000)
}

// =============================================================================
// Unit Tests
// =============================================================================
