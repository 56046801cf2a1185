//! # Domain Types
//!
//! Core domain types used throughout Kasir POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Business (tenant)                                                      │
//! │   ├── Branch ──┬── Product (stock lives per branch)                     │
//! │   │            ├── Transaction (one row per cart line)                  │
//! │   │            ├── CashEntry (masuk / keluar)                           │
//! │   │            ├── Attendance (per employee per day)                    │
//! │   │            └── ProductReturn (against a Transaction)                │
//! │   ├── User (owner / admin / cashier)                                    │
//! │   ├── Member (points balance derived from Transactions)                 │
//! │   └── StockTransfer (branch → branch)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary columns are stored as `i64` rupiah; accessors wrap them in
//! [`Money`] for arithmetic.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Business & Branch
// =============================================================================

/// The tenant that owns branches, products, members and employees.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub owner_name: Option<String>,
    /// Loyalty points feature switch. When off, checkout neither redeems
    /// nor awards points.
    pub points_enabled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A physical location of a business.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Branch {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Users
// =============================================================================

/// Employee role within a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Cashier,
}

impl Role {
    /// Owners and admins manage users, settings and catalog.
    pub fn is_manager(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// An employee account. The password hash never leaves the db crate.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub business_id: String,
    /// Home branch; `None` for owners working across branches.
    pub branch_id: Option<String>,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product stocked at one branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub business_id: String,
    pub branch_id: String,
    pub name: String,
    /// EAN/UPC or in-house code; unique within a branch.
    pub barcode: Option<String>,
    /// Price for walk-in customers, in rupiah.
    pub retail_price: i64,
    /// Price for members, in rupiah. Falls back to retail when absent.
    pub member_price: Option<i64>,
    /// Purchase cost, in rupiah (for stock valuation).
    pub cost_price: Option<i64>,
    pub stock: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price charged to the customer.
    pub fn price_for(&self, as_member: bool) -> Money {
        match (as_member, self.member_price) {
            (true, Some(price)) => Money::from_rupiah(price),
            _ => Money::from_rupiah(self.retail_price),
        }
    }

    /// Checks if `quantity` can be taken from current stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    /// Stock value at cost (zero when cost is unknown).
    pub fn stock_value(&self) -> Money {
        Money::from_rupiah(self.cost_price.unwrap_or(0)).multiply_quantity(self.stock)
    }
}

// =============================================================================
// Members
// =============================================================================

/// Membership tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MemberTier {
    #[default]
    Regular,
    Silver,
    Gold,
}

/// An enrolled customer (pelanggan).
///
/// The points balance is not stored here: it is derived from the member's
/// transaction rows (`Σ points_earned − Σ points_used`).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Member {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tier: MemberTier,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Transactions
// =============================================================================

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash (tunai).
    Cash,
    /// Bank transfer.
    Transfer,
    /// QRIS scan.
    Qris,
    /// Debit/credit card on an external terminal.
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Qris => "qris",
            PaymentMethod::Card => "card",
        }
    }
}

/// Lifecycle of a transaction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Completed,
    /// The full quantity has been returned.
    Returned,
}

/// One persisted cart line. All lines of a checkout share `receipt_number`.
///
/// Uses the snapshot pattern: product name and unit price are frozen at the
/// time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub receipt_number: String,
    pub business_id: String,
    pub branch_id: String,
    pub product_id: String,
    pub member_id: Option<String>,
    pub cashier_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: i64,
    /// `unit_price × quantity`.
    pub subtotal: i64,
    /// Points redeemed against this line.
    pub points_used: i64,
    /// `points_used × POINT_VALUE_RUPIAH`.
    pub discount: i64,
    /// `subtotal − discount`.
    pub total: i64,
    pub points_earned: i64,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn total_money(&self) -> Money {
        Money::from_rupiah(self.total)
    }
}

// =============================================================================
// Cash Ledger
// =============================================================================

/// Direction of a cash-ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CashFlow {
    /// Money in.
    Masuk,
    /// Money out.
    Keluar,
}

/// A cash-ledger row (kas) for a branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashEntry {
    pub id: String,
    pub branch_id: String,
    pub flow: CashFlow,
    /// Always positive; the direction is carried by `flow`.
    pub amount: i64,
    pub description: String,
    /// Receipt number for sale/return rows, free text otherwise.
    pub reference: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashEntry {
    /// Amount with sign applied: positive for masuk, negative for keluar.
    pub fn signed_amount(&self) -> Money {
        match self.flow {
            CashFlow::Masuk => Money::from_rupiah(self.amount),
            CashFlow::Keluar => Money::from_rupiah(-self.amount),
        }
    }
}

// =============================================================================
// Attendance
// =============================================================================

/// Daily check-in/out record (absensi).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Attendance {
    pub id: String,
    pub user_id: String,
    pub branch_id: String,
    #[ts(as = "String")]
    pub work_date: NaiveDate,
    #[ts(as = "String")]
    pub check_in_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub check_out_at: Option<DateTime<Utc>>,
}

impl Attendance {
    /// Minutes between check-in and check-out, `None` while still open.
    pub fn worked_minutes(&self) -> Option<i64> {
        self.check_out_at
            .map(|out| (out - self.check_in_at).num_minutes())
    }
}

// =============================================================================
// Returns
// =============================================================================

/// A (partial) return against a transaction line (retur).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductReturn {
    pub id: String,
    pub transaction_id: String,
    pub branch_id: String,
    pub quantity: i64,
    pub reason: String,
    pub refund_amount: i64,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Transfer
// =============================================================================

/// Stock moved from a product in one branch to its counterpart in another.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockTransfer {
    pub id: String,
    pub business_id: String,
    pub from_branch_id: String,
    pub to_branch_id: String,
    pub from_product_id: String,
    pub to_product_id: String,
    pub quantity: i64,
    pub note: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
