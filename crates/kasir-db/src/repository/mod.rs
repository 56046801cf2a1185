//! # Repository Module
//!
//! Database repository implementations for Kasir POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  axum handler                                                           │
//! │       │  db.products().search(&branch_id, "kopi", 20)                   │
//! │       ▼                                                                 │
//! │  ProductRepository { pool }                                             │
//! │  ├── search / get_by_id / get_by_barcode                                │
//! │  ├── create / update / soft_delete                                      │
//! │  └── adjust_stock                                                       │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Multi-row mutations (checkout, returns, stock transfer) run inside one
//! `sqlx` transaction. Helpers shared between repositories take a
//! `&mut SqliteConnection` so they can run on a pool connection or inside an
//! open transaction alike.
//!
//! ## Available Repositories
//!
//! - [`BusinessRepository`] - Tenant profile and points switch
//! - [`BranchRepository`] - Branch (cabang) CRUD
//! - [`UserRepository`] - Employees, password hashing, authentication
//! - [`ProductRepository`] - Product CRUD, search, stock adjustment
//! - [`MemberRepository`] - Members (pelanggan) and points balance
//! - [`TransactionRepository`] - Sold lines and receipts
//! - [`CashRepository`] - Cash ledger (kas)
//! - [`AttendanceRepository`] - Check-in/out (absensi)
//! - [`ReturnRepository`] - Atomic returns (retur)
//! - [`TransferRepository`] - Atomic stock transfer between branches
//! - [`CheckoutRepository`] - Atomic checkout
//! - [`ReportRepository`] - Sales and inventory reports

pub mod attendance;
pub mod branch;
pub mod business;
pub mod cash;
pub mod checkout;
pub mod member;
pub mod product;
pub mod report;
pub mod returns;
pub mod transaction;
pub mod transfer;
pub mod user;

#[cfg(test)]
pub(crate) mod fixtures;

pub use attendance::AttendanceRepository;
pub use branch::{BranchRepository, NewBranch};
pub use business::BusinessRepository;
pub use cash::{CashFilter, CashRepository, CashSummary, NewCashEntry};
pub use checkout::{CheckoutReceipt, CheckoutRepository, CheckoutRequest};
pub use member::{MemberRepository, MemberWithPoints, NewMember};
pub use product::{NewProduct, ProductRepository, ProductUpdate};
pub use report::ReportRepository;
pub use returns::{NewReturn, ReturnReceipt, ReturnRepository};
pub use transaction::{TransactionFilter, TransactionRepository};
pub use transfer::{NewTransfer, TransferRepository};
pub use user::{hash_password, verify_password, NewUser, UserRepository};

/// Generates a new entity ID.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
