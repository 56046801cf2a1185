//! # kasir-db: Database Layer for Kasir POS
//!
//! SQLite access for Kasir POS through sqlx: pool setup, embedded
//! migrations, repositories and the atomic executors for checkout, returns
//! and stock transfers.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Data Flow                              │
//! │                                                                         │
//! │  axum handler (POST /api/checkout)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kasir-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │   │   │
//! │  │   │               │    │ Product/Member │   │              │   │   │
//! │  │   │ SqlitePool    │◄───│ Checkout       │   │ 001_initial  │   │   │
//! │  │   │ WAL, FK on    │    │ Return/Transfer│   │ _schema.sql  │   │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (kasir.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per table, plus the checkout executor
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kasir_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("kasir.db")).await?;
//! let products = db.products().search(&branch_id, "kopi", 20).await?;
//! let receipt = db.checkout().checkout(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    hash_password, verify_password, AttendanceRepository, BranchRepository, BusinessRepository,
    CashFilter, CashRepository, CashSummary, CheckoutReceipt, CheckoutRepository,
    CheckoutRequest, MemberRepository, MemberWithPoints, NewBranch, NewCashEntry, NewMember,
    NewProduct, NewReturn, NewTransfer, NewUser, ProductRepository, ProductUpdate,
    ReportRepository, ReturnReceipt, ReturnRepository, TransactionFilter, TransactionRepository,
    TransferRepository, UserRepository,
};
