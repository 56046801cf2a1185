//! # kasir-core: Pure Business Logic for Kasir POS
//!
//! This crate is the **heart** of Kasir POS. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web UI (browser)                             │   │
//! │  │    Catalog ──► Cart ──► Payment ──► Receipt / Reports          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kasir-api (axum handlers)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kasir-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │   cart   │ │ points │ │ report  │  │   │
//! │  │   │ Product │ │  Money  │ │ checkout │ │ alloc  │ │ summary │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kasir-db (Database Layer)                    │   │
//! │  │          SQLite queries, migrations, atomic executors           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Business, Branch, Product, Transaction, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Cart keyed by product id
//! - [`checkout`] - Checkout planning: stock check, line pricing, ledger rows
//! - [`points`] - Loyalty points redemption and earning rules
//! - [`returns`] - Refund math for returned lines
//! - [`report`] - Sales and inventory aggregation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use kasir_core::money::Money;
//! use kasir_core::points::{allocate_points, redemption_value};
//!
//! let lines = [Money::from_rupiah(30_000), Money::from_rupiah(10_000)];
//! let allocation = allocate_points(&lines, 3);
//! assert_eq!(allocation, vec![2, 0]);
//! assert_eq!(redemption_value(3), Money::from_rupiah(3_000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod points;
pub mod report;
pub mod returns;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in a cart.
///
/// Guards against typing 1000 instead of 10 at the register.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price (in rupiah) a product may carry.
///
/// Keeps `price × MAX_ITEM_QUANTITY × MAX_CART_ITEMS` well inside `i64`.
pub const MAX_PRICE_RUPIAH: i64 = 1_000_000_000;

/// Rupiah value of one loyalty point when redeemed.
pub const POINT_VALUE_RUPIAH: i64 = 1_000;

/// Spend (in rupiah, after discount) required to earn one point.
pub const POINT_EARN_STEP_RUPIAH: i64 = 10_000;

/// Default stock level at or below which a product is reported as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;
