//! # Error Types
//!
//! Domain-specific error types for kasir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kasir-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kasir-db errors (separate crate)                                      │
//! │  └── DbError          - Database failures (wraps CoreError)            │
//! │                                                                         │
//! │  kasir-api errors (in app)                                             │
//! │  └── ApiError         - What the browser sees (JSON + status)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Browser       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found (or is inactive / in another branch).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete a sale or transfer.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// Re-fetch stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Teh Botol", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI toast: "Stok Teh Botol tinggal 3"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Checkout attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Product is not in the cart.
    #[error("Product {0} not in cart")]
    NotInCart(String),

    /// Points were requested without attaching a member.
    #[error("A member is required to redeem points")]
    MemberRequired,

    /// Member balance does not cover the requested redemption.
    #[error("Insufficient points: balance {balance}, requested {requested}")]
    InsufficientPoints { balance: i64, requested: i64 },

    /// Redemption value would exceed the order subtotal.
    #[error("Redeeming {points} points exceeds the order subtotal of {subtotal}")]
    RedemptionExceedsTotal { points: i64, subtotal: i64 },

    /// Return quantity exceeds what is left on the transaction line.
    #[error("Cannot return {requested}: only {remaining} remaining on this line")]
    ReturnExceedsQuantity { remaining: i64, requested: i64 },

    /// Employee already checked in on this date.
    #[error("Already checked in today")]
    AlreadyCheckedIn,

    /// Check-out without a check-in on this date.
    #[error("Not checked in today")]
    NotCheckedIn,

    /// Employee already checked out on this date.
    #[error("Already checked out today")]
    AlreadyCheckedOut,

    /// An order amount does not fit in rupiah arithmetic.
    #[error("Order amount is too large")]
    AmountOverflow,

    /// Stock transfer between the same branch.
    #[error("Source and destination branch must differ")]
    SameBranchTransfer,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic or write runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Teh Botol".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Teh Botol: available 3, requested 5"
        );

        let err = CoreError::InsufficientPoints {
            balance: 4,
            requested: 10,
        };
        assert_eq!(err.to_string(), "Insufficient points: balance 4, requested 10");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        };
        assert_eq!(err.to_string(), "password must be at least 6 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "barcode".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
