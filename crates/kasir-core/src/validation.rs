//! # Validation Module
//!
//! Input validation utilities for Kasir POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser form                                                  │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: axum handler (Rust)                                          │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (email, barcode per branch)                    │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasir_core::validation::{validate_barcode, validate_quantity};
//!
//! validate_barcode("8991002101234").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_RUPIAH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum password length accepted on create and reset.
pub const MIN_PASSWORD_LENGTH: usize = 6;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field (names, descriptions, reasons).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most `max` characters
///
/// ## Returns
/// The trimmed value.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates an optional free-text field: empty becomes `None`.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => validate_text(field, v, max).map(Some),
        None => Ok(None),
    }
}

/// Validates a product or person name (1..=200 characters).
///
/// ## Example
/// ```rust
/// use kasir_core::validation::validate_name;
///
/// assert!(validate_name("Indomie Goreng").is_ok());
/// assert!(validate_name("   ").is_err());
/// ```
pub fn validate_name(name: &str) -> ValidationResult<String> {
    validate_text("name", name, 200)
}

/// Validates a barcode.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 50,
        });
    }

    if !barcode
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query (may be empty, at most 100 characters).
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates an email address. Deliberately shallow: one `@` with text on
/// both sides and a dot in the domain.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }

    Ok(email)
}

/// Validates a new password.
///
/// ## Rules
/// - At least [`MIN_PASSWORD_LENGTH`] characters
/// - At most 128 characters
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "new_password".to_string(),
        });
    }

    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "new_password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }

    if len > 128 {
        return Err(ValidationError::TooLong {
            field: "new_password".to_string(),
            max: 128,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Item                                                         │
/// │                                                                         │
/// │  Cashier enters quantity: 5                                             │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       │                                                                 │
/// │       └── OK → Proceed with checkout                                    │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in rupiah: `0..=MAX_PRICE_RUPIAH`. Zero is allowed
/// (free items).
///
/// ## Example
/// ```rust
/// use kasir_core::validation::validate_price;
///
/// assert!(validate_price("retail_price", 3_500).is_ok());
/// assert!(validate_price("retail_price", 0).is_ok());
/// assert!(validate_price("retail_price", -100).is_err());
/// assert!(validate_price("retail_price", i64::MAX / 2).is_err());
/// ```
pub fn validate_price(field: &str, rupiah: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_RUPIAH).contains(&rupiah) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_RUPIAH,
        });
    }

    Ok(())
}

/// Validates the price set of a product: all within range, member price not
/// above retail.
pub fn validate_product_prices(
    retail_price: i64,
    member_price: Option<i64>,
    cost_price: Option<i64>,
) -> ValidationResult<()> {
    validate_price("retail_price", retail_price)?;
    if let Some(cost) = cost_price {
        validate_price("cost_price", cost)?;
    }
    if let Some(member) = member_price {
        validate_price("member_price", member)?;
        if member > retail_price {
            return Err(ValidationError::OutOfRange {
                field: "member_price".to_string(),
                min: 0,
                max: retail_price,
            });
        }
    }
    Ok(())
}

/// Validates a stock level (>= 0).
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a ledger amount (> 0).
pub fn validate_amount(rupiah: i64) -> ValidationResult<()> {
    if rupiah <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a requested points redemption (>= 0).
pub fn validate_points(points: i64) -> ValidationResult<()> {
    if points < 0 {
        return Err(ValidationError::OutOfRange {
            field: "points_to_use".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size before adding another distinct line.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use kasir_core::validation::validate_uuid;
///
/// assert!(validate_uuid("user_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("user_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
