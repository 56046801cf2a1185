//! # Cart
//!
//! The in-memory shopping cart a cashier builds before checkout.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UI action            Cart method               State change            │
//! │  ─────────            ───────────               ────────────            │
//! │  Scan / tap product ─► add_item() ─────────────► push or qty += n       │
//! │  Change quantity ────► update_quantity() ──────► qty = n (0 removes)    │
//! │  Remove line ────────► remove_item() ──────────► retain(!= id)          │
//! │  Cancel sale ────────► clear() ────────────────► items.clear()          │
//! │  Pay ────────────────► checkout_lines() ──► merge_lines / plan_checkout │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines are unique by product id. Prices are frozen when a line is first
//! added; checkout re-reads them from the database anyway.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::checkout::CheckoutLine;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::{validate_cart_size, validate_quantity};
use crate::MAX_ITEM_QUANTITY;

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    pub product_id: String,
    /// Name at time of adding (frozen).
    pub name: String,
    pub barcode: Option<String>,
    /// Unit price at time of adding (frozen).
    pub unit_price: Money,
    pub quantity: i64,
}

impl CartItem {
    /// Creates a line from a product, picking the member price when asked.
    pub fn from_product(product: &Product, quantity: i64, as_member: bool) -> Self {
        CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            barcode: product.barcode.clone(),
            unit_price: product.price_for(as_member),
            quantity,
        }
    }

    /// Unit price × quantity.
    #[inline]
    pub fn line_subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding the same product merges)
/// - Every quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Cart { items: Vec::new() }
    }

    /// Adds a product, or increases the quantity if it is already present.
    pub fn add_item(&mut self, product: &Product, quantity: i64, as_member: bool) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = new_qty;
            return Ok(());
        }

        if validate_cart_size(self.items.len()).is_err() {
            return Err(CoreError::CartTooLarge {
                max: crate::MAX_CART_ITEMS,
            });
        }

        self.items
            .push(CartItem::from_product(product, quantity, as_member));
        Ok(())
    }

    /// Sets the quantity of a line. Zero removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        validate_quantity(quantity)?;

        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::NotInCart(product_id.to_string())),
        }
    }

    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);

        if self.items.len() == initial_len {
            Err(CoreError::NotInCart(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_subtotal).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The cart as checkout input. Prices are dropped; checkout re-reads them.
    pub fn checkout_lines(&self) -> Vec<CheckoutLine> {
        self.items
            .iter()
            .map(|item| CheckoutLine {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{merge_lines, plan_checkout, PointsContext};
    use chrono::Utc;

    fn test_product(id: &str, retail: i64, member: Option<i64>) -> Product {
        Product {
            id: id.to_string(),
            business_id: "biz".to_string(),
            branch_id: "branch".to_string(),
            name: format!("Produk {}", id),
            barcode: Some(format!("BC-{}", id)),
            retail_price: retail,
            member_price: member,
            cost_price: None,
            stock: 50,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_add_item() {
        let mut cart = Cart::new();
        let product = test_product("1", 3_500, None);

        cart.add_item(&product, 2, false).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.subtotal().rupiah(), 7_000);
    }

    #[test]
    fn test_cart_add_same_product_merges() {
        let mut cart = Cart::new();
        let product = test_product("1", 3_500, None);

        cart.add_item(&product, 2, false).unwrap();
        cart.add_item(&product, 3, false).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_cart_member_price() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 10_000, Some(9_000)), 1, true)
            .unwrap();
        cart.add_item(&test_product("2", 5_000, None), 1, true).unwrap();

        assert_eq!(cart.subtotal().rupiah(), 14_000);
    }

    #[test]
    fn test_cart_quantity_limits() {
        let mut cart = Cart::new();
        let product = test_product("1", 1_000, None);

        assert!(cart.add_item(&product, 0, false).is_err());
        cart.add_item(&product, 990, false).unwrap();
        assert!(matches!(
            cart.add_item(&product, 10, false),
            Err(CoreError::QuantityTooLarge { requested: 1000, .. })
        ));
        assert_eq!(cart.total_quantity(), 990);
    }

    #[test]
    fn test_cart_line_limit() {
        let mut cart = Cart::new();
        for i in 0..crate::MAX_CART_ITEMS {
            cart.add_item(&test_product(&i.to_string(), 1_000, None), 1, false)
                .unwrap();
        }
        let extra = test_product("extra", 1_000, None);
        assert!(matches!(
            cart.add_item(&extra, 1, false),
            Err(CoreError::CartTooLarge { .. })
        ));
    }

    #[test]
    fn test_cart_update_and_remove() {
        let mut cart = Cart::new();
        let product = test_product("1", 2_000, None);
        cart.add_item(&product, 1, false).unwrap();

        cart.update_quantity("1", 4).unwrap();
        assert_eq!(cart.subtotal().rupiah(), 8_000);

        cart.update_quantity("1", 0).unwrap();
        assert!(cart.is_empty());

        assert!(matches!(
            cart.remove_item("1"),
            Err(CoreError::NotInCart(_))
        ));
        assert!(cart.update_quantity("missing", 2).is_err());
    }

    #[test]
    fn test_cart_clear() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 2_000, None), 2, false)
            .unwrap();
        assert!(!cart.is_empty());

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Money::zero());
    }

    #[test]
    fn test_cart_feeds_checkout() {
        let teh = test_product("teh", 5_000, None);
        let roti = test_product("roti", 15_000, Some(14_000));

        let mut cart = Cart::new();
        cart.add_item(&teh, 2, false).unwrap();
        cart.add_item(&roti, 1, false).unwrap();
        cart.add_item(&teh, 1, false).unwrap();

        let lines = merge_lines(&cart.checkout_lines()).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id, "teh");
        assert_eq!(lines[0].quantity, 3);

        let priced: Vec<(Product, i64)> = lines
            .iter()
            .map(|line| {
                let product = if line.product_id == "teh" { teh.clone() } else { roti.clone() };
                (product, line.quantity)
            })
            .collect();
        let plan = plan_checkout("branch", &priced, PointsContext::default()).unwrap();

        assert_eq!(plan.subtotal, cart.subtotal());
        assert_eq!(plan.total_quantity(), cart.total_quantity());
    }
}
