//! # Product Repository
//!
//! Database operations for products. Every product row belongs to one
//! branch and carries that branch's stock.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cashier types "kopi" in the catalog box                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  GET /api/branches/{id}/products?q=kopi                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductRepository::search(branch_id, "kopi", 50)                       │
//! │       │   name contains "kopi" (case-insensitive) OR barcode contains   │
//! │       ▼                                                                 │
//! │  Vec<Product> ordered by name                                           │
//! │                                                                         │
//! │  Barcode scanner ──► get_by_barcode(branch_id, "8991002101234")         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use kasir_core::validation::{
    validate_barcode, validate_name, validate_product_prices, validate_search_query,
    validate_stock,
};
use kasir_core::{CoreError, Product};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::generate_id;
use crate::error::{DbError, DbResult};

pub(crate) const PRODUCT_COLUMNS: &str = "id, business_id, branch_id, name, barcode, \
     retail_price, member_price, cost_price, stock, is_active, created_at, updated_at";

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub barcode: Option<String>,
    pub retail_price: i64,
    pub member_price: Option<i64>,
    pub cost_price: Option<i64>,
    #[serde(default)]
    pub stock: i64,
}

/// Input for updating a product. Stock is changed only through
/// [`ProductRepository::adjust_stock`], sales, returns and transfers.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    pub barcode: Option<String>,
    pub retail_price: i64,
    pub member_price: Option<i64>,
    pub cost_price: Option<i64>,
}

/// Trims the barcode, treating blank as absent.
fn normalize_barcode(barcode: Option<&str>) -> DbResult<Option<String>> {
    match barcode.map(str::trim).filter(|b| !b.is_empty()) {
        Some(code) => {
            validate_barcode(code)?;
            Ok(Some(code.to_string()))
        }
        None => Ok(None),
    }
}

fn map_barcode_conflict(err: sqlx::Error, barcode: &Option<String>) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => {
            DbError::duplicate("barcode", barcode.clone().unwrap_or_default())
        }
        other => other,
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product in a branch.
    pub async fn create(
        &self,
        business_id: &str,
        branch_id: &str,
        input: &NewProduct,
    ) -> DbResult<Product> {
        let name = validate_name(&input.name)?;
        let barcode = normalize_barcode(input.barcode.as_deref())?;
        validate_product_prices(input.retail_price, input.member_price, input.cost_price)?;
        validate_stock(input.stock)?;

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            business_id: business_id.to_string(),
            branch_id: branch_id.to_string(),
            name,
            barcode,
            retail_price: input.retail_price,
            member_price: input.member_price,
            cost_price: input.cost_price,
            stock: input.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, branch_id = %branch_id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, business_id, branch_id, name, barcode,
                retail_price, member_price, cost_price, stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.business_id)
        .bind(&product.branch_id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(product.retail_price)
        .bind(product.member_price)
        .bind(product.cost_price)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_barcode_conflict(e, &product.barcode))?;

        Ok(product)
    }

    /// Gets a product by its ID (active or not).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Looks up an active product by barcode within a branch.
    pub async fn get_by_barcode(&self, branch_id: &str, barcode: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_barcode(&mut conn, branch_id, barcode.trim()).await
    }

    /// Searches active products of a branch by name or barcode substring.
    /// An empty query lists the branch's active products.
    pub async fn search(&self, branch_id: &str, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?.to_lowercase();

        debug!(branch_id = %branch_id, query = %query, limit, "Searching products");

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE branch_id = ?1
              AND is_active = 1
              AND (?2 = '' OR instr(lower(name), ?2) > 0 OR instr(lower(barcode), ?2) > 0)
            ORDER BY name
            LIMIT ?3
            "#
        ))
        .bind(branch_id)
        .bind(&query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists every product of a branch, including inactive ones when asked.
    pub async fn list(&self, branch_id: &str, include_inactive: bool) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE branch_id = ?1 AND (?2 OR is_active = 1)
            ORDER BY name
            "#
        ))
        .bind(branch_id)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Replaces the descriptive fields and prices of a product.
    pub async fn update(&self, id: &str, input: &ProductUpdate) -> DbResult<Product> {
        let name = validate_name(&input.name)?;
        let barcode = normalize_barcode(input.barcode.as_deref())?;
        validate_product_prices(input.retail_price, input.member_price, input.cost_price)?;

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                barcode = ?3,
                retail_price = ?4,
                member_price = ?5,
                cost_price = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(&barcode)
        .bind(input.retail_price)
        .bind(input.member_price)
        .bind(input.cost_price)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| map_barcode_conflict(e, &barcode))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Manual stock correction (stock opname). `delta` may be negative but
    /// stock never goes below zero.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<Product> {
        debug!(id = %id, delta, "Adjusting stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1 AND stock + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: -delta,
            }
            .into());
        }

        Ok(product)
    }

    /// Soft-deletes a product (history still references it).
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result =
            sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products of a branch.
    pub async fn count(&self, branch_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE branch_id = ?1 AND is_active = 1")
                .bind(branch_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

pub(crate) async fn fetch_by_barcode(
    conn: &mut SqliteConnection,
    branch_id: &str,
    barcode: &str,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE branch_id = ?1 AND barcode = ?2 AND is_active = 1"
    ))
    .bind(branch_id)
    .bind(barcode)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

/// Takes `quantity` from stock only if enough is left. Returns `false` when
/// the guard fails, leaving the row untouched.
pub(crate) async fn take_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Puts `quantity` back into stock.
pub(crate) async fn restock(conn: &mut SqliteConnection, id: &str, quantity: i64) -> DbResult<()> {
    let result = sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::Fixture;

    #[tokio::test]
    async fn test_create_and_search() {
        let fx = Fixture::new().await;
        fx.add_product_in(&fx.branch.id, "Kopi Kapal Api", Some("8991002101234"), 2_500, None, 40)
            .await;
        fx.add_product_in(&fx.branch.id, "Teh Botol Sosro", Some("8996001600146"), 4_000, None, 12)
            .await;
        fx.add_product("Gula Pasir 1kg", 16_000, 8).await;

        let repo = fx.db.products();
        let found = repo.search(&fx.branch.id, "KOPI", 20).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Kopi Kapal Api");

        let by_code = repo.search(&fx.branch.id, "8996001", 20).await.unwrap();
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].name, "Teh Botol Sosro");

        let all = repo.search(&fx.branch.id, "", 20).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(repo.count(&fx.branch.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_barcode_lookup_and_uniqueness_per_branch() {
        let fx = Fixture::new().await;
        let other = fx.add_branch("Cabang Bantul").await;

        fx.add_product_in(&fx.branch.id, "Aqua 600ml", Some("AQ600"), 3_000, None, 10)
            .await;
        // Same barcode in a different branch is allowed.
        fx.add_product_in(&other.id, "Aqua 600ml", Some("AQ600"), 3_000, None, 5)
            .await;

        let repo = fx.db.products();
        let found = repo.get_by_barcode(&other.id, "AQ600").await.unwrap().unwrap();
        assert_eq!(found.stock, 5);

        let err = repo
            .create(
                &fx.business.id,
                &fx.branch.id,
                &NewProduct {
                    name: "Aqua lagi".to_string(),
                    barcode: Some("AQ600".to_string()),
                    retail_price: 3_000,
                    member_price: None,
                    cost_price: None,
                    stock: 0,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "barcode"));
    }

    #[tokio::test]
    async fn test_update_and_soft_delete() {
        let fx = Fixture::new().await;
        let product = fx.add_product("Roti Tawar", 15_000, 6).await;
        let repo = fx.db.products();

        let updated = repo
            .update(
                &product.id,
                &ProductUpdate {
                    name: "Roti Tawar Gandum".to_string(),
                    barcode: Some(" RT-01 ".to_string()),
                    retail_price: 17_000,
                    member_price: Some(16_000),
                    cost_price: Some(12_000),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Roti Tawar Gandum");
        assert_eq!(updated.barcode.as_deref(), Some("RT-01"));
        assert_eq!(updated.stock, 6);

        repo.soft_delete(&product.id).await.unwrap();
        assert!(repo.search(&fx.branch.id, "roti", 10).await.unwrap().is_empty());
        assert_eq!(repo.list(&fx.branch.id, true).await.unwrap().len(), 1);
        assert!(repo.list(&fx.branch.id, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_product_frees_its_barcode() {
        let fx = Fixture::new().await;
        let old = fx
            .add_product_in(&fx.branch.id, "Indomie Goreng", Some("899123"), 3_500, None, 10)
            .await;
        let repo = fx.db.products();
        repo.soft_delete(&old.id).await.unwrap();

        let fresh = fx
            .add_product_in(&fx.branch.id, "Indomie Goreng Jumbo", Some("899123"), 4_500, None, 5)
            .await;

        let found = repo.get_by_barcode(&fx.branch.id, "899123").await.unwrap().unwrap();
        assert_eq!(found.id, fresh.id);
        assert_eq!(repo.list(&fx.branch.id, true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_member_price_above_retail_rejected() {
        let fx = Fixture::new().await;
        let err = fx
            .db
            .products()
            .create(
                &fx.business.id,
                &fx.branch.id,
                &NewProduct {
                    name: "Susu".to_string(),
                    barcode: None,
                    retail_price: 5_000,
                    member_price: Some(6_000),
                    cost_price: None,
                    stock: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_adjust_stock_never_negative() {
        let fx = Fixture::new().await;
        let product = fx.add_product("Minyak Goreng 1L", 18_000, 3).await;
        let repo = fx.db.products();

        assert_eq!(repo.adjust_stock(&product.id, 7).await.unwrap().stock, 10);
        assert_eq!(repo.adjust_stock(&product.id, -4).await.unwrap().stock, 6);

        let err = repo.adjust_stock(&product.id, -7).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 6, requested: 7, .. })
        ));

        let err = repo.adjust_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
