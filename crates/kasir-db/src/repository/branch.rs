//! # Branch Repository
//!
//! Branches (cabang) of a business. Products, stock, cash and attendance
//! all hang off a branch.

use chrono::Utc;
use kasir_core::validation::{validate_name, validate_optional_text};
use kasir_core::Branch;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::generate_id;
use crate::error::{DbError, DbResult};

const BRANCH_COLUMNS: &str = "id, business_id, name, address, phone, is_active, created_at";

/// Input for creating or updating a branch.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBranch {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl NewBranch {
    fn validated(&self) -> DbResult<NewBranch> {
        Ok(NewBranch {
            name: validate_name(&self.name)?,
            address: validate_optional_text("address", self.address.as_deref(), 500)?,
            phone: validate_optional_text("phone", self.phone.as_deref(), 30)?,
        })
    }
}

/// Repository for branch rows.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    pub async fn create(&self, business_id: &str, input: &NewBranch) -> DbResult<Branch> {
        let input = input.validated()?;
        let branch = Branch {
            id: generate_id(),
            business_id: business_id.to_string(),
            name: input.name,
            address: input.address,
            phone: input.phone,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %branch.id, business_id = %business_id, "Creating branch");

        sqlx::query(
            r#"
            INSERT INTO branches (id, business_id, name, address, phone, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&branch.id)
        .bind(&branch.business_id)
        .bind(&branch.name)
        .bind(&branch.address)
        .bind(&branch.phone)
        .bind(branch.is_active)
        .bind(branch.created_at)
        .execute(&self.pool)
        .await?;

        Ok(branch)
    }

    /// Lists branches of a business, active first.
    pub async fn list(&self, business_id: &str) -> DbResult<Vec<Branch>> {
        let branches = sqlx::query_as::<_, Branch>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE business_id = ?1 ORDER BY is_active DESC, name"
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(branches)
    }

    /// Gets a branch, scoped to its business.
    pub async fn get(&self, business_id: &str, id: &str) -> DbResult<Option<Branch>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in_business(&mut conn, business_id, id).await
    }

    pub async fn update(&self, business_id: &str, id: &str, input: &NewBranch) -> DbResult<Branch> {
        let input = input.validated()?;

        let result = sqlx::query(
            r#"
            UPDATE branches SET name = ?3, address = ?4, phone = ?5
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.phone)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Branch", id));
        }

        self.get(business_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Branch", id))
    }

    /// Deactivates a branch. History stays.
    pub async fn deactivate(&self, business_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating branch");

        let result =
            sqlx::query("UPDATE branches SET is_active = 0 WHERE id = ?1 AND business_id = ?2")
                .bind(id)
                .bind(business_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Branch", id));
        }

        Ok(())
    }
}

/// Loads a branch of `business_id` on an existing connection.
pub(crate) async fn fetch_in_business(
    conn: &mut SqliteConnection,
    business_id: &str,
    id: &str,
) -> DbResult<Option<Branch>> {
    let branch = sqlx::query_as::<_, Branch>(&format!(
        "SELECT {BRANCH_COLUMNS} FROM branches WHERE id = ?1 AND business_id = ?2"
    ))
    .bind(id)
    .bind(business_id)
    .fetch_optional(conn)
    .await?;

    Ok(branch)
}

/// Loads an active branch of `business_id`, or `NotFound`.
pub(crate) async fn require_active(
    conn: &mut SqliteConnection,
    business_id: &str,
    id: &str,
) -> DbResult<Branch> {
    match fetch_in_business(conn, business_id, id).await? {
        Some(branch) if branch.is_active => Ok(branch),
        _ => Err(DbError::not_found("Branch", id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::Fixture;

    #[tokio::test]
    async fn test_branch_crud() {
        let fx = Fixture::new().await;
        let repo = fx.db.branches();

        let branch = repo
            .create(
                &fx.business.id,
                &NewBranch {
                    name: "  Cabang Sleman ".to_string(),
                    address: Some("Jl. Kaliurang km 7".to_string()),
                    phone: Some("".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(branch.name, "Cabang Sleman");
        assert_eq!(branch.phone, None);

        let all = repo.list(&fx.business.id).await.unwrap();
        assert_eq!(all.len(), 2);

        repo.deactivate(&fx.business.id, &branch.id).await.unwrap();
        let fetched = repo.get(&fx.business.id, &branch.id).await.unwrap().unwrap();
        assert!(!fetched.is_active);
    }

    #[tokio::test]
    async fn test_branch_scoped_to_business() {
        let fx = Fixture::new().await;
        let other = fx.db.businesses().create("Toko Lain", None, false).await.unwrap();

        let found = fx.db.branches().get(&other.id, &fx.branch.id).await.unwrap();
        assert!(found.is_none());

        let err = fx
            .db
            .branches()
            .deactivate(&other.id, &fx.branch.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_branch_name_required() {
        let fx = Fixture::new().await;
        let err = fx
            .db
            .branches()
            .create(
                &fx.business.id,
                &NewBranch {
                    name: " ".to_string(),
                    address: None,
                    phone: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(_)));
    }
}
