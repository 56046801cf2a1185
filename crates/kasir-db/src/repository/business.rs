//! # Business Repository
//!
//! The tenant profile, including the loyalty-points switch read by checkout.

use chrono::Utc;
use kasir_core::Business;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::generate_id;
use crate::error::{DbError, DbResult};

const BUSINESS_COLUMNS: &str = "id, name, owner_name, points_enabled, created_at, updated_at";

/// Repository for business (pelaku usaha) rows.
#[derive(Debug, Clone)]
pub struct BusinessRepository {
    pool: SqlitePool,
}

impl BusinessRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BusinessRepository { pool }
    }

    /// Creates a business with points disabled unless asked otherwise.
    pub async fn create(
        &self,
        name: &str,
        owner_name: Option<&str>,
        points_enabled: bool,
    ) -> DbResult<Business> {
        let now = Utc::now();
        let business = Business {
            id: generate_id(),
            name: name.to_string(),
            owner_name: owner_name.map(str::to_string),
            points_enabled,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %business.id, name = %business.name, "Creating business");

        sqlx::query(
            r#"
            INSERT INTO businesses (id, name, owner_name, points_enabled, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(&business.owner_name)
        .bind(business.points_enabled)
        .bind(business.created_at)
        .bind(business.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(business)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Business>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Updates name and owner. Returns the updated row.
    pub async fn update_profile(
        &self,
        id: &str,
        name: &str,
        owner_name: Option<&str>,
    ) -> DbResult<Business> {
        let result = sqlx::query(
            "UPDATE businesses SET name = ?2, owner_name = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(name)
        .bind(owner_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Business", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Business", id))
    }

    /// Turns the loyalty points feature on or off.
    pub async fn set_points_enabled(&self, id: &str, enabled: bool) -> DbResult<Business> {
        let result = sqlx::query(
            "UPDATE businesses SET points_enabled = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(enabled)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Business", id));
        }

        info!(business_id = %id, enabled, "Points feature toggled");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Business", id))
    }
}

/// Loads a business on an existing connection or transaction.
pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Business>> {
    let business = sqlx::query_as::<_, Business>(&format!(
        "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(business)
}
