//! # Member Repository
//!
//! Members (pelanggan) and their loyalty points.
//!
//! ## Points Balance
//! ```text
//! balance(member) = Σ points_earned  over the member's completed lines
//!                 − Σ points_used    over all of the member's lines
//! ```
//! Nothing is cached on the member row, so the balance can never drift from
//! the transaction history. Earned points on a fully returned line are
//! revoked; points spent on it are not given back (the refund already
//! reflects the discount).

use chrono::Utc;
use kasir_core::validation::{validate_email, validate_name, validate_optional_text};
use kasir_core::{Member, MemberTier, Transaction};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::generate_id;
use super::transaction::TRANSACTION_COLUMNS;
use crate::error::{DbError, DbResult};

const MEMBER_COLUMNS: &str = "id, business_id, name, phone, email, tier, is_active, created_at";

/// Input for enrolling or updating a member.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub tier: MemberTier,
}

impl NewMember {
    fn validated(&self) -> DbResult<NewMember> {
        let email = match self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => Some(validate_email(email)?),
            None => None,
        };
        Ok(NewMember {
            name: validate_name(&self.name)?,
            phone: validate_optional_text("phone", self.phone.as_deref(), 30)?,
            email,
            tier: self.tier,
        })
    }
}

/// A member together with the current points balance.
#[derive(Debug, Clone, Serialize)]
pub struct MemberWithPoints {
    #[serde(flatten)]
    pub member: Member,
    pub points_balance: i64,
}

/// Repository for member rows.
#[derive(Debug, Clone)]
pub struct MemberRepository {
    pool: SqlitePool,
}

impl MemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MemberRepository { pool }
    }

    pub async fn create(&self, business_id: &str, input: &NewMember) -> DbResult<Member> {
        let input = input.validated()?;
        let member = Member {
            id: generate_id(),
            business_id: business_id.to_string(),
            name: input.name,
            phone: input.phone,
            email: input.email,
            tier: input.tier,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %member.id, business_id = %business_id, "Enrolling member");

        sqlx::query(
            r#"
            INSERT INTO members (id, business_id, name, phone, email, tier, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&member.id)
        .bind(&member.business_id)
        .bind(&member.name)
        .bind(&member.phone)
        .bind(&member.email)
        .bind(member.tier)
        .bind(member.is_active)
        .bind(member.created_at)
        .execute(&self.pool)
        .await?;

        Ok(member)
    }

    /// Gets a member of a business.
    pub async fn get(&self, business_id: &str, id: &str) -> DbResult<Option<Member>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in_business(&mut conn, business_id, id).await
    }

    /// Gets a member with the points balance.
    pub async fn get_with_points(
        &self,
        business_id: &str,
        id: &str,
    ) -> DbResult<Option<MemberWithPoints>> {
        let mut conn = self.pool.acquire().await?;
        let Some(member) = fetch_in_business(&mut conn, business_id, id).await? else {
            return Ok(None);
        };
        let points_balance = points_balance(&mut conn, id).await?;
        Ok(Some(MemberWithPoints {
            member,
            points_balance,
        }))
    }

    /// Lists active members, optionally filtered by name or phone substring.
    pub async fn list(&self, business_id: &str, query: &str) -> DbResult<Vec<MemberWithPoints>> {
        let query = query.trim().to_lowercase();

        let members = sqlx::query_as::<_, Member>(&format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM members
            WHERE business_id = ?1
              AND is_active = 1
              AND (?2 = '' OR instr(lower(name), ?2) > 0 OR instr(phone, ?2) > 0)
            ORDER BY name
            "#
        ))
        .bind(business_id)
        .bind(&query)
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        let mut out = Vec::with_capacity(members.len());
        for member in members {
            let points_balance = points_balance(&mut conn, &member.id).await?;
            out.push(MemberWithPoints {
                member,
                points_balance,
            });
        }
        Ok(out)
    }

    pub async fn update(&self, business_id: &str, id: &str, input: &NewMember) -> DbResult<Member> {
        let input = input.validated()?;

        let result = sqlx::query(
            r#"
            UPDATE members SET name = ?3, phone = ?4, email = ?5, tier = ?6
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(input.tier)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Member", id));
        }

        self.get(business_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Member", id))
    }

    pub async fn deactivate(&self, business_id: &str, id: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE members SET is_active = 0 WHERE id = ?1 AND business_id = ?2")
                .bind(id)
                .bind(business_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Member", id));
        }

        Ok(())
    }

    /// Current points balance of a member.
    pub async fn points_balance(&self, member_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        points_balance(&mut conn, member_id).await
    }

    /// Most recent purchase lines of a member.
    pub async fn history(&self, member_id: &str, limit: u32) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE member_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#
        ))
        .bind(member_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

pub(crate) async fn fetch_in_business(
    conn: &mut SqliteConnection,
    business_id: &str,
    id: &str,
) -> DbResult<Option<Member>> {
    let member = sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?1 AND business_id = ?2"
    ))
    .bind(id)
    .bind(business_id)
    .fetch_optional(conn)
    .await?;

    Ok(member)
}

pub(crate) async fn points_balance(conn: &mut SqliteConnection, member_id: &str) -> DbResult<i64> {
    let balance: i64 = sqlx::query_scalar(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN status = 'returned' THEN 0 ELSE points_earned END), 0)
          - COALESCE(SUM(points_used), 0)
        FROM transactions
        WHERE member_id = ?1
        "#,
    )
    .bind(member_id)
    .fetch_one(conn)
    .await?;

    Ok(balance)
}
