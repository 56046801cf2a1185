//! # User Repository
//!
//! Employee accounts and password hashing.
//!
//! ```text
//! create(NewUser) ──► validate ──► argon2 hash ──► INSERT users
//! authenticate(email, password) ──► SELECT by email ──► argon2 verify
//! set_password(id, new) ──► validate ──► argon2 hash ──► UPDATE users
//! ```
//!
//! Hashes are PHC strings (`$argon2id$v=19$...`) and never leave this
//! module: every query that returns a [`User`] omits `password_hash`.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use kasir_core::validation::{validate_email, validate_name, validate_password};
use kasir_core::{Role, User};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::generate_id;
use crate::error::{DbError, DbResult};

const USER_COLUMNS: &str =
    "id, business_id, branch_id, name, email, role, is_active, created_at, updated_at";

/// Input for creating an employee account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub branch_id: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UserCredentials {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

/// Hashes a password for storage (argon2id, random salt).
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Repository for employee accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account. Email is normalised to lowercase and must be
    /// unique across all businesses.
    pub async fn create(&self, business_id: &str, input: &NewUser) -> DbResult<User> {
        let name = validate_name(&input.name)?;
        let email = validate_email(&input.email)?;
        validate_password(&input.password)?;

        let now = Utc::now();
        let user = User {
            id: generate_id(),
            business_id: business_id.to_string(),
            branch_id: input.branch_id.clone(),
            name,
            email,
            role: input.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let password_hash = hash_password(&input.password)?;
        self.insert(&user, &password_hash).await?;

        info!(user_id = %user.id, role = ?user.role, "User created");
        Ok(user)
    }

    /// Inserts a prepared user row with an already-computed hash.
    pub(crate) async fn insert(&self, user: &User, password_hash: &str) -> DbResult<()> {
        debug!(id = %user.id, email = %user.email, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, business_id, branch_id, name, email, password_hash,
                role, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&user.id)
        .bind(&user.business_id)
        .bind(&user.branch_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(password_hash)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("email", &user.email),
            other => other,
        })?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Lists the employees of a business.
    pub async fn list(&self, business_id: &str) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE business_id = ?1 ORDER BY name"
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Checks credentials. Returns `None` for an unknown email, a wrong
    /// password, or a deactivated account.
    pub async fn authenticate(&self, email: &str, password: &str) -> DbResult<Option<User>> {
        let email = email.trim().to_lowercase();

        let row = sqlx::query_as::<_, UserCredentials>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"
        ))
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(creds) if creds.user.is_active && verify_password(password, &creds.password_hash) => {
                Ok(Some(creds.user))
            }
            _ => {
                debug!(email = %email, "Authentication failed");
                Ok(None)
            }
        }
    }

    /// Replaces a user's password.
    pub async fn set_password(&self, id: &str, new_password: &str) -> DbResult<()> {
        validate_password(new_password)?;
        let password_hash = hash_password(new_password)?;

        let result =
            sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(&password_hash)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = %id, "Password updated");
        Ok(())
    }

    /// Activates or deactivates an account within a business.
    pub async fn set_active(&self, business_id: &str, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE users SET is_active = ?3, updated_at = ?4 WHERE id = ?1 AND business_id = ?2",
        )
        .bind(id)
        .bind(business_id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }
}
