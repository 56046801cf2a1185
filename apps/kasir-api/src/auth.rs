//! JWT authentication module.
//!
//! Handles access token generation and validation, and the [`AuthUser`]
//! extractor every protected handler takes.
//!
//! ## Request Flow
//! ```text
//! Authorization: Bearer <jwt>
//!      │
//!      ▼
//! decode + verify (HS256, exp)  ──fail──► 401
//!      │
//!      ▼
//! load user fresh from SQLite   ──gone──► 401
//!      │
//!      ▼
//! user.is_active?               ──no────► 403
//!      │
//!      ▼
//! AuthUser { user, claims }
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use kasir_core::{Role, User};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::SharedState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Business (tenant) the user belongs to
    pub business_id: String,

    /// Role at the time the token was issued
    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, access_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            access_lifetime_secs,
        }
    }

    pub fn access_lifetime_secs(&self) -> i64 {
        self.access_lifetime_secs
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> ApiResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            business_id: user.business_id.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            debug!(error = %e, "Rejected token");
            ApiError::unauthorized("Invalid or expired token")
        })?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The authenticated, active caller of a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub claims: Claims,
}

impl AuthUser {
    pub fn business_id(&self) -> &str {
        &self.user.business_id
    }

    /// Owner or admin, judged on the stored role rather than the token.
    pub fn require_manager(&self) -> ApiResult<()> {
        if self.user.role.is_manager() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Only an owner or admin can do this"))
        }
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

        let claims = state.jwt.validate_token(token)?;

        let user = state
            .db
            .users()
            .get_by_id(&claims.sub)
            .await?
            .filter(|u| u.business_id == claims.business_id)
            .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;

        if !user.is_active {
            return Err(ApiError::forbidden("Account is inactive"));
        }

        Ok(AuthUser { user, claims })
    }
}

/// An authenticated owner or admin.
///
/// Rejects with 403 from the request head, so a cashier never reaches body
/// parsing on manager-only routes.
#[derive(Debug, Clone)]
pub struct ManagerUser(pub AuthUser);

impl FromRequestParts<SharedState> for ManagerUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if let Err(err) = auth.require_manager() {
            warn!(user_id = %auth.user.id, path = %parts.uri.path(), "Manager-only route refused");
            return Err(err);
        }
        Ok(ManagerUser(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: "user-001".to_string(),
            business_id: "biz-001".to_string(),
            branch_id: None,
            name: "Dewi".to_string(),
            email: "dewi@toko.id".to_string(),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret-0123456789".to_string(), 3600);

        let token = manager.generate_access_token(&user(Role::Admin)).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.business_id, "biz-001");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_and_expired_rejected() {
        let issuer = JwtManager::new("test-secret-0123456789".to_string(), 3600);
        let other = JwtManager::new("another-secret-9876543210".to_string(), 3600);
        let token = issuer.generate_access_token(&user(Role::Cashier)).unwrap();
        assert!(other.validate_token(&token).is_err());

        // Past the default 60s leeway.
        let expired = JwtManager::new("test-secret-0123456789".to_string(), -120);
        let token = expired.generate_access_token(&user(Role::Cashier)).unwrap();
        assert!(expired.validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }
}
