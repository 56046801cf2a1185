//! Authentication and employee account endpoints.
//!
//! `POST /api/auth/login` is the only route under `/api` that takes no token.

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use kasir_core::validation::validate_password;
use kasir_core::{Role, User};
use kasir_db::NewUser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::{AuthUser, ManagerUser};
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/reset-password", post(reset_password))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}/active", put(set_user_active))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: i64,
    user: User,
}

async fn login(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state
        .db
        .users()
        .authenticate(&request.email, &request.password)
        .await?
        .ok_or_else(|| {
            warn!(email = %request.email, "Rejected login");
            ApiError::unauthorized("Invalid email or password")
        })?;

    let access_token = state.jwt.generate_access_token(&user)?;
    info!(user_id = %user.id, role = ?user.role, "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.jwt.access_lifetime_secs(),
        user,
    }))
}

async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

#[derive(Debug, Deserialize)]
struct ResetPasswordRequest {
    user_id: String,
    new_password: String,
}

/// Sets another employee's password. Owners and admins only, and only
/// within their own business.
async fn reset_password(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    if request.user_id.trim().is_empty() {
        return Err(ApiError::bad_request("user_id is required"));
    }
    validate_password(&request.new_password)?;

    let target = state
        .db
        .users()
        .get_by_id(&request.user_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Unknown user"))?;

    if target.business_id != auth.business_id() {
        warn!(caller = %auth.user.id, target = %target.id, "Cross-business password reset");
        return Err(ApiError::forbidden("User belongs to another business"));
    }

    state
        .db
        .users()
        .set_password(&target.id, &request.new_password)
        .await?;

    info!(caller = %auth.user.id, target = %target.id, "Password reset");
    Ok(Json(json!({ "success": true })))
}

async fn list_users(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.users().list(auth.business_id()).await?))
}

async fn create_user(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    ApiJson(input): ApiJson<NewUser>,
) -> ApiResult<Json<User>> {
    if input.role == Role::Owner && auth.user.role != Role::Owner {
        return Err(ApiError::forbidden("Only an owner can create another owner"));
    }

    if let Some(branch_id) = input.branch_id.as_deref() {
        state
            .db
            .branches()
            .get(auth.business_id(), branch_id)
            .await?
            .ok_or_else(|| ApiError::bad_request("Unknown branch"))?;
    }

    let user = state.db.users().create(auth.business_id(), &input).await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
struct SetActiveRequest {
    is_active: bool,
}

async fn set_user_active(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<SetActiveRequest>,
) -> ApiResult<Json<Value>> {
    if id == auth.user.id && !request.is_active {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }

    state
        .db
        .users()
        .set_active(auth.business_id(), &id, request.is_active)
        .await?;

    Ok(Json(json!({ "success": true })))
}
