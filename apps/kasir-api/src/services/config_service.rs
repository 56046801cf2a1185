//! Business profile, points switch and branches.

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use kasir_core::validation::{validate_name, validate_optional_text};
use kasir_core::{Branch, Business};
use kasir_db::NewBranch;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{AuthUser, ManagerUser};
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/business", get(get_business).put(update_business))
        .route("/branches", get(list_branches).post(create_branch))
        .route("/branches/{id}", put(update_branch).delete(deactivate_branch))
}

async fn get_business(State(state): State<SharedState>, auth: AuthUser) -> ApiResult<Json<Business>> {
    let business = state
        .db
        .businesses()
        .get_by_id(auth.business_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Business not found"))?;
    Ok(Json(business))
}

/// Partial update: absent fields stay as they are.
#[derive(Debug, Deserialize)]
struct BusinessUpdate {
    name: Option<String>,
    owner_name: Option<String>,
    points_enabled: Option<bool>,
}

async fn update_business(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    ApiJson(update): ApiJson<BusinessUpdate>,
) -> ApiResult<Json<Business>> {
    let businesses = state.db.businesses();

    let mut business = businesses
        .get_by_id(auth.business_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Business not found"))?;

    if update.name.is_some() || update.owner_name.is_some() {
        let name = match update.name.as_deref() {
            Some(name) => validate_name(name)?,
            None => business.name.clone(),
        };
        let owner_name = match update.owner_name.as_deref() {
            Some(owner) => validate_optional_text("owner_name", Some(owner), 200)?,
            None => business.owner_name.clone(),
        };
        business = businesses
            .update_profile(&business.id, &name, owner_name.as_deref())
            .await?;
    }

    if let Some(enabled) = update.points_enabled {
        if enabled != business.points_enabled {
            business = businesses.set_points_enabled(&business.id, enabled).await?;
        }
    }

    Ok(Json(business))
}

async fn list_branches(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Branch>>> {
    Ok(Json(state.db.branches().list(auth.business_id()).await?))
}

async fn create_branch(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    ApiJson(input): ApiJson<NewBranch>,
) -> ApiResult<Json<Branch>> {
    Ok(Json(state.db.branches().create(auth.business_id(), &input).await?))
}

async fn update_branch(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<NewBranch>,
) -> ApiResult<Json<Branch>> {
    Ok(Json(state.db.branches().update(auth.business_id(), &id, &input).await?))
}

async fn deactivate_branch(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.branches().deactivate(auth.business_id(), &id).await?;
    Ok(Json(json!({ "success": true })))
}
