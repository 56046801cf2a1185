//! Loyalty members and their points.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use kasir_core::{Member, Transaction};
use kasir_db::{MemberWithPoints, NewMember};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{AuthUser, ManagerUser};
use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::SharedState;

const HISTORY_LIMIT: u32 = 50;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/members", get(list_members).post(create_member))
        .route(
            "/members/{id}",
            get(get_member).put(update_member).delete(deactivate_member),
        )
        .route("/members/{id}/history", get(history))
}

#[derive(Debug, Default, Deserialize)]
struct MemberSearch {
    #[serde(default)]
    q: String,
}

async fn list_members(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(search): ApiQuery<MemberSearch>,
) -> ApiResult<Json<Vec<MemberWithPoints>>> {
    Ok(Json(state.db.members().list(auth.business_id(), &search.q).await?))
}

async fn get_member(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MemberWithPoints>> {
    state
        .db
        .members()
        .get_with_points(auth.business_id(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Member not found"))
}

async fn create_member(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewMember>,
) -> ApiResult<Json<Member>> {
    Ok(Json(state.db.members().create(auth.business_id(), &input).await?))
}

async fn update_member(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<NewMember>,
) -> ApiResult<Json<Member>> {
    Ok(Json(state.db.members().update(auth.business_id(), &id, &input).await?))
}

async fn deactivate_member(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.members().deactivate(auth.business_id(), &id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Recent purchase lines, with points used and earned per line.
async fn history(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let members = state.db.members();
    members
        .get(auth.business_id(), &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Member not found"))?;

    Ok(Json(members.history(&id, HISTORY_LIMIT).await?))
}
