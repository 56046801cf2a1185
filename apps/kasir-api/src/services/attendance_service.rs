//! Employee attendance (absensi).

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use kasir_core::Attendance;
use serde::{Deserialize, Serialize};

use super::{resolve_branch, BranchQuery};
use crate::auth::AuthUser;
use crate::error::{ApiQuery, ApiResult};
use crate::SharedState;

const HISTORY_LIMIT: u32 = 31;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/attendance", get(list_for_day))
        .route("/attendance/me", get(my_history))
        .route("/attendance/check-in", post(check_in))
        .route("/attendance/check-out", post(check_out))
}

/// Attendance row with the derived worked duration.
#[derive(Debug, Serialize)]
struct AttendanceView {
    #[serde(flatten)]
    record: Attendance,
    worked_minutes: Option<i64>,
}

impl From<Attendance> for AttendanceView {
    fn from(record: Attendance) -> Self {
        let worked_minutes = record.worked_minutes();
        AttendanceView {
            record,
            worked_minutes,
        }
    }
}

async fn check_in(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<BranchQuery>,
) -> ApiResult<Json<AttendanceView>> {
    let branch_id = resolve_branch(&state, &auth, query.branch_id.as_deref()).await?;
    let record = state.db.attendance().check_in(&auth.user.id, &branch_id).await?;
    Ok(Json(record.into()))
}

async fn check_out(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> ApiResult<Json<AttendanceView>> {
    let record = state.db.attendance().check_out(&auth.user.id).await?;
    Ok(Json(record.into()))
}

#[derive(Debug, Deserialize)]
struct DayQuery {
    branch_id: Option<String>,
    /// `YYYY-MM-DD`, today (UTC) when absent.
    date: Option<NaiveDate>,
}

async fn list_for_day(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<DayQuery>,
) -> ApiResult<Json<Vec<AttendanceView>>> {
    let branch_id = resolve_branch(&state, &auth, query.branch_id.as_deref()).await?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let rows = state.db.attendance().list(&branch_id, date).await?;
    Ok(Json(rows.into_iter().map(AttendanceView::from).collect()))
}

async fn my_history(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<AttendanceView>>> {
    let rows = state
        .db
        .attendance()
        .list_for_user(&auth.user.id, HISTORY_LIMIT)
        .await?;
    Ok(Json(rows.into_iter().map(AttendanceView::from).collect()))
}
