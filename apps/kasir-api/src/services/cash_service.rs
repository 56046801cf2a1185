//! Cash ledger (kas) endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use kasir_core::CashEntry;
use kasir_db::{CashFilter, CashSummary, NewCashEntry};
use serde::Deserialize;

use super::{resolve_branch, BranchQuery};
use crate::auth::AuthUser;
use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/cash", get(list_entries).post(record_entry))
        .route("/cash/summary", get(summary))
}

#[derive(Debug, Deserialize)]
struct CashQuery {
    branch_id: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<u32>,
}

impl CashQuery {
    fn filter(&self) -> CashFilter {
        CashFilter {
            from: self.from,
            to: self.to,
            limit: self.limit,
        }
    }
}

async fn list_entries(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<CashQuery>,
) -> ApiResult<Json<Vec<CashEntry>>> {
    let branch_id = resolve_branch(&state, &auth, query.branch_id.as_deref()).await?;
    Ok(Json(state.db.cash().list(&branch_id, &query.filter()).await?))
}

async fn summary(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<CashQuery>,
) -> ApiResult<Json<CashSummary>> {
    let branch_id = resolve_branch(&state, &auth, query.branch_id.as_deref()).await?;
    Ok(Json(state.db.cash().summary(&branch_id, &query.filter()).await?))
}

async fn record_entry(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<BranchQuery>,
    ApiJson(input): ApiJson<NewCashEntry>,
) -> ApiResult<Json<CashEntry>> {
    let branch_id = resolve_branch(&state, &auth, query.branch_id.as_deref()).await?;

    let entry = state
        .db
        .cash()
        .record(&branch_id, &input, Some(auth.user.id.as_str()))
        .await?;
    Ok(Json(entry))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::services::testing::TestApp;

    #[tokio::test]
    async fn test_manual_entries_and_summary() {
        let app = TestApp::new().await;
        let token = app.token(&app.cashier);

        for body in [
            json!({ "flow": "masuk", "amount": 200_000, "description": "Modal awal laci" }),
            json!({ "flow": "keluar", "amount": 35_000, "description": "Beli galon" }),
        ] {
            let (status, _) = app.send(Method::POST, "/api/cash", Some(token.as_str()), Some(body)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, summary) = app
            .send(Method::GET, "/api/cash/summary", Some(token.as_str()), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["total_in"], 200_000);
        assert_eq!(summary["total_out"], 35_000);
        assert_eq!(summary["balance"], 165_000);

        let (_, entries) = app.send(Method::GET, "/api/cash", Some(token.as_str()), None).await;
        assert_eq!(entries.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let app = TestApp::new().await;
        let token = app.token(&app.cashier);

        let (status, body) = app
            .send(
                Method::POST,
                "/api/cash",
                Some(token.as_str()),
                Some(json!({ "flow": "keluar", "amount": 0, "description": "Kosong" })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}
