//! Sales and inventory reports.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use kasir_core::report::{InventoryReport, SalesSummary};
use serde::Deserialize;

use super::resolve_branch;
use crate::auth::{AuthUser, ManagerUser};
use crate::error::{ApiQuery, ApiResult};
use crate::SharedState;

const DEFAULT_TOP_PRODUCTS: usize = 10;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/reports/sales", get(sales))
        .route("/reports/inventory", get(inventory))
}

#[derive(Debug, Deserialize)]
struct SalesQuery {
    branch_id: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    top: Option<usize>,
}

async fn sales(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    ApiQuery(query): ApiQuery<SalesQuery>,
) -> ApiResult<Json<SalesSummary>> {
    let branch_id = resolve_branch(&state, &auth, query.branch_id.as_deref()).await?;
    let top = query.top.unwrap_or(DEFAULT_TOP_PRODUCTS).min(100);

    let summary = state
        .db
        .reports()
        .sales_summary(&branch_id, query.from, query.to, top)
        .await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct InventoryQuery {
    branch_id: Option<String>,
    threshold: Option<i64>,
}

async fn inventory(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<InventoryQuery>,
) -> ApiResult<Json<InventoryReport>> {
    let branch_id = resolve_branch(&state, &auth, query.branch_id.as_deref()).await?;
    let threshold = query
        .threshold
        .unwrap_or(state.config.low_stock_threshold)
        .max(0);

    Ok(Json(state.db.reports().inventory(&branch_id, threshold).await?))
}
