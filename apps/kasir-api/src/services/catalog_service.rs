//! Product catalog: search, barcode lookup, maintenance and stock opname.

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use kasir_core::Product;
use kasir_db::{NewProduct, ProductUpdate};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{load_product, resolve_branch, BranchQuery};
use crate::auth::{AuthUser, ManagerUser};
use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::SharedState;

const DEFAULT_SEARCH_LIMIT: u32 = 50;
const MAX_SEARCH_LIMIT: u32 = 500;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/products", get(search_products).post(create_product))
        .route("/products/barcode/{code}", get(find_by_barcode))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/products/{id}/stock", post(adjust_stock))
}

#[derive(Debug, Deserialize)]
struct ProductSearch {
    branch_id: Option<String>,
    #[serde(default)]
    q: String,
    limit: Option<u32>,
}

async fn search_products(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(search): ApiQuery<ProductSearch>,
) -> ApiResult<Json<Vec<Product>>> {
    let branch_id = resolve_branch(&state, &auth, search.branch_id.as_deref()).await?;
    let limit = search
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let products = state.db.products().search(&branch_id, &search.q, limit).await?;
    Ok(Json(products))
}

async fn find_by_barcode(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(code): Path<String>,
    ApiQuery(query): ApiQuery<BranchQuery>,
) -> ApiResult<Json<Product>> {
    let branch_id = resolve_branch(&state, &auth, query.branch_id.as_deref()).await?;

    state
        .db
        .products()
        .get_by_barcode(&branch_id, &code)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No product with barcode {code}")))
}

async fn create_product(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    ApiQuery(query): ApiQuery<BranchQuery>,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<Json<Product>> {
    let branch_id = resolve_branch(&state, &auth, query.branch_id.as_deref()).await?;

    let product = state
        .db
        .products()
        .create(auth.business_id(), &branch_id, &input)
        .await?;

    info!(product_id = %product.id, branch_id = %branch_id, "Product created");
    Ok(Json(product))
}

async fn update_product(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    let product = load_product(&state, &auth, &id).await?;
    Ok(Json(state.db.products().update(&product.id, &input).await?))
}

async fn delete_product(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let product = load_product(&state, &auth, &id).await?;
    state.db.products().soft_delete(&product.id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct StockAdjustment {
    delta: i64,
}

/// Manual correction after a physical count.
async fn adjust_stock(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    Path(id): Path<String>,
    ApiJson(adjustment): ApiJson<StockAdjustment>,
) -> ApiResult<Json<Product>> {
    let product = load_product(&state, &auth, &id).await?;

    let product = state
        .db
        .products()
        .adjust_stock(&product.id, adjustment.delta)
        .await?;

    info!(product_id = %product.id, delta = adjustment.delta, stock = product.stock, "Stock adjusted");
    Ok(Json(product))
}
