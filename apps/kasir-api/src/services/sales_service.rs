//! Checkout, sales history and returns.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use kasir_core::checkout::CheckoutLine;
use kasir_core::{PaymentMethod, ProductReturn, Transaction};
use kasir_db::{CheckoutReceipt, CheckoutRequest, NewReturn, ReturnReceipt, TransactionFilter};
use serde::Deserialize;
use tracing::info;

use super::resolve_branch;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::SharedState;

const DEFAULT_RETURN_LIMIT: u32 = 100;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/transactions", get(list_transactions))
        .route("/transactions/receipt/{receipt}", get(get_receipt))
        .route("/returns", get(list_returns).post(create_return))
}

/// Cart as sent by the register. Business and cashier come from the token.
#[derive(Debug, Deserialize)]
struct CheckoutBody {
    branch_id: Option<String>,
    member_id: Option<String>,
    payment_method: PaymentMethod,
    #[serde(default)]
    points_to_use: i64,
    lines: Vec<CheckoutLine>,
}

async fn checkout(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> ApiResult<Json<CheckoutReceipt>> {
    let branch_id = resolve_branch(&state, &auth, body.branch_id.as_deref()).await?;

    let request = CheckoutRequest {
        business_id: auth.business_id().to_string(),
        branch_id,
        cashier_id: auth.user.id.clone(),
        member_id: body.member_id.filter(|m| !m.trim().is_empty()),
        payment_method: body.payment_method,
        points_to_use: body.points_to_use,
        lines: body.lines,
    };

    let receipt = state.db.checkout().checkout(&request).await?;
    info!(
        receipt = %receipt.receipt_number,
        cashier = %auth.user.id,
        total = receipt.plan.total.rupiah(),
        "Checkout served"
    );
    Ok(Json(receipt))
}

#[derive(Debug, Deserialize)]
struct TransactionQuery {
    branch_id: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<u32>,
}

async fn list_transactions(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let branch_id = resolve_branch(&state, &auth, query.branch_id.as_deref()).await?;
    let filter = TransactionFilter {
        from: query.from,
        to: query.to,
        limit: query.limit,
    };
    Ok(Json(state.db.transactions().list(&branch_id, &filter).await?))
}

/// All lines of one receipt, for reprinting.
async fn get_receipt(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(receipt): Path<String>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let lines: Vec<Transaction> = state
        .db
        .transactions()
        .list_by_receipt(&receipt)
        .await?
        .into_iter()
        .filter(|t| t.business_id == auth.business_id())
        .collect();

    let Some(first) = lines.first() else {
        return Err(ApiError::not_found(format!("Receipt {receipt} not found")));
    };
    resolve_branch(&state, &auth, Some(first.branch_id.as_str())).await?;

    Ok(Json(lines))
}

async fn create_return(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewReturn>,
) -> ApiResult<Json<ReturnReceipt>> {
    let line = state
        .db
        .transactions()
        .get_by_id(&input.transaction_id)
        .await?
        .filter(|t| t.business_id == auth.business_id())
        .ok_or_else(|| ApiError::not_found("Transaction not found"))?;
    resolve_branch(&state, &auth, Some(line.branch_id.as_str())).await?;

    let receipt = state
        .db
        .returns()
        .process(auth.business_id(), &input, Some(auth.user.id.as_str()))
        .await?;

    info!(
        transaction_id = %line.id,
        quantity = receipt.record.quantity,
        refund = receipt.record.refund_amount,
        "Return processed"
    );
    Ok(Json(receipt))
}

#[derive(Debug, Deserialize)]
struct ReturnQuery {
    branch_id: Option<String>,
    limit: Option<u32>,
}

async fn list_returns(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ReturnQuery>,
) -> ApiResult<Json<Vec<ProductReturn>>> {
    let branch_id = resolve_branch(&state, &auth, query.branch_id.as_deref()).await?;
    let limit = query.limit.unwrap_or(DEFAULT_RETURN_LIMIT).min(1000);
    Ok(Json(state.db.returns().list(&branch_id, limit).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use kasir_core::Product;
    use kasir_db::NewProduct;
    use serde_json::json;

    use crate::services::testing::TestApp;

    async fn product(app: &TestApp, name: &str, price: i64, stock: i64) -> Product {
        app.state
            .db
            .products()
            .create(
                &app.business.id,
                &app.branch.id,
                &NewProduct {
                    name: name.to_string(),
                    barcode: None,
                    retail_price: price,
                    member_price: None,
                    cost_price: None,
                    stock,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_checkout_decrements_stock_and_books_cash() {
        let app = TestApp::new().await;
        let teh = product(&app, "Teh Botol", 5_000, 10).await;
        let roti = product(&app, "Roti Tawar", 15_000, 4).await;
        let token = app.token(&app.cashier);

        let (status, receipt) = app
            .send(
                Method::POST,
                "/api/checkout",
                Some(token.as_str()),
                Some(json!({
                    "payment_method": "cash",
                    "lines": [
                        { "product_id": teh.id, "quantity": 2 },
                        { "product_id": roti.id, "quantity": 1 }
                    ]
                })),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["plan"]["total"], 25_000);
        assert_eq!(receipt["transactions"].as_array().unwrap().len(), 2);
        assert_eq!(receipt["cash_entries"][0]["flow"], "masuk");
        assert_eq!(receipt["cash_entries"][0]["amount"], 25_000);

        let teh = app.state.db.products().get_by_id(&teh.id).await.unwrap().unwrap();
        assert_eq!(teh.stock, 8);

        let number = receipt["receipt_number"].as_str().unwrap();
        let (status, lines) = app
            .send(
                Method::GET,
                &format!("/api/transactions/receipt/{number}"),
                Some(token.as_str()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lines.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_checkout_over_stock_rejected() {
        let app = TestApp::new().await;
        let gula = product(&app, "Gula 1kg", 16_000, 1).await;
        let token = app.token(&app.cashier);

        let (status, body) = app
            .send(
                Method::POST,
                "/api/checkout",
                Some(token.as_str()),
                Some(json!({
                    "payment_method": "qris",
                    "lines": [{ "product_id": gula.id, "quantity": 3 }]
                })),
            )
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "BUSINESS_RULE");

        let gula = app.state.db.products().get_by_id(&gula.id).await.unwrap().unwrap();
        assert_eq!(gula.stock, 1);
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_rejected() {
        let app = TestApp::new().await;
        let token = app.token(&app.cashier);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/checkout",
                Some(token.as_str()),
                Some(json!({ "payment_method": "cash", "lines": [] })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cashier_cannot_sell_from_other_branch() {
        let app = TestApp::new().await;
        let token = app.token(&app.cashier);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/checkout",
                Some(token.as_str()),
                Some(json!({
                    "branch_id": "some-other-branch",
                    "payment_method": "cash",
                    "lines": [{ "product_id": "p", "quantity": 1 }]
                })),
            )
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_full_return_restocks() {
        let app = TestApp::new().await;
        let susu = product(&app, "Susu UHT", 6_000, 5).await;
        let token = app.token(&app.cashier);

        let (_, receipt) = app
            .send(
                Method::POST,
                "/api/checkout",
                Some(token.as_str()),
                Some(json!({
                    "payment_method": "cash",
                    "lines": [{ "product_id": susu.id, "quantity": 2 }]
                })),
            )
            .await;
        let line_id = receipt["transactions"][0]["id"].as_str().unwrap().to_string();

        let (status, body) = app
            .send(
                Method::POST,
                "/api/returns",
                Some(token.as_str()),
                Some(json!({ "transaction_id": line_id, "quantity": 2, "reason": "Kemasan bocor" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transaction"]["status"], "returned");
        assert_eq!(body["return"]["refund_amount"], 12_000);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/returns",
                Some(token.as_str()),
                Some(json!({ "transaction_id": line_id, "quantity": 1, "reason": "Lagi" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let susu = app.state.db.products().get_by_id(&susu.id).await.unwrap().unwrap();
        assert_eq!(susu.stock, 5);

        let (status, returns) = app.send(Method::GET, "/api/returns", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(returns.as_array().unwrap().len(), 1);
    }
}
