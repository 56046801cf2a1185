//! Stock transfers between branches.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use kasir_core::StockTransfer;
use kasir_db::NewTransfer;
use serde::Deserialize;

use crate::auth::{AuthUser, ManagerUser};
use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new().route("/transfers", get(list_transfers).post(create_transfer))
}

async fn create_transfer(
    State(state): State<SharedState>,
    ManagerUser(auth): ManagerUser,
    ApiJson(input): ApiJson<NewTransfer>,
) -> ApiResult<Json<StockTransfer>> {
    let transfer = state
        .db
        .transfers()
        .transfer(auth.business_id(), &input, Some(auth.user.id.as_str()))
        .await?;
    Ok(Json(transfer))
}

#[derive(Debug, Deserialize)]
struct TransferQuery {
    limit: Option<u32>,
}

async fn list_transfers(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<TransferQuery>,
) -> ApiResult<Json<Vec<StockTransfer>>> {
    let limit = query.limit.unwrap_or(100).min(1000);
    Ok(Json(state.db.transfers().list(auth.business_id(), limit).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use kasir_db::{NewBranch, NewProduct};
    use serde_json::json;

    use crate::services::testing::TestApp;

    fn kopi(stock: i64) -> NewProduct {
        NewProduct {
            name: "Kopi Kapal Api".to_string(),
            barcode: Some("KKA165".to_string()),
            retail_price: 2_500,
            member_price: None,
            cost_price: Some(2_000),
            stock,
        }
    }

    #[tokio::test]
    async fn test_transfer_moves_stock() {
        let app = TestApp::new().await;
        let db = &app.state.db;
        let timur = db
            .branches()
            .create(
                &app.business.id,
                &NewBranch {
                    name: "Cabang Timur".to_string(),
                    address: None,
                    phone: None,
                },
            )
            .await
            .unwrap();
        let source = db
            .products()
            .create(&app.business.id, &app.branch.id, &kopi(20))
            .await
            .unwrap();
        let dest = db
            .products()
            .create(&app.business.id, &timur.id, &kopi(1))
            .await
            .unwrap();

        let token = app.token(&app.admin);
        let (status, transfer) = app
            .send(
                Method::POST,
                "/api/transfers",
                Some(token.as_str()),
                Some(json!({ "from_product_id": source.id, "to_branch_id": timur.id, "quantity": 5 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(transfer["to_product_id"], dest.id.as_str());

        let source = db.products().get_by_id(&source.id).await.unwrap().unwrap();
        let dest = db.products().get_by_id(&dest.id).await.unwrap().unwrap();
        assert_eq!(source.stock, 15);
        assert_eq!(dest.stock, 6);

        let (_, list) = app.send(Method::GET, "/api/transfers", Some(token.as_str()), None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_branch_and_cashier_rejected() {
        let app = TestApp::new().await;
        let source = app
            .state
            .db
            .products()
            .create(&app.business.id, &app.branch.id, &kopi(20))
            .await
            .unwrap();
        let body = json!({ "from_product_id": source.id, "to_branch_id": app.branch.id, "quantity": 1 });

        let cashier = app.token(&app.cashier);
        let (status, _) = app
            .send(Method::POST, "/api/transfers", Some(cashier.as_str()), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let owner = app.token(&app.owner);
        let (status, _) = app
            .send(Method::POST, "/api/transfers", Some(owner.as_str()), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
