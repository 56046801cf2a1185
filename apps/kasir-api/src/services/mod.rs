//! HTTP handlers, one module per area. Each module exposes a `router()`
//! that [`crate::build_router`] merges under `/api`.

pub mod attendance_service;
pub mod auth_service;
pub mod cash_service;
pub mod catalog_service;
pub mod config_service;
pub mod health_service;
pub mod member_service;
pub mod report_service;
pub mod sales_service;
pub mod transfer_service;

use kasir_core::Product;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// `?branch_id=` on branch-scoped reads.
#[derive(Debug, Default, Deserialize)]
pub struct BranchQuery {
    pub branch_id: Option<String>,
}

/// Picks the branch a request acts on and checks it belongs to the caller's
/// business.
///
/// Without an explicit id the caller's home branch is used. Cashiers tied to
/// a branch cannot act on another one.
pub(crate) async fn resolve_branch(
    state: &AppState,
    auth: &AuthUser,
    requested: Option<&str>,
) -> ApiResult<String> {
    let home = auth.user.branch_id.as_deref();
    let branch_id = match (requested, home) {
        (Some(wanted), Some(own)) if wanted != own && !auth.user.role.is_manager() => {
            return Err(ApiError::forbidden("Cashiers can only use their own branch"));
        }
        (Some(wanted), _) => wanted,
        (None, Some(own)) => own,
        (None, None) => return Err(ApiError::bad_request("branch_id is required")),
    };

    state
        .db
        .branches()
        .get(auth.business_id(), branch_id)
        .await?
        .filter(|b| b.is_active)
        .ok_or_else(|| ApiError::not_found("Branch not found"))?;

    Ok(branch_id.to_string())
}

/// Loads a product of the caller's business.
pub(crate) async fn load_product(state: &AppState, auth: &AuthUser, id: &str) -> ApiResult<Product> {
    state
        .db
        .products()
        .get_by_id(id)
        .await?
        .filter(|p| p.business_id == auth.business_id())
        .ok_or_else(|| ApiError::not_found("Product not found"))
}

/// Shared setup for handler tests: an in-memory database with one business,
/// branch, owner, admin and cashier, and tokens for each.
#[cfg(test)]
pub(crate) mod testing {
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use kasir_core::{Branch, Business, Role, User};
    use kasir_db::{Database, DbConfig, NewBranch, NewUser};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{build_router, ApiConfig, AppState, SharedState};

    pub const PASSWORD: &str = "rahasia123";

    pub struct TestApp {
        pub state: SharedState,
        pub router: Router,
        pub business: Business,
        pub branch: Branch,
        pub owner: User,
        pub admin: User,
        pub cashier: User,
    }

    impl TestApp {
        pub async fn new() -> Self {
            let db = Database::new(DbConfig::in_memory()).await.unwrap();
            let business = db.businesses().create("Toko Makmur", None, true).await.unwrap();
            let branch = db
                .branches()
                .create(
                    &business.id,
                    &NewBranch {
                        name: "Cabang Pusat".to_string(),
                        address: None,
                        phone: None,
                    },
                )
                .await
                .unwrap();

            let mut users = Vec::new();
            for (email, role, branch_id) in [
                ("owner@makmur.id", Role::Owner, None),
                ("admin@makmur.id", Role::Admin, None),
                ("kasir@makmur.id", Role::Cashier, Some(branch.id.clone())),
            ] {
                let user = db
                    .users()
                    .create(
                        &business.id,
                        &NewUser {
                            name: email.to_string(),
                            email: email.to_string(),
                            password: PASSWORD.to_string(),
                            role,
                            branch_id,
                        },
                    )
                    .await
                    .unwrap();
                users.push(user);
            }
            let cashier = users.pop().unwrap();
            let admin = users.pop().unwrap();
            let owner = users.pop().unwrap();

            let state = AppState::new(db, ApiConfig::for_tests());
            let router = build_router(state.clone());

            TestApp {
                state,
                router,
                business,
                branch,
                owner,
                admin,
                cashier,
            }
        }

        pub fn token(&self, user: &User) -> String {
            self.state.jwt.generate_access_token(user).unwrap()
        }

        /// Sends a request and returns status plus parsed JSON body
        /// (`Value::Null` for an empty body).
        pub async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(json) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }
    }
}
