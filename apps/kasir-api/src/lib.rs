//! # Kasir API
//!
//! JSON HTTP server for the Kasir POS browser UI.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Kasir API Services                            │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  auth_service  │  │ sales_service  │  │  config_service            ││
//! │  │                │  │                │  │                            ││
//! │  │ • login / me   │  │ • checkout     │  │ • business settings        ││
//! │  │ • reset pass   │  │ • transactions │  │ • branches                 ││
//! │  │ • users        │  │ • returns      │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │catalog_service │  │ member_service │  │ cash / attendance /        ││
//! │  │ • products     │  │ • members      │  │ transfer / report services ││
//! │  │ • stock        │  │ • points       │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Infrastructure: kasir-db (SQLite) • JWT auth • tracing          │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `KASIR_HTTP_PORT` - listen port (default: 8080)
//! - `KASIR_DB_PATH` - SQLite file (default: ./kasir.db)
//! - `KASIR_DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_ACCESS_LIFETIME_SECS` - Access token lifetime (default: 43200)
//! - `KASIR_CORS_ORIGIN` - allowed browser origin (default: any)
//! - `KASIR_LOW_STOCK_THRESHOLD` - inventory report threshold (default: 5)

pub mod auth;
pub mod config;
pub mod error;
pub mod services;

use std::sync::Arc;

use axum::Router;
use kasir_db::Database;

// Re-exports
pub use auth::{AuthUser, JwtManager, ManagerUser};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub config: ApiConfig,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> SharedState {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs);
        Arc::new(AppState { db, jwt, config })
    }
}

/// Builds the full router: `/health` plus everything under `/api`.
pub fn build_router(state: SharedState) -> Router {
    let api = Router::new()
        .merge(services::auth_service::router())
        .merge(services::config_service::router())
        .merge(services::catalog_service::router())
        .merge(services::sales_service::router())
        .merge(services::member_service::router())
        .merge(services::cash_service::router())
        .merge(services::attendance_service::router())
        .merge(services::transfer_service::router())
        .merge(services::report_service::router());

    Router::new()
        .merge(services::health_service::router())
        .nest("/api", api)
        .with_state(state)
}
