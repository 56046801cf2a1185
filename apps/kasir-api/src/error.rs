//! Error types for the HTTP API.
//!
//! Every failure leaves the server as `{"error": message, "code": CODE}` with
//! the status taken from [`ErrorCode`]. Storage and internal failures are
//! logged and replaced by a generic message.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kasir_core::{CoreError, ValidationError};
use kasir_db::DbError;
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    ValidationError,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    BusinessRule,
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::BusinessRule => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error: what the browser sees.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Logs the detail and hides it from the client.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Internal error");
        Self::new(ErrorCode::Internal, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.code.status(),
            Json(json!({
                "error": self.message,
                "code": self.code,
            })),
        )
            .into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::Validation(_) => ErrorCode::ValidationError,
            CoreError::ProductNotFound(_) => ErrorCode::NotFound,
            CoreError::EmptyCart
            | CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::NotInCart(_)
            | CoreError::MemberRequired
            | CoreError::SameBranchTransfer
            | CoreError::AmountOverflow => ErrorCode::BadRequest,
            CoreError::InsufficientStock { .. }
            | CoreError::InsufficientPoints { .. }
            | CoreError::RedemptionExceedsTotal { .. }
            | CoreError::ReturnExceedsQuantity { .. }
            | CoreError::AlreadyCheckedIn
            | CoreError::NotCheckedIn
            | CoreError::AlreadyCheckedOut => ErrorCode::BusinessRule,
        };
        let message = match err {
            CoreError::Validation(inner) => inner.to_string(),
            other => other.to_string(),
        };
        ApiError::new(code, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::new(ErrorCode::ValidationError, err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => core.into(),
            DbError::NotFound { entity, .. } => ApiError::not_found(format!("{entity} not found")),
            DbError::UniqueViolation { field, value } => {
                ApiError::new(ErrorCode::Conflict, format!("{field} '{value}' is already in use"))
            }
            DbError::ForeignKeyViolation { .. } => {
                ApiError::bad_request("Referenced record does not exist")
            }
            other => ApiError::internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// JSON body extractor that rejects with the API error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor that rejects with the API error body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
