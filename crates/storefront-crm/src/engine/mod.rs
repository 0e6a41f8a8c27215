//! Customer value analysis and targeted dispatch.
//!
//! Leaves first: `rfm` scores and classifies, `customers` persists the resulting segment,
//! `campaigns` selects audiences from it and dispatches messages. `loyalty` and `coupons` are
//! independent of the scoring pipeline and are driven by checkout and admin flows.

pub mod campaigns;
pub mod coupons;
pub mod customers;
pub mod loyalty;
pub mod memory;
pub mod rfm;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failure classes shared by every engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    InsufficientBalance,
    ExternalService,
    Internal,
}

impl ErrorKind {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InsufficientBalance => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ExternalService => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InsufficientBalance => "insufficient_balance",
            Self::ExternalService => "external_service_failure",
            Self::Internal => "internal",
        }
    }
}

/// Storage failure reported by any of the engine's persistence collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    /// Duplicate key, or a conditional update whose condition no longer held.
    #[error("record already exists or was changed concurrently")]
    Conflict,
    #[error("insufficient balance: {available} point(s) available")]
    InsufficientBalance { available: i64 },
    #[error("value out of range")]
    OutOfRange,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Renders an engine error as the JSON body routers return.
pub(crate) fn error_response(kind: ErrorKind, message: String) -> Response {
    let payload = json!({
        "error": message,
        "kind": kind.label(),
    });
    (kind.status(), Json(payload)).into_response()
}
