use crate::config::ConfigError;
use crate::engine::campaigns::CampaignError;
use crate::engine::coupons::CouponError;
use crate::engine::customers::{ImportError, SegmentationError};
use crate::engine::loyalty::LedgerError;
use crate::engine::{ErrorKind, RepositoryError};
use crate::telemetry::TelemetryError;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failure surfaced by the storefront binary: startup, the HTTP listener, a CSV export
/// or one of the CRM services driven from the command line.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("customer export rejected: {0}")]
    Import(#[from] ImportError),
    #[error("segmentation failed: {0}")]
    Segmentation(#[from] SegmentationError),
    #[error("loyalty ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("coupon: {0}")]
    Coupon(#[from] CouponError),
    #[error("campaign: {0}")]
    Campaign(#[from] CampaignError),
    #[error("store: {0}")]
    Repository(#[from] RepositoryError),
}

impl AppError {
    /// Engine failures keep their own classification; process failures are internal
    /// except a malformed export, which is the caller's input.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Import(_) => ErrorKind::InvalidInput,
            AppError::Segmentation(err) => err.kind(),
            AppError::Ledger(err) => err.kind(),
            AppError::Coupon(err) => err.kind(),
            AppError::Campaign(err) => err.kind(),
            AppError::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            AppError::Repository(RepositoryError::Conflict) => ErrorKind::Conflict,
            AppError::Repository(_)
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let body = Json(json!({ "error": self.to_string(), "kind": kind.label() }));
        (kind.status(), body).into_response()
    }
}
