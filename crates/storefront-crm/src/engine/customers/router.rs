use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::domain::CustomerId;
use super::repository::CustomerStore;
use super::service::SegmentationService;
use crate::engine::error_response;

/// Segment recomputation endpoints.
pub fn segmentation_router<S>(service: Arc<SegmentationService<S>>) -> Router
where
    S: CustomerStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/customers/:customer_id/segment",
            post(recompute_handler::<S>),
        )
        .route("/api/v1/segments/recompute", post(recompute_all_handler::<S>))
        .with_state(service)
}

pub(crate) async fn recompute_handler<S>(
    State(service): State<Arc<SegmentationService<S>>>,
    Path(customer_id): Path<String>,
) -> Response
where
    S: CustomerStore + 'static,
{
    match service.recompute(&CustomerId(customer_id)).await {
        Ok(assignment) => (StatusCode::OK, Json(assignment)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

pub(crate) async fn recompute_all_handler<S>(
    State(service): State<Arc<SegmentationService<S>>>,
) -> Response
where
    S: CustomerStore + 'static,
{
    match service.recompute_all().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}
