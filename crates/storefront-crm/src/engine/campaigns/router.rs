use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::domain::{CampaignRequest, CampaignTarget};
use super::repository::CampaignStore;
use super::service::CampaignService;
use crate::engine::customers::CustomerStore;
use crate::engine::error_response;

pub fn campaign_router<C, S>(service: Arc<CampaignService<C, S>>) -> Router
where
    C: CampaignStore + 'static,
    S: CustomerStore + 'static,
{
    Router::new()
        .route("/api/v1/campaigns/preview", post(preview_handler::<C, S>))
        .route("/api/v1/campaigns/run", post(run_handler::<C, S>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub target: CampaignTarget,
}

pub(crate) async fn preview_handler<C, S>(
    State(service): State<Arc<CampaignService<C, S>>>,
    Json(request): Json<PreviewRequest>,
) -> Response
where
    C: CampaignStore + 'static,
    S: CustomerStore + 'static,
{
    match service.preview(&request.target).await {
        Ok(preview) => (StatusCode::OK, Json(preview)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

/// Runs to completion; per-recipient delivery failures are part of the 200 report.
pub(crate) async fn run_handler<C, S>(
    State(service): State<Arc<CampaignService<C, S>>>,
    Json(request): Json<CampaignRequest>,
) -> Response
where
    C: CampaignStore + 'static,
    S: CustomerStore + 'static,
{
    match service.run(&request).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}
