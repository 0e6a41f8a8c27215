use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{classify_with_rule, score_customer, CustomerAggregate, RfmScore, Segment};
use crate::engine::error_response;

/// Stateless scoring endpoints.
pub fn rfm_router() -> Router {
    Router::new()
        .route("/api/v1/rfm/score", post(score_handler))
        .route("/api/v1/rfm/classify", post(classify_handler))
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
}

/// Scores plus the segment and the cascade row that selected it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreView {
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
    pub segment: Segment,
    pub segment_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
}

impl ScoreView {
    pub fn from_score(score: RfmScore) -> Self {
        let (segment, rule) = classify_with_rule(&score);
        Self {
            recency: score.recency,
            frequency: score.frequency,
            monetary: score.monetary,
            segment,
            segment_label: segment.label().to_string(),
            matched_rule: rule.map(|rule| rule.condition.to_string()),
        }
    }
}

pub(crate) async fn score_handler(Json(aggregate): Json<CustomerAggregate>) -> Response {
    match score_customer(&aggregate) {
        Ok(score) => (StatusCode::OK, Json(ScoreView::from_score(score))).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

pub(crate) async fn classify_handler(Json(request): Json<ClassifyRequest>) -> Response {
    match RfmScore::new(request.recency, request.frequency, request.monetary) {
        Ok(score) => (StatusCode::OK, Json(ScoreView::from_score(score))).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}
