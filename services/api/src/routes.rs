use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;
use storefront_crm::engine::campaigns::campaign_router;
use storefront_crm::engine::coupons::coupon_router;
use storefront_crm::engine::customers::segmentation_router;
use storefront_crm::engine::loyalty::loyalty_router;
use storefront_crm::engine::rfm::rfm_router;
use tracing::warn;

use crate::infra::{AppState, ContactMessage, Engine};

const MAX_CONTACT_MESSAGE_CHARS: usize = 2_000;

/// Engine routes plus the operational and contact endpoints. The caller layers in
/// `Extension<AppState>` and serves with connect info.
pub(crate) fn app(engine: &Engine) -> Router {
    Router::new()
        .merge(rfm_router())
        .merge(segmentation_router(Arc::clone(&engine.segmentation)))
        .merge(loyalty_router(Arc::clone(&engine.ledger)))
        .merge(coupon_router(Arc::clone(&engine.coupons)))
        .merge(campaign_router(Arc::clone(&engine.campaigns)))
        .merge(ops_router())
}

pub(crate) fn ops_router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/contact", post(contact_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn contact_endpoint(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Extension(state): Extension<AppState>,
    Json(payload): Json<ContactMessage>,
) -> Response {
    if let Err(retry_after) = state.limiter.check(peer.ip()) {
        let retry_after_secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
        warn!(client = %peer.ip(), retry_after_secs, "contact submission throttled");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after_secs.to_string())],
            Json(json!({
                "error": "too many contact requests",
                "retry_after_secs": retry_after_secs,
            })),
        )
            .into_response();
    }

    let message = match validate_contact(payload) {
        Ok(message) => message,
        Err(reason) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
        }
    };

    state.inbox.deliver(message);
    (StatusCode::ACCEPTED, Json(json!({ "status": "received" }))).into_response()
}

fn validate_contact(payload: ContactMessage) -> Result<ContactMessage, String> {
    let name = payload.name.trim();
    let email = payload.email.trim();
    let message = payload.message.trim();

    if name.is_empty() {
        return Err("name is required".to_string());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(format!("'{email}' is not an email address")),
    }
    if message.is_empty() {
        return Err("message is required".to_string());
    }
    if message.chars().count() > MAX_CONTACT_MESSAGE_CHARS {
        return Err(format!("message exceeds {MAX_CONTACT_MESSAGE_CHARS} characters"));
    }

    Ok(ContactMessage {
        name: name.to_string(),
        email: email.to_string(),
        message: message.to_string(),
    })
}
