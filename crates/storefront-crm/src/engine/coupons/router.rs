use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::domain::{CouponDraft, CouponQuery, RedeemCoupon};
use super::repository::CouponStore;
use super::service::CouponService;
use crate::engine::error_response;

/// Router builder for coupon administration and checkout.
pub fn coupon_router<S>(service: Arc<CouponService<S>>) -> Router
where
    S: CouponStore + 'static,
{
    Router::new()
        .route("/api/v1/coupons", post(create_handler::<S>))
        .route("/api/v1/coupons/validate", post(validate_handler::<S>))
        .route("/api/v1/coupons/redeem", post(redeem_handler::<S>))
        .with_state(service)
}

pub(crate) async fn create_handler<S>(
    State(service): State<Arc<CouponService<S>>>,
    Json(draft): Json<CouponDraft>,
) -> Response
where
    S: CouponStore + 'static,
{
    match service.create(draft).await {
        Ok(coupon) => (StatusCode::CREATED, Json(coupon)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

/// Ineligible coupons are still a 200 with `valid: false` and a reason.
pub(crate) async fn validate_handler<S>(
    State(service): State<Arc<CouponService<S>>>,
    Json(query): Json<CouponQuery>,
) -> Response
where
    S: CouponStore + 'static,
{
    match service.validate(&query).await {
        Ok(decision) => (StatusCode::OK, Json(decision.view())).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}

pub(crate) async fn redeem_handler<S>(
    State(service): State<Arc<CouponService<S>>>,
    Json(request): Json<RedeemCoupon>,
) -> Response
where
    S: CouponStore + 'static,
{
    match service.redeem(request).await {
        Ok(redemption) => (StatusCode::OK, Json(redemption)).into_response(),
        Err(err) => error_response(err.kind(), err.to_string()),
    }
}
