use std::sync::Arc;

use axum::body::to_bytes;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::clock::FixedClock;
use crate::engine::coupons::{Coupon, CouponDraft, CouponService};
use crate::engine::memory::InMemoryStore;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 1, 10, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) struct Fixture {
    pub(super) service: Arc<CouponService<InMemoryStore>>,
    pub(super) store: Arc<InMemoryStore>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::new(now()));
    let service = Arc::new(CouponService::new(Arc::clone(&store), clock.clone()));
    Fixture {
        service,
        store,
        clock,
    }
}

/// 10% off, minimum 500, capped at 200, valid for 30 days.
pub(super) fn welcome_draft() -> CouponDraft {
    let mut draft = CouponDraft::percentage("welcome10", Decimal::from(10));
    draft.min_purchase = Decimal::from(500);
    draft.max_discount = Some(Decimal::from(200));
    draft.starts_at = Some(now() - Duration::days(1));
    draft.expires_at = Some(now() + Duration::days(30));
    draft
}

pub(super) async fn create(fixture: &Fixture, draft: CouponDraft) -> Coupon {
    fixture.service.create(draft).await.expect("coupon created")
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .expect("decimal string")
}
