use async_trait::async_trait;

use super::domain::{Coupon, CouponId, CouponUsage};
use crate::engine::customers::CustomerId;
use crate::engine::RepositoryError;

/// Storage abstraction for coupons and their redemptions.
#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the code exists in any letter case.
    async fn insert(&self, coupon: Coupon) -> Result<Coupon, RepositoryError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError>;

    async fn count_usage(
        &self,
        coupon_id: &CouponId,
        customer_id: &CustomerId,
    ) -> Result<u32, RepositoryError>;

    /// Increments `usage_count` and records the usage row in one atomic step, provided the
    /// coupon's `usage_limit` and `per_customer_limit` still allow it. Returns the new count;
    /// a condition that no longer holds yields [`RepositoryError::Conflict`].
    async fn record_redemption(&self, usage: CouponUsage) -> Result<u32, RepositoryError>;
}
