use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use super::domain::{Coupon, CouponDecision, CouponQuery, CouponRejection, DiscountType, Discount};
use super::repository::CouponStore;
use super::service::CouponError;
use crate::clock::Clock;

/// Rounds to the currency's minor unit.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Discount for `cart_total`, never above the cart total and never negative.
///
/// Carts too large for the exact product are scaled down to hundredths first; a
/// percentage that still cannot be represented takes the whole cart.
pub fn compute_discount(coupon: &Coupon, cart_total: Decimal) -> Discount {
    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let amount = cart_total
                .checked_mul(coupon.discount_value)
                .map(|product| product / Decimal::ONE_HUNDRED)
                .or_else(|| (cart_total / Decimal::ONE_HUNDRED).checked_mul(coupon.discount_value))
                .unwrap_or(cart_total);
            match coupon.max_discount {
                Some(cap) => amount.min(cap),
                None => amount,
            }
        }
        DiscountType::Fixed => coupon.discount_value,
    };

    let discount = round_money(raw.min(cart_total).max(Decimal::ZERO));
    let final_total = round_money(cart_total - discount).max(Decimal::ZERO);

    Discount {
        discount,
        final_total,
    }
}

/// Checks that need nothing beyond the coupon itself, in evaluation order.
pub fn check_eligibility(
    coupon: &Coupon,
    cart_total: Decimal,
    now: DateTime<Utc>,
) -> Result<(), CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::NotFoundOrInactive);
    }
    if now < coupon.starts_at {
        return Err(CouponRejection::NotYetActive);
    }
    if coupon.expires_at.is_some_and(|expires_at| now > expires_at) {
        return Err(CouponRejection::Expired);
    }
    if coupon
        .usage_limit
        .is_some_and(|limit| coupon.usage_count >= limit)
    {
        return Err(CouponRejection::UsageLimitReached);
    }
    if cart_total < coupon.min_purchase {
        return Err(CouponRejection::MinimumPurchaseNotMet);
    }
    Ok(())
}

/// Read-only eligibility check against the coupon store.
pub struct CouponValidator<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> CouponValidator<S>
where
    S: CouponStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn validate(&self, query: &CouponQuery) -> Result<CouponDecision, CouponError> {
        let code = query.code.trim();
        if code.is_empty() {
            return Err(CouponError::InvalidInput("coupon code is required".to_string()));
        }
        if query.cart_total < Decimal::ZERO {
            return Err(CouponError::InvalidInput(format!(
                "cart total {} must not be negative",
                query.cart_total
            )));
        }

        let Some(coupon) = self.store.find_by_code(code).await? else {
            debug!(code, "coupon lookup missed");
            return Ok(CouponDecision::Invalid(CouponRejection::NotFoundOrInactive));
        };

        if let Err(rejection) = check_eligibility(&coupon, query.cart_total, self.clock.now()) {
            debug!(code, reason = rejection.reason(), "coupon rejected");
            return Ok(CouponDecision::Invalid(rejection));
        }

        if let (Some(customer_id), Some(limit)) = (&query.customer_id, coupon.per_customer_limit) {
            let used = self.store.count_usage(&coupon.id, customer_id).await?;
            if used >= limit {
                debug!(code, customer_id = %customer_id, used, limit, "coupon already used");
                return Ok(CouponDecision::Invalid(CouponRejection::AlreadyUsed));
            }
        }

        let discount = compute_discount(&coupon, query.cart_total);
        Ok(CouponDecision::Valid { coupon, discount })
    }
}
