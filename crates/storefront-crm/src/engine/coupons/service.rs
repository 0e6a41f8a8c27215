use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use super::domain::{
    Coupon, CouponDecision, CouponDraft, CouponId, CouponQuery, CouponRedemption, CouponRejection,
    CouponUsage, DiscountType, RedeemCoupon,
};
use super::repository::CouponStore;
use super::validator::CouponValidator;
use crate::clock::Clock;
use crate::engine::{ErrorKind, RepositoryError};

static COUPON_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_coupon_id() -> CouponId {
    let id = COUPON_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CouponId(format!("cpn-{id:06}"))
}

/// Coupon administration, validation and redemption over a [`CouponStore`].
pub struct CouponService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    validator: CouponValidator<S>,
}

impl<S> CouponService<S>
where
    S: CouponStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        let validator = CouponValidator::new(Arc::clone(&store), Arc::clone(&clock));
        Self {
            store,
            clock,
            validator,
        }
    }

    /// Store a new coupon. The code is normalized to upper case.
    pub async fn create(&self, draft: CouponDraft) -> Result<Coupon, CouponError> {
        check_draft(&draft)?;

        let code = draft.code.trim().to_uppercase();
        let coupon = Coupon {
            id: next_coupon_id(),
            code: code.clone(),
            discount_type: draft.discount_type,
            discount_value: draft.discount_value,
            min_purchase: draft.min_purchase,
            max_discount: draft.max_discount,
            usage_limit: draft.usage_limit,
            per_customer_limit: draft.per_customer_limit,
            starts_at: draft.starts_at.unwrap_or_else(|| self.clock.now()),
            expires_at: draft.expires_at,
            is_active: draft.is_active,
            usage_count: 0,
        };

        if coupon
            .expires_at
            .is_some_and(|expires_at| expires_at <= coupon.starts_at)
        {
            return Err(CouponError::InvalidInput(
                "expires_at must be later than starts_at".to_string(),
            ));
        }

        match self.store.insert(coupon).await {
            Ok(stored) => {
                info!(coupon_id = %stored.id, code = %stored.code, "coupon created");
                Ok(stored)
            }
            Err(RepositoryError::Conflict) => Err(CouponError::DuplicateCode(code)),
            Err(err) => Err(CouponError::Repository(err)),
        }
    }

    pub async fn validate(&self, query: &CouponQuery) -> Result<CouponDecision, CouponError> {
        self.validator.validate(query).await
    }

    /// Validate for the customer, then take a usage slot and record the usage row.
    pub async fn redeem(&self, request: RedeemCoupon) -> Result<CouponRedemption, CouponError> {
        if request.order_id.trim().is_empty() {
            return Err(CouponError::InvalidInput("order_id is required".to_string()));
        }

        let query = CouponQuery {
            code: request.code.clone(),
            customer_id: Some(request.customer_id.clone()),
            cart_total: request.cart_total,
        };
        let (coupon, discount) = match self.validator.validate(&query).await? {
            CouponDecision::Valid { coupon, discount } => (coupon, discount),
            CouponDecision::Invalid(rejection) => return Err(CouponError::Rejected(rejection)),
        };

        let usage = CouponUsage {
            coupon_id: coupon.id.clone(),
            customer_id: request.customer_id.clone(),
            order_id: request.order_id.clone(),
            used_at: self.clock.now(),
        };

        let usage_count = match self.store.record_redemption(usage).await {
            Ok(count) => count,
            Err(RepositoryError::Conflict) => {
                warn!(
                    code = %coupon.code,
                    customer_id = %request.customer_id,
                    "coupon redemption lost a usage race"
                );
                return Err(CouponError::UsageRace(coupon.code));
            }
            Err(err) => return Err(CouponError::Repository(err)),
        };

        info!(
            code = %coupon.code,
            customer_id = %request.customer_id,
            order_id = %request.order_id,
            discount = %discount.discount,
            usage_count,
            "coupon redeemed"
        );

        Ok(CouponRedemption {
            coupon_id: coupon.id,
            code: coupon.code,
            order_id: request.order_id,
            discount: discount.discount,
            final_total: discount.final_total,
            usage_count,
        })
    }
}

fn check_draft(draft: &CouponDraft) -> Result<(), CouponError> {
    let code = draft.code.trim();
    if code.is_empty() || code.chars().any(char::is_whitespace) {
        return Err(CouponError::InvalidInput(format!(
            "coupon code {:?} must be a single non-empty word",
            draft.code
        )));
    }
    if draft.discount_value <= Decimal::ZERO {
        return Err(CouponError::InvalidInput(
            "discount_value must be positive".to_string(),
        ));
    }
    if draft.discount_type == DiscountType::Percentage
        && draft.discount_value > Decimal::ONE_HUNDRED
    {
        return Err(CouponError::InvalidInput(
            "percentage discounts cannot exceed 100".to_string(),
        ));
    }
    if draft.min_purchase < Decimal::ZERO {
        return Err(CouponError::InvalidInput(
            "min_purchase must not be negative".to_string(),
        ));
    }
    if draft.max_discount.is_some_and(|cap| cap <= Decimal::ZERO) {
        return Err(CouponError::InvalidInput(
            "max_discount must be positive when set".to_string(),
        ));
    }
    if draft.usage_limit == Some(0) || draft.per_customer_limit == Some(0) {
        return Err(CouponError::InvalidInput(
            "usage limits must be at least 1 when set".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum CouponError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("coupon code {0} already exists")]
    DuplicateCode(String),
    #[error("coupon rejected: {0}")]
    Rejected(CouponRejection),
    #[error("coupon {0} reached a usage limit while redeeming")]
    UsageRace(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CouponError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::Rejected(_) => ErrorKind::InvalidInput,
            Self::DuplicateCode(_) | Self::UsageRace(_) => ErrorKind::Conflict,
            Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::Repository(RepositoryError::Conflict) => ErrorKind::Conflict,
            Self::Repository(_) => ErrorKind::Internal,
        }
    }
}
