use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::customers::CustomerId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponId(pub String);

impl fmt::Display for CouponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// Stored coupon definition. `code` is kept upper-cased; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_purchase: Decimal,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<u32>,
    pub per_customer_limit: Option<u32>,
    pub starts_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub usage_count: u32,
}

/// Admin input for a new coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponDraft {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub min_purchase: Decimal,
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub per_customer_limit: Option<u32>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CouponDraft {
    pub fn percentage(code: impl Into<String>, percent: Decimal) -> Self {
        Self::new(code, DiscountType::Percentage, percent)
    }

    pub fn fixed(code: impl Into<String>, amount: Decimal) -> Self {
        Self::new(code, DiscountType::Fixed, amount)
    }

    fn new(code: impl Into<String>, discount_type: DiscountType, discount_value: Decimal) -> Self {
        Self {
            code: code.into(),
            discount_type,
            discount_value,
            min_purchase: Decimal::ZERO,
            max_discount: None,
            usage_limit: None,
            per_customer_limit: None,
            starts_at: None,
            expires_at: None,
            is_active: true,
        }
    }
}

/// One redemption; counted against `per_customer_limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponUsage {
    pub coupon_id: CouponId,
    pub customer_id: CustomerId,
    pub order_id: String,
    pub used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponQuery {
    pub code: String,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    pub cart_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemCoupon {
    pub code: String,
    pub customer_id: CustomerId,
    pub order_id: String,
    pub cart_total: Decimal,
}

/// Why a coupon cannot be applied, in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponRejection {
    NotFoundOrInactive,
    NotYetActive,
    Expired,
    UsageLimitReached,
    MinimumPurchaseNotMet,
    AlreadyUsed,
}

impl CouponRejection {
    pub const fn reason(self) -> &'static str {
        match self {
            Self::NotFoundOrInactive => "not found or inactive",
            Self::NotYetActive => "not yet active",
            Self::Expired => "expired",
            Self::UsageLimitReached => "usage limit reached",
            Self::MinimumPurchaseNotMet => "minimum purchase not met",
            Self::AlreadyUsed => "already used",
        }
    }
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Discount and resulting total, both rounded to minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub discount: Decimal,
    pub final_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponDecision {
    Valid { coupon: Coupon, discount: Discount },
    Invalid(CouponRejection),
}

impl CouponDecision {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn view(&self) -> CouponValidationView {
        match self {
            Self::Valid { discount, .. } => CouponValidationView {
                valid: true,
                discount: Some(discount.discount),
                final_total: Some(discount.final_total),
                error: None,
            },
            Self::Invalid(rejection) => CouponValidationView {
                valid: false,
                discount: None,
                final_total: None,
                error: Some(rejection.reason().to_string()),
            },
        }
    }
}

/// Response shape of coupon validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponValidationView {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_total: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRedemption {
    pub coupon_id: CouponId,
    pub code: String,
    pub order_id: String,
    pub discount: Decimal,
    pub final_total: Decimal,
    pub usage_count: u32,
}
