//! Discount coupons: eligibility checks, discount arithmetic and usage-limited redemption.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod validator;

#[cfg(test)]
mod tests;

pub use domain::{
    Coupon, CouponDecision, CouponDraft, CouponId, CouponQuery, CouponRedemption, CouponRejection,
    CouponUsage, CouponValidationView, Discount, DiscountType, RedeemCoupon,
};
pub use repository::CouponStore;
pub use router::coupon_router;
pub use service::{CouponError, CouponService};
pub use validator::{check_eligibility, compute_discount, round_money, CouponValidator};
