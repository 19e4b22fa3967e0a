//! Pricing errors.

use thiserror::Error;

/// Why a coupon did not qualify for the current cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("coupon not found")]
    NotFound,

    #[error("coupon is not active")]
    Inactive,

    #[error("coupon is not valid yet")]
    NotStarted,

    #[error("coupon has expired")]
    Expired,

    #[error("order value below the coupon minimum of {required}")]
    MinPurchaseNotMet { required: u64 },

    #[error("coupon usage limit reached")]
    UsageLimitExhausted,

    #[error("coupon already used the maximum number of times")]
    PerUserLimitExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error(transparent)]
    Coupon(#[from] CouponRejection),

    #[error("price computation overflowed")]
    AmountOverflow,
}
