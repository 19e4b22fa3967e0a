//! Coupon Models

use jiff::Timestamp;

use crate::{
    domain::pricing::models::{CouponKind, CouponTerms},
    uuids::TypedUuid,
};

/// Coupon UUID
pub type CouponUuid = TypedUuid<Coupon>;

/// Coupon Model
#[derive(Debug, Clone)]
pub struct Coupon {
    pub uuid: CouponUuid,
    /// Unique, stored uppercase.
    pub code: String,
    pub kind: CouponKind,
    pub value: u64,
    pub min_purchase: u64,
    /// Cap on the discount, percentage coupons only.
    pub max_discount: Option<u64>,
    /// Global redemption budget; `None` is unlimited.
    pub usage_limit: Option<u32>,
    pub per_user_limit: u32,
    pub starts_at: Timestamp,
    pub expires_at: Timestamp,
    pub active: bool,
    pub used_count: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Coupon {
    /// Terms for the pricing engine, given how often this customer has
    /// already redeemed the coupon.
    #[must_use]
    pub fn terms(&self, used_by_customer: u32) -> CouponTerms {
        CouponTerms {
            code: self.code.clone(),
            kind: self.kind,
            value: self.value,
            min_purchase: self.min_purchase,
            max_discount: self.max_discount,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            per_user_limit: self.per_user_limit,
            used_by_customer,
            active: self.active,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
        }
    }
}

/// New Coupon Model
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub uuid: CouponUuid,
    pub code: String,
    pub kind: CouponKind,
    pub value: u64,
    pub min_purchase: u64,
    pub max_discount: Option<u64>,
    pub usage_limit: Option<u32>,
    pub per_user_limit: u32,
    pub starts_at: Timestamp,
    pub expires_at: Timestamp,
}
