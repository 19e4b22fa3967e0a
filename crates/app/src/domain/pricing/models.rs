//! Pricing Models

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// One cart line with live catalog prices. Unit prices are re-read from
/// the catalog at pricing time, never trusted from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub quantity: u32,
    pub list_price: u64,
    pub sale_price: u64,
    /// Seasonal/category offer applied on top of the sale price, percent.
    pub offer_pct: u8,
}

/// Delivery fee policy: a flat fee, waived above the free threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub fee: u64,
    pub free_threshold: u64,
}

impl DeliveryPolicy {
    /// Fee charged for an order whose payable value (before the fee) is
    /// `payable`.
    #[must_use]
    pub const fn fee_for(&self, payable: u64) -> u64 {
        if payable > self.free_threshold { 0 } else { self.fee }
    }
}

/// Coupon discount kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponKind {
    Fixed,
    Percentage,
}

impl CouponKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "FIXED",
            Self::Percentage => "PERCENTAGE",
        }
    }
}

/// Everything the engine needs to know about a coupon, including the
/// usage counters that gate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponTerms {
    pub code: String,
    pub kind: CouponKind,
    pub value: u64,
    pub min_purchase: u64,
    pub max_discount: Option<u64>,
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    pub per_user_limit: u32,
    pub used_by_customer: u32,
    pub active: bool,
    pub starts_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Price breakdown for a cart or an order. All amounts are minor
/// currency units and every component is non-negative;
/// `total = subtotal - discount - special_discount - coupon_discount
/// - referral_bonus + delivery_fee`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: u64,
    pub discount: u64,
    pub special_discount: u64,
    pub coupon_discount: u64,
    pub referral_bonus: u64,
    pub delivery_fee: u64,
    pub total: u64,
}
