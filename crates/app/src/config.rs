//! Checkout policy configuration.
//!
//! Business thresholds live here rather than as constants so that
//! deployments (and tests) can tune them. All amounts are minor currency
//! units.

use jiff::SignedDuration;

use crate::domain::pricing::models::DeliveryPolicy;

/// Thresholds governing checkout, delivery fees and cancellation.
#[derive(Debug, Clone)]
pub struct CheckoutPolicy {
    /// Flat delivery fee charged below the free-delivery threshold.
    pub delivery_fee: u64,

    /// Order value above which delivery is free.
    pub free_delivery_threshold: u64,

    /// Remaining order value below which a partial cancellation
    /// introduces a delivery fee on the remainder.
    pub partial_cancel_fee_floor: u64,

    /// Largest order total accepted for cash on delivery.
    pub cod_ceiling: u64,

    /// Maximum quantity of a single (product, size) line.
    pub max_quantity_per_line: u32,

    /// How long an unverified gateway payment intent is honoured before
    /// the order is treated as abandoned.
    pub intent_expiry: SignedDuration,
}

impl CheckoutPolicy {
    /// The delivery-fee slice of the policy, as the pricing engine
    /// consumes it.
    #[must_use]
    pub const fn delivery_policy(&self) -> DeliveryPolicy {
        DeliveryPolicy {
            fee: self.delivery_fee,
            free_threshold: self.free_delivery_threshold,
        }
    }
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            delivery_fee: 49_00,
            free_delivery_threshold: 999_00,
            partial_cancel_fee_floor: 500_00,
            cod_ceiling: 10_000_00,
            max_quantity_per_line: 5,
            intent_expiry: SignedDuration::from_mins(5),
        }
    }
}
