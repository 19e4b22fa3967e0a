//! Checkout Policy Config

use clap::Args;
use jiff::SignedDuration;
use kitbag_app::config::CheckoutPolicy;

/// Checkout policy thresholds. Amounts are minor currency units.
#[derive(Debug, Args)]
pub struct CheckoutPolicyConfig {
    /// Flat delivery fee below the free-delivery threshold
    #[arg(long, env = "DELIVERY_FEE", default_value_t = 49_00)]
    pub delivery_fee: u64,

    /// Order value above which delivery is free
    #[arg(long, env = "FREE_DELIVERY_THRESHOLD", default_value_t = 999_00)]
    pub free_delivery_threshold: u64,

    /// Remaining order value below which a partial cancellation
    /// introduces a delivery fee
    #[arg(long, env = "PARTIAL_CANCEL_FEE_FLOOR", default_value_t = 500_00)]
    pub partial_cancel_fee_floor: u64,

    /// Largest order total accepted for cash on delivery
    #[arg(long, env = "COD_CEILING", default_value_t = 10_000_00)]
    pub cod_ceiling: u64,

    /// Maximum quantity of a single (product, size) line
    #[arg(long, env = "MAX_QUANTITY_PER_LINE", default_value_t = 5)]
    pub max_quantity_per_line: u32,

    /// Minutes before an unverified gateway intent expires
    #[arg(long, env = "INTENT_EXPIRY_MINUTES", default_value_t = 5)]
    pub intent_expiry_minutes: i64,
}

impl CheckoutPolicyConfig {
    #[must_use]
    pub fn to_policy(&self) -> CheckoutPolicy {
        CheckoutPolicy {
            delivery_fee: self.delivery_fee,
            free_delivery_threshold: self.free_delivery_threshold,
            partial_cancel_fee_floor: self.partial_cancel_fee_floor,
            cod_ceiling: self.cod_ceiling,
            max_quantity_per_line: self.max_quantity_per_line,
            intent_expiry: SignedDuration::from_mins(self.intent_expiry_minutes),
        }
    }
}
