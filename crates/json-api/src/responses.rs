//! Response fragments shared across resources.

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};

use kitbag_app::domain::pricing::models::PriceBreakdown;

/// Price breakdown. All amounts are minor currency units.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct PriceResponse {
    /// Gross (list price) value of the items
    pub subtotal: u64,

    /// Markdown from list to sale prices
    pub discount: u64,

    /// Seasonal/category offer discount
    pub special_discount: u64,

    /// Coupon discount
    pub coupon_discount: u64,

    /// Referral credit applied
    pub referral_bonus: u64,

    /// Delivery fee
    pub delivery_fee: u64,

    /// Amount payable
    pub total: u64,
}

impl From<PriceBreakdown> for PriceResponse {
    fn from(price: PriceBreakdown) -> Self {
        Self {
            subtotal: price.subtotal,
            discount: price.discount,
            special_discount: price.special_discount,
            coupon_discount: price.coupon_discount,
            referral_bonus: price.referral_bonus,
            delivery_fee: price.delivery_fee,
            total: price.total,
        }
    }
}
