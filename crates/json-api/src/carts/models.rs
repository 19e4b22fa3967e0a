//! Cart response models.

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kitbag_app::domain::carts::models::{PricedCart, PricedCartItem};

use crate::responses::PriceResponse;

/// Cart Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartResponse {
    /// The unique identifier of the cart
    pub uuid: Uuid,

    /// Applied coupon code, if any
    pub coupon_code: Option<String>,

    /// Why the applied coupon currently does not qualify, if it doesn't
    pub coupon_rejection: Option<String>,

    /// The items in the cart, priced live
    pub items: Vec<CartItemResponse>,

    /// Price breakdown for the cart as it stands
    pub price: PriceResponse,
}

impl From<PricedCart> for CartResponse {
    fn from(cart: PricedCart) -> Self {
        Self {
            uuid: cart.cart.uuid.into_uuid(),
            coupon_code: cart.cart.coupon_code,
            coupon_rejection: cart.coupon_rejection.map(|rejection| rejection.to_string()),
            items: cart.items.into_iter().map(CartItemResponse::from).collect(),
            price: cart.price.into(),
        }
    }
}

/// Cart Item Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartItemResponse {
    /// The unique identifier of the cart item
    pub uuid: Uuid,

    /// The product in this line
    pub product_uuid: Uuid,

    /// Product display name
    pub product_name: String,

    /// Chosen size
    pub size: String,

    /// Quantity
    pub quantity: u32,

    /// Current list price per unit
    pub unit_list_price: u64,

    /// Current sale price per unit
    pub unit_sale_price: u64,

    /// Seasonal offer percentage in force
    pub offer_pct: u8,

    /// Sale value of the line
    pub line_total: u64,
}

impl From<PricedCartItem> for CartItemResponse {
    fn from(item: PricedCartItem) -> Self {
        Self {
            uuid: item.uuid.into_uuid(),
            product_uuid: item.product_uuid.into_uuid(),
            product_name: item.product_name,
            size: item.size,
            quantity: item.quantity,
            unit_list_price: item.unit_list_price,
            unit_sale_price: item.unit_sale_price,
            offer_pct: item.offer_pct,
            line_total: item.line_total,
        }
    }
}
