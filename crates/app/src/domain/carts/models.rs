//! Cart Models

use jiff::Timestamp;

use crate::{
    domain::{
        catalog::models::ProductUuid,
        customers::models::CustomerUuid,
        pricing::errors::CouponRejection,
        pricing::models::PriceBreakdown,
    },
    uuids::TypedUuid,
};

/// Cart UUID
pub type CartUuid = TypedUuid<Cart>;

/// Cart Item UUID
pub type CartItemUuid = TypedUuid<CartItem>;

/// Cart Model
#[derive(Debug, Clone)]
pub struct Cart {
    pub uuid: CartUuid,
    pub customer_uuid: CustomerUuid,
    pub coupon_code: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// CartItem Model
#[derive(Debug, Clone)]
pub struct CartItem {
    pub uuid: CartItemUuid,
    pub cart_uuid: CartUuid,
    pub product_uuid: ProductUuid,
    pub size: String,
    pub quantity: u32,
    /// Sale price when the line was added. Display only; checkout
    /// re-reads live prices from the catalog.
    pub unit_sale_price: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// New Cart Item Model
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub uuid: CartItemUuid,
    pub product_uuid: ProductUuid,
    pub size: String,
    pub quantity: u32,
}

/// A cart line joined with its live catalog data.
#[derive(Debug, Clone)]
pub struct PricedCartItem {
    pub uuid: CartItemUuid,
    pub product_uuid: ProductUuid,
    pub product_name: String,
    pub size: String,
    pub quantity: u32,
    pub unit_list_price: u64,
    pub unit_sale_price: u64,
    pub offer_pct: u8,
    pub line_total: u64,
}

/// The customer-facing cart: lines priced live, plus the running
/// breakdown.
#[derive(Debug, Clone)]
pub struct PricedCart {
    pub cart: Cart,
    pub items: Vec<PricedCartItem>,
    pub price: PriceBreakdown,
    /// Set when an applied coupon no longer qualifies; the breakdown is
    /// then computed without it. Never silently dropped.
    pub coupon_rejection: Option<CouponRejection>,
}
