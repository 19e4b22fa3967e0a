//! Order Handlers

pub(crate) mod cancel;
pub(crate) mod cancel_preview;
pub(crate) mod create_cod;
pub(crate) mod create_gateway;
pub(crate) mod create_wallet;
pub(crate) mod get;
pub(crate) mod index;
pub(crate) mod item_cancel;
pub(crate) mod item_cancel_preview;
pub(crate) mod return_request;
pub(crate) mod verify_gateway;

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kitbag_app::domain::{
    customers::models::AddressUuid,
    orders::models::{OrderUuid, PlaceOrder},
    payments::models::PaymentMethod,
};

/// Checkout request shared by the three payment paths. The client
/// supplies the order UUID; it is the idempotency key for the checkout.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct PlaceOrderRequest {
    /// Client-generated order id
    pub uuid: Uuid,

    /// Shipping address to snapshot
    pub address_uuid: Uuid,
}

impl PlaceOrderRequest {
    pub(crate) fn into_place_order(self, method: PaymentMethod) -> PlaceOrder {
        PlaceOrder {
            uuid: OrderUuid::from_uuid(self.uuid),
            method,
            address_uuid: AddressUuid::from_uuid(self.address_uuid),
        }
    }
}
