//! Order response models.

use std::string::ToString;

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kitbag_app::domain::orders::models::{
    CancellationPreview, Order, OrderItem, OrderSummary, ShippingAddress,
};

use crate::responses::PriceResponse;

/// Order Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrderResponse {
    /// The unique identifier of the order
    pub uuid: Uuid,

    /// Human-readable order number
    pub order_number: String,

    /// Aggregate order status
    pub status: String,

    /// Payment record
    pub payment: PaymentResponse,

    /// Applied coupon code, if any
    pub coupon_code: Option<String>,

    /// Price breakdown
    pub price: PriceResponse,

    /// Shipping address snapshot
    pub shipping: ShippingAddressResponse,

    /// Order timeline
    pub timeline: TimelineResponse,

    /// The order lines
    pub items: Vec<OrderItemResponse>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            uuid: order.uuid.into_uuid(),
            order_number: order.order_number,
            status: order.status.as_str().to_string(),
            payment: PaymentResponse {
                method: order.payment.method.as_str().to_string(),
                status: order.payment.status.as_str().to_string(),
                gateway_order_id: order.payment.gateway_order_id,
                gateway_payment_id: order.payment.gateway_payment_id,
            },
            coupon_code: order.coupon_code,
            price: order.price.into(),
            shipping: order.shipping.into(),
            timeline: TimelineResponse {
                placed_at: order.timeline.placed_at.as_ref().map(ToString::to_string),
                confirmed_at: order.timeline.confirmed_at.as_ref().map(ToString::to_string),
                shipped_at: order.timeline.shipped_at.as_ref().map(ToString::to_string),
                delivered_at: order.timeline.delivered_at.as_ref().map(ToString::to_string),
                cancelled_at: order.timeline.cancelled_at.as_ref().map(ToString::to_string),
                returned_at: order.timeline.returned_at.as_ref().map(ToString::to_string),
            },
            items: order.items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

/// Payment Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct PaymentResponse {
    /// Payment method
    pub method: String,

    /// Payment settlement status
    pub status: String,

    /// Gateway order id, for gateway payments
    pub gateway_order_id: Option<String>,

    /// Gateway payment id, once verified
    pub gateway_payment_id: Option<String>,
}

/// Shipping Address Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ShippingAddressResponse {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
}

impl From<ShippingAddress> for ShippingAddressResponse {
    fn from(shipping: ShippingAddress) -> Self {
        Self {
            recipient: shipping.recipient,
            line1: shipping.line1,
            line2: shipping.line2,
            city: shipping.city,
            state: shipping.state,
            postal_code: shipping.postal_code,
            phone: shipping.phone,
        }
    }
}

/// Timeline Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct TimelineResponse {
    pub placed_at: Option<String>,
    pub confirmed_at: Option<String>,
    pub shipped_at: Option<String>,
    pub delivered_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub returned_at: Option<String>,
}

/// Order Item Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrderItemResponse {
    /// The unique identifier of the line
    pub uuid: Uuid,

    /// The product ordered
    pub product_uuid: Uuid,

    /// Product name as sold
    pub product_name: String,

    /// Size ordered
    pub size: String,

    /// Quantity ordered
    pub quantity: u32,

    /// Sale price per unit as sold
    pub unit_sale_price: u64,

    /// Line status
    pub status: String,

    /// Customer's cancellation reason
    pub cancel_reason: Option<String>,

    /// Customer's return reason
    pub return_reason: Option<String>,

    /// Admin's return rejection reason
    pub reject_reason: Option<String>,

    /// Amount refunded to the wallet for this line so far
    pub refunded_amount: u64,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            uuid: item.uuid.into_uuid(),
            product_uuid: item.product_uuid.into_uuid(),
            product_name: item.product_name,
            size: item.size,
            quantity: item.quantity,
            unit_sale_price: item.unit_sale_price,
            status: item.status.as_str().to_string(),
            cancel_reason: item.cancel_reason,
            return_reason: item.return_reason,
            reject_reason: item.reject_reason,
            refunded_amount: item.refunded_amount,
        }
    }
}

/// One row of the order list
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrderSummaryResponse {
    pub uuid: Uuid,
    pub order_number: String,
    pub status: String,
    pub payment_method: String,
    pub total: u64,
    pub placed_at: String,
}

impl From<OrderSummary> for OrderSummaryResponse {
    fn from(summary: OrderSummary) -> Self {
        Self {
            uuid: summary.uuid.into_uuid(),
            order_number: summary.order_number,
            status: summary.status.as_str().to_string(),
            payment_method: summary.payment_method.as_str().to_string(),
            total: summary.total,
            placed_at: summary.placed_at.to_string(),
        }
    }
}

/// Effect of a cancellation, before committing it
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CancellationPreviewResponse {
    /// Amount that would return to the wallet
    pub refund_amount: u64,

    /// Payable value of what would remain
    pub remaining_total: u64,

    /// Present when committing introduces a delivery fee
    pub fee_warning: Option<FeeWarningResponse>,
}

/// A delivery fee the remainder would pick up
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct FeeWarningResponse {
    pub fee: u64,
    pub floor: u64,
}

impl From<CancellationPreview> for CancellationPreviewResponse {
    fn from(preview: CancellationPreview) -> Self {
        Self {
            refund_amount: preview.refund_amount,
            remaining_total: preview.remaining_total,
            fee_warning: preview.fee_warning.map(|warning| FeeWarningResponse {
                fee: warning.fee,
                floor: warning.floor,
            }),
        }
    }
}
