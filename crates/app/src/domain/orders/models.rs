//! Order Models

use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        customers::models::{AddressUuid, CustomerUuid},
        payments::models::{Payment, PaymentMethod},
        pricing::models::PriceBreakdown,
    },
    uuids::TypedUuid,
};

/// Order UUID
pub type OrderUuid = TypedUuid<Order>;

/// Order Item UUID
pub type OrderItemUuid = TypedUuid<OrderItem>;

/// Aggregate status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// A gateway payment intent exists but is unverified. Expires into
    /// [`OrderStatus::Cancelled`] if never verified.
    Initialized,
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    ReturnRequested,
    ReturnApproved,
    ReturnRejected,
    Returned,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::ReturnRequested => "return_requested",
            Self::ReturnApproved => "return_approved",
            Self::ReturnRejected => "return_rejected",
            Self::Returned => "returned",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "initialized" => Ok(Self::Initialized),
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "return_requested" => Ok(Self::ReturnRequested),
            "return_approved" => Ok(Self::ReturnApproved),
            "return_rejected" => Ok(Self::ReturnRejected),
            "returned" => Ok(Self::Returned),
            other => Err(format!("unknown order status {other:?}")),
        }
    }
}

/// Status of one order line, independent of the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    ReturnRequested,
    ReturnApproved,
    ReturnRejected,
    Returned,
}

impl ItemStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::ReturnRequested => "return_requested",
            Self::ReturnApproved => "return_approved",
            Self::ReturnRejected => "return_rejected",
            Self::Returned => "returned",
        }
    }

    /// Whether the line still counts towards the payable remainder of
    /// its order.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Cancelled | Self::Returned)
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "return_requested" => Ok(Self::ReturnRequested),
            "return_approved" => Ok(Self::ReturnApproved),
            "return_rejected" => Ok(Self::ReturnRejected),
            "returned" => Ok(Self::Returned),
            other => Err(format!("unknown item status {other:?}")),
        }
    }
}

/// Shipping address snapshot, copied from the address book at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
}

/// Order timeline. Each stamp is set at most once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeline {
    pub placed_at: Option<Timestamp>,
    pub confirmed_at: Option<Timestamp>,
    pub shipped_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub returned_at: Option<Timestamp>,
}

/// Order Model: an immutable snapshot of items, prices and the shipping
/// address, plus the mutable status fields driven by the state machine.
#[derive(Debug, Clone)]
pub struct Order {
    pub uuid: OrderUuid,
    pub order_number: String,
    pub customer_uuid: CustomerUuid,
    pub status: OrderStatus,
    pub payment: Payment,
    pub coupon_code: Option<String>,
    pub price: PriceBreakdown,
    pub shipping: ShippingAddress,
    pub timeline: Timeline,
    pub items: Vec<OrderItem>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Sale value of the lines still counting towards the order.
    #[must_use]
    pub fn active_sale_value(&self) -> u64 {
        self.items
            .iter()
            .filter(|item| item.status.is_active())
            .map(OrderItem::sale_value)
            .sum()
    }
}

/// Order Item Model
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub uuid: OrderItemUuid,
    pub order_uuid: OrderUuid,
    pub product_uuid: crate::domain::catalog::models::ProductUuid,
    pub product_name: String,
    pub size: String,
    pub quantity: u32,
    pub unit_list_price: u64,
    pub unit_sale_price: u64,
    /// Offer percentage in force when the order was placed.
    pub offer_pct: u8,
    pub status: ItemStatus,
    pub cancel_reason: Option<String>,
    pub return_reason: Option<String>,
    pub reject_reason: Option<String>,
    /// Total refunded to the wallet for this line so far.
    pub refunded_amount: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OrderItem {
    #[must_use]
    pub fn sale_value(&self) -> u64 {
        self.unit_sale_price * u64::from(self.quantity)
    }

    /// Gross (list price) value of the line.
    #[must_use]
    pub fn gross_value(&self) -> u64 {
        self.unit_list_price * u64::from(self.quantity)
    }

    /// Markdown from list to sale price across the line.
    #[must_use]
    pub fn markdown_value(&self) -> u64 {
        self.gross_value().saturating_sub(self.sale_value())
    }

    /// Seasonal offer value across the line, as priced at checkout.
    #[must_use]
    pub fn offer_value(&self) -> u64 {
        (self.unit_sale_price * u64::from(self.offer_pct) / 100) * u64::from(self.quantity)
    }
}

/// One row of `GET /orders`.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub uuid: OrderUuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total: u64,
    pub placed_at: Timestamp,
}

/// Checkout request. The client supplies the order UUID, which doubles
/// as the idempotency key: replaying a checkout with the same UUID
/// cannot create a second order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub uuid: OrderUuid,
    pub method: PaymentMethod,
    pub address_uuid: AddressUuid,
}

/// Gateway callback payload: verified against the stored gateway order
/// id before the order is confirmed.
#[derive(Debug, Clone)]
pub struct VerifyGatewayPayment {
    pub order_uuid: OrderUuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

/// Effect of a cancellation, computed without committing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationPreview {
    /// Amount that would be credited back to the wallet.
    pub refund_amount: u64,
    /// Payable value of the lines that would remain.
    pub remaining_total: u64,
    /// Present when committing would introduce a delivery fee on the
    /// remainder; the commit then requires explicit acknowledgement.
    pub fee_warning: Option<FeeWarning>,
}

/// A delivery fee that a partial cancellation would introduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeWarning {
    pub fee: u64,
    pub floor: u64,
}

/// Commit request for an order-level cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelOrder {
    pub reason: Option<String>,
}

/// Commit request for an item-level cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelItem {
    pub reason: Option<String>,
    /// Must be set when the preview carried a [`FeeWarning`].
    pub acknowledge_fee: bool,
}
