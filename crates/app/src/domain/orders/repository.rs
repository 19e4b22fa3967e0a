//! Orders Repository

use std::str::FromStr;

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::{
    database::{try_amount_param, try_get_amount},
    domain::{
        catalog::models::ProductUuid,
        customers::models::CustomerUuid,
        orders::models::{
            ItemStatus, Order, OrderItem, OrderItemUuid, OrderStatus, OrderSummary, OrderUuid,
            ShippingAddress, Timeline,
        },
        payments::models::{Payment, PaymentMethod, PaymentStatus},
        pricing::models::PriceBreakdown,
        wallet::models::Page,
    },
};

const CREATE_ORDER_SQL: &str = include_str!("sql/create_order.sql");
const CREATE_ORDER_ITEM_SQL: &str = include_str!("sql/create_order_item.sql");
const GET_ORDER_SQL: &str = include_str!("sql/get_order.sql");
const GET_ORDER_FOR_UPDATE_SQL: &str = include_str!("sql/get_order_for_update.sql");
const GET_ORDER_ITEMS_SQL: &str = include_str!("sql/get_order_items.sql");
const GET_ORDER_ITEM_SQL: &str = include_str!("sql/get_order_item.sql");
const LIST_ORDERS_SQL: &str = include_str!("sql/list_orders.sql");
const UPDATE_ORDER_STATE_SQL: &str = include_str!("sql/update_order_state.sql");
const UPDATE_ORDER_PRICE_SQL: &str = include_str!("sql/update_order_price.sql");
const UPDATE_ORDER_ITEM_SQL: &str = include_str!("sql/update_order_item.sql");
const ADVANCE_ORDER_ITEMS_SQL: &str = include_str!("sql/advance_order_items.sql");

/// Insert payload for a new order row.
#[derive(Debug)]
pub(crate) struct NewOrderRecord<'a> {
    pub uuid: OrderUuid,
    pub order_number: &'a str,
    pub customer_uuid: CustomerUuid,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub gateway_order_id: Option<&'a str>,
    pub coupon_code: Option<&'a str>,
    pub price: &'a PriceBreakdown,
    pub shipping: &'a ShippingAddress,
    pub placed_at: Timestamp,
    pub confirmed_at: Option<Timestamp>,
}

/// Insert payload for one order line.
#[derive(Debug)]
pub(crate) struct NewOrderItemRecord<'a> {
    pub uuid: OrderItemUuid,
    pub order_uuid: OrderUuid,
    pub product_uuid: ProductUuid,
    pub product_name: &'a str,
    pub size: &'a str,
    pub quantity: u32,
    pub unit_list_price: u64,
    pub unit_sale_price: u64,
    pub offer_pct: u8,
}

/// Status-and-timeline update. Timeline stamps and gateway identifiers
/// are written with `COALESCE(column, $n)` so each is set at most once.
#[derive(Debug, Default)]
pub(crate) struct OrderStateChange {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub confirmed_at: Option<Timestamp>,
    pub shipped_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub returned_at: Option<Timestamp>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
}

/// Per-item update: new status, first-writer-wins reasons, and a refund
/// increment.
#[derive(Debug, Default)]
pub(crate) struct OrderItemChange {
    pub status: Option<ItemStatus>,
    pub cancel_reason: Option<String>,
    pub return_reason: Option<String>,
    pub reject_reason: Option<String>,
    pub refund_delta: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &NewOrderRecord<'_>,
    ) -> Result<Order, sqlx::Error> {
        query_as::<Postgres, Order>(CREATE_ORDER_SQL)
            .bind(order.uuid.into_uuid())
            .bind(order.order_number)
            .bind(order.customer_uuid.into_uuid())
            .bind(order.status.as_str())
            .bind(order.payment_method.as_str())
            .bind(order.payment_status.as_str())
            .bind(order.gateway_order_id)
            .bind(order.coupon_code)
            .bind(try_amount_param(order.price.subtotal, "subtotal")?)
            .bind(try_amount_param(order.price.discount, "discount")?)
            .bind(try_amount_param(order.price.special_discount, "special_discount")?)
            .bind(try_amount_param(order.price.coupon_discount, "coupon_discount")?)
            .bind(try_amount_param(order.price.referral_bonus, "referral_bonus")?)
            .bind(try_amount_param(order.price.delivery_fee, "delivery_fee")?)
            .bind(try_amount_param(order.price.total, "total")?)
            .bind(&order.shipping.recipient)
            .bind(&order.shipping.line1)
            .bind(order.shipping.line2.as_deref())
            .bind(&order.shipping.city)
            .bind(&order.shipping.state)
            .bind(&order.shipping.postal_code)
            .bind(&order.shipping.phone)
            .bind(SqlxTimestamp::from(order.placed_at))
            .bind(order.confirmed_at.map(SqlxTimestamp::from))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_order_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: &NewOrderItemRecord<'_>,
    ) -> Result<OrderItem, sqlx::Error> {
        query_as::<Postgres, OrderItem>(CREATE_ORDER_ITEM_SQL)
            .bind(item.uuid.into_uuid())
            .bind(item.order_uuid.into_uuid())
            .bind(item.product_uuid.into_uuid())
            .bind(item.product_name)
            .bind(item.size)
            .bind(i64::from(item.quantity))
            .bind(try_amount_param(item.unit_list_price, "unit_list_price")?)
            .bind(try_amount_param(item.unit_sale_price, "unit_sale_price")?)
            .bind(i16::from(item.offer_pct))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Order, sqlx::Error> {
        query_as::<Postgres, Order>(GET_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Fetch the order row with `FOR UPDATE`, serialising every mutation
    /// of this order for the duration of the transaction.
    pub(crate) async fn get_order_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Order, sqlx::Error> {
        query_as::<Postgres, Order>(GET_ORDER_FOR_UPDATE_SQL)
            .bind(order.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_order_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        query_as::<Postgres, OrderItem>(GET_ORDER_ITEMS_SQL)
            .bind(order.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_order_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<OrderItem, sqlx::Error> {
        query_as::<Postgres, OrderItem>(GET_ORDER_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(order.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        page: Page,
    ) -> Result<Vec<OrderSummary>, sqlx::Error> {
        query_as::<Postgres, OrderSummary>(LIST_ORDERS_SQL)
            .bind(customer.into_uuid())
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn update_order_state(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        current: &Order,
        change: &OrderStateChange,
    ) -> Result<(), sqlx::Error> {
        let status = change.status.unwrap_or(current.status);
        let payment_status = change.payment_status.unwrap_or(current.payment.status);

        query(UPDATE_ORDER_STATE_SQL)
            .bind(order.into_uuid())
            .bind(status.as_str())
            .bind(payment_status.as_str())
            .bind(change.confirmed_at.map(SqlxTimestamp::from))
            .bind(change.shipped_at.map(SqlxTimestamp::from))
            .bind(change.delivered_at.map(SqlxTimestamp::from))
            .bind(change.cancelled_at.map(SqlxTimestamp::from))
            .bind(change.returned_at.map(SqlxTimestamp::from))
            .bind(change.gateway_payment_id.as_deref())
            .bind(change.gateway_signature.as_deref())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn update_order_price(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        price: &PriceBreakdown,
    ) -> Result<(), sqlx::Error> {
        query(UPDATE_ORDER_PRICE_SQL)
            .bind(order.into_uuid())
            .bind(try_amount_param(price.subtotal, "subtotal")?)
            .bind(try_amount_param(price.discount, "discount")?)
            .bind(try_amount_param(price.special_discount, "special_discount")?)
            .bind(try_amount_param(price.coupon_discount, "coupon_discount")?)
            .bind(try_amount_param(price.referral_bonus, "referral_bonus")?)
            .bind(try_amount_param(price.delivery_fee, "delivery_fee")?)
            .bind(try_amount_param(price.total, "total")?)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn update_order_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: OrderItemUuid,
        current: &OrderItem,
        change: &OrderItemChange,
    ) -> Result<OrderItem, sqlx::Error> {
        let status = change.status.unwrap_or(current.status);

        query_as::<Postgres, OrderItem>(UPDATE_ORDER_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(status.as_str())
            .bind(change.cancel_reason.as_deref())
            .bind(change.return_reason.as_deref())
            .bind(change.reject_reason.as_deref())
            .bind(try_amount_param(change.refund_delta, "refunded_amount")?)
            .fetch_one(&mut **tx)
            .await
    }

    /// Move every item currently in one of `from` along to `to`; items
    /// outside those statuses are untouched.
    pub(crate) async fn advance_order_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        from: &[ItemStatus],
        to: ItemStatus,
    ) -> Result<(), sqlx::Error> {
        let from: Vec<String> = from.iter().map(|status| status.as_str().to_string()).collect();

        query(ADVANCE_ORDER_ITEMS_SQL)
            .bind(order.into_uuid())
            .bind(&from)
            .bind(to.as_str())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

fn try_get_status<T: FromStr<Err = String>>(row: &PgRow, col: &str) -> Result<T, sqlx::Error> {
    let raw: String = row.try_get(col)?;

    raw.parse::<T>().map_err(|message| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: message.into(),
    })
}

impl<'r> FromRow<'r, PgRow> for Order {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let timeline = Timeline {
            placed_at: Some(row.try_get::<SqlxTimestamp, _>("placed_at")?.to_jiff()),
            confirmed_at: row
                .try_get::<Option<SqlxTimestamp>, _>("confirmed_at")?
                .map(SqlxTimestamp::to_jiff),
            shipped_at: row
                .try_get::<Option<SqlxTimestamp>, _>("shipped_at")?
                .map(SqlxTimestamp::to_jiff),
            delivered_at: row
                .try_get::<Option<SqlxTimestamp>, _>("delivered_at")?
                .map(SqlxTimestamp::to_jiff),
            cancelled_at: row
                .try_get::<Option<SqlxTimestamp>, _>("cancelled_at")?
                .map(SqlxTimestamp::to_jiff),
            returned_at: row
                .try_get::<Option<SqlxTimestamp>, _>("returned_at")?
                .map(SqlxTimestamp::to_jiff),
        };

        Ok(Self {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            order_number: row.try_get("order_number")?,
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            status: try_get_status(row, "status")?,
            payment: Payment {
                method: try_get_status(row, "payment_method")?,
                status: try_get_status(row, "payment_status")?,
                gateway_order_id: row.try_get("gateway_order_id")?,
                gateway_payment_id: row.try_get("gateway_payment_id")?,
                gateway_signature: row.try_get("gateway_signature")?,
            },
            coupon_code: row.try_get("coupon_code")?,
            price: PriceBreakdown {
                subtotal: try_get_amount(row, "subtotal")?,
                discount: try_get_amount(row, "discount")?,
                special_discount: try_get_amount(row, "special_discount")?,
                coupon_discount: try_get_amount(row, "coupon_discount")?,
                referral_bonus: try_get_amount(row, "referral_bonus")?,
                delivery_fee: try_get_amount(row, "delivery_fee")?,
                total: try_get_amount(row, "total")?,
            },
            shipping: ShippingAddress {
                recipient: row.try_get("ship_recipient")?,
                line1: row.try_get("ship_line1")?,
                line2: row.try_get("ship_line2")?,
                city: row.try_get("ship_city")?,
                state: row.try_get("ship_state")?,
                postal_code: row.try_get("ship_postal_code")?,
                phone: row.try_get("ship_phone")?,
            },
            timeline,
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderItem {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let quantity: i32 = row.try_get("quantity")?;

        let quantity = u32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
            index: "quantity".to_string(),
            source: Box::new(e),
        })?;

        let offer_pct: i16 = row.try_get("offer_pct")?;

        let offer_pct = u8::try_from(offer_pct).map_err(|e| sqlx::Error::ColumnDecode {
            index: "offer_pct".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            uuid: OrderItemUuid::from_uuid(row.try_get("uuid")?),
            order_uuid: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            product_name: row.try_get("product_name")?,
            size: row.try_get("size")?,
            quantity,
            unit_list_price: try_get_amount(row, "unit_list_price")?,
            unit_sale_price: try_get_amount(row, "unit_sale_price")?,
            offer_pct,
            status: try_get_status(row, "status")?,
            cancel_reason: row.try_get("cancel_reason")?,
            return_reason: row.try_get("return_reason")?,
            reject_reason: row.try_get("reject_reason")?,
            refunded_amount: try_get_amount(row, "refunded_amount")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderSummary {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            order_number: row.try_get("order_number")?,
            status: try_get_status(row, "status")?,
            payment_method: try_get_status(row, "payment_method")?,
            total: try_get_amount(row, "total")?,
            placed_at: row.try_get::<SqlxTimestamp, _>("placed_at")?.to_jiff(),
        })
    }
}
