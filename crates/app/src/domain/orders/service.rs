//! Orders service.
//!
//! Checkout converts the live cart into an order under one serialized
//! transaction: live price re-read, stock reservation, payment
//! authorization, coupon and referral consumption and cart clearing
//! happen together or not at all. Every later mutation locks the order
//! row first, so concurrent customer and admin actions cannot
//! interleave.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rand::{Rng, distributions::Alphanumeric};
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};

use crate::{
    config::CheckoutPolicy,
    database::{Db, Page},
    domain::{
        carts::{
            PgCartItemsRepository, PgCartsRepository,
            models::{Cart, CartItem},
        },
        catalog::{PgCatalogRepository, models::Product},
        coupons::{PgCouponsRepository, models::Coupon},
        customers::{PgCustomersRepository, models::CustomerUuid},
        orders::{
            PgOrdersRepository,
            errors::OrdersServiceError,
            models::{
                CancelItem, CancelOrder, CancellationPreview, FeeWarning, ItemStatus, Order,
                OrderItem, OrderItemUuid, OrderStatus, OrderSummary, OrderUuid, PlaceOrder,
                ShippingAddress, VerifyGatewayPayment,
            },
            repository::{NewOrderItemRecord, NewOrderRecord, OrderItemChange, OrderStateChange},
            transitions::{
                ItemAction, OrderAction, derive_order_status, item_transition, order_transition,
            },
        },
        payments::{
            PaymentGateway,
            models::{GatewayIntent, PaymentMethod, PaymentStatus},
            strategy::{AuthorizeError, PaymentContext, PaymentStrategy},
        },
        pricing::{
            self,
            errors::CouponRejection,
            models::{PriceBreakdown, PricedLine},
            prorated_deduction,
        },
        wallet::{
            PgWalletRepository,
            models::{NewWalletTransaction, WalletEntry, WalletReason, WalletTransactionUuid},
        },
    },
};

/// Bounded retries for lost lock races before surfacing a conflict.
const CHECKOUT_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct PgOrdersService {
    db: Db,
    policy: CheckoutPolicy,
    gateway: Arc<dyn PaymentGateway>,
    orders: PgOrdersRepository,
    carts: PgCartsRepository,
    cart_items: PgCartItemsRepository,
    catalog: PgCatalogRepository,
    coupons: PgCouponsRepository,
    customers: PgCustomersRepository,
    wallet: PgWalletRepository,
}

impl std::fmt::Debug for PgOrdersService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgOrdersService").finish_non_exhaustive()
    }
}

/// Everything the checkout transaction derives from the live cart.
struct CheckoutDraft {
    cart: Cart,
    lines: Vec<DraftLine>,
    coupon: Option<Coupon>,
    breakdown: PriceBreakdown,
}

struct DraftLine {
    item: CartItem,
    product: Product,
}

impl PgOrdersService {
    #[must_use]
    pub fn new(db: Db, policy: CheckoutPolicy, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            db,
            policy,
            gateway,
            orders: PgOrdersRepository::new(),
            carts: PgCartsRepository::new(),
            cart_items: PgCartItemsRepository::new(),
            catalog: PgCatalogRepository::new(),
            coupons: PgCouponsRepository::new(),
            customers: PgCustomersRepository::new(),
            wallet: PgWalletRepository::new(),
        }
    }

    async fn load_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        for_update: bool,
    ) -> Result<Order, OrdersServiceError> {
        let mut order = if for_update {
            self.orders.get_order_for_update(tx, order).await?
        } else {
            self.orders.get_order(tx, order).await?
        };

        order.items = self.orders.get_order_items(tx, order.uuid).await?;

        Ok(order)
    }

    /// Build the draft the checkout transaction works from: live prices,
    /// quantity caps, coupon terms and the price breakdown.
    async fn build_draft(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        now: Timestamp,
        lock_cart: bool,
    ) -> Result<CheckoutDraft, OrdersServiceError> {
        let cart = if lock_cart {
            self.carts.get_live_cart_for_update(tx, customer).await?
        } else {
            self.carts.get_live_cart(tx, customer).await?
        }
        .ok_or(OrdersServiceError::EmptyCart)?;

        let items = self.cart_items.list_items(tx, cart.uuid).await?;

        if items.is_empty() {
            return Err(OrdersServiceError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(items.len());
        let mut priced = Vec::with_capacity(items.len());

        for item in items {
            if item.quantity > self.policy.max_quantity_per_line {
                return Err(OrdersServiceError::QuantityCapExceeded {
                    limit: self.policy.max_quantity_per_line,
                });
            }

            let product = self.catalog.get_product(tx, item.product_uuid).await?;

            priced.push(PricedLine {
                quantity: item.quantity,
                list_price: product.list_price,
                sale_price: product.sale_price,
                offer_pct: product.offer_pct.unwrap_or(0),
            });

            lines.push(DraftLine { item, product });
        }

        let coupon = match &cart.coupon_code {
            Some(code) => Some(
                self.coupons
                    .find_by_code(tx, code)
                    .await?
                    .ok_or(OrdersServiceError::InvalidCoupon(CouponRejection::NotFound))?,
            ),
            None => None,
        };

        let coupon_terms = match &coupon {
            Some(coupon) => {
                let used_by_customer = self
                    .coupons
                    .count_customer_redemptions(tx, coupon.uuid, customer)
                    .await?;

                Some(coupon.terms(used_by_customer))
            }
            None => None,
        };

        let referral_credit = self
            .customers
            .get_customer(tx, customer)
            .await?
            .referral_credit;

        let breakdown = pricing::quote(
            &priced,
            coupon_terms.as_ref(),
            referral_credit,
            now,
            &self.policy.delivery_policy(),
        )?;

        Ok(CheckoutDraft {
            cart,
            lines,
            coupon,
            breakdown,
        })
    }

    /// The checkout transaction proper. For gateway orders the payment
    /// intent has already been registered (the only cross-process call,
    /// kept outside the transaction).
    async fn execute_checkout(
        &self,
        customer: CustomerUuid,
        place: &PlaceOrder,
        intent: Option<&GatewayIntent>,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let shipping = self.load_shipping_address(&mut tx, customer, place).await?;
        let draft = self.build_draft(&mut tx, customer, now, true).await?;

        if let Some(intent) = intent {
            // The cart changed between the quote and the intent; the
            // stale intent cannot be charged a different amount.
            if intent.amount != draft.breakdown.total {
                return Err(OrdersServiceError::Conflict);
            }
        }

        let strategy = match place.method {
            PaymentMethod::Wallet => PaymentStrategy::Wallet {
                wallet: &self.wallet,
                customers: &self.customers,
            },
            PaymentMethod::Cod => PaymentStrategy::Cod {
                ceiling: self.policy.cod_ceiling,
            },
            PaymentMethod::Gateway => {
                let intent = intent.ok_or(OrdersServiceError::InvalidData)?;

                PaymentStrategy::Gateway { intent }
            }
        };

        // Conditional decrements: overselling is impossible even under
        // concurrent checkouts.
        for line in &draft.lines {
            let reserved = self
                .catalog
                .reserve_stock(
                    &mut tx,
                    line.item.product_uuid,
                    &line.item.size,
                    line.item.quantity,
                )
                .await?;

            if !reserved {
                return Err(OrdersServiceError::InsufficientStock {
                    product_name: line.product.name.clone(),
                    size: line.item.size.clone(),
                });
            }
        }

        let initial = strategy.initial_state(now);
        let order_number = generate_order_number(now);

        let mut order = self
            .orders
            .create_order(
                &mut tx,
                &NewOrderRecord {
                    uuid: place.uuid,
                    order_number: &order_number,
                    customer_uuid: customer,
                    status: initial.order_status,
                    payment_method: place.method,
                    payment_status: initial.payment_status,
                    gateway_order_id: initial.gateway_order_id.as_deref(),
                    coupon_code: draft.cart.coupon_code.as_deref(),
                    price: &draft.breakdown,
                    shipping: &shipping,
                    placed_at: now,
                    confirmed_at: initial.confirmed_at,
                },
            )
            .await?;

        for line in &draft.lines {
            let item = self
                .orders
                .create_order_item(
                    &mut tx,
                    &NewOrderItemRecord {
                        uuid: OrderItemUuid::generate(),
                        order_uuid: order.uuid,
                        product_uuid: line.item.product_uuid,
                        product_name: &line.product.name,
                        size: &line.item.size,
                        quantity: line.item.quantity,
                        unit_list_price: line.product.list_price,
                        unit_sale_price: line.product.sale_price,
                        offer_pct: line.product.offer_pct.unwrap_or(0),
                    },
                )
                .await?;

            order.items.push(item);
        }

        let outcome = strategy
            .authorize(
                &mut tx,
                PaymentContext {
                    order: order.uuid,
                    customer,
                    total: draft.breakdown.total,
                    now,
                },
            )
            .await;

        match outcome {
            Ok(()) => {}
            Err(AuthorizeError::InsufficientBalance) => {
                return Err(OrdersServiceError::InsufficientBalance);
            }
            Err(AuthorizeError::CodCeilingExceeded { ceiling }) => {
                return Err(OrdersServiceError::CodCeilingExceeded { ceiling });
            }
            Err(AuthorizeError::Sql(error)) => return Err(error.into()),
        }

        // Gateway orders consume the coupon only once the payment is
        // verified, so an abandoned intent never burns a redemption.
        if let Some(coupon) = &draft.coupon
            && place.method != PaymentMethod::Gateway
        {
            let consumed = self
                .coupons
                .consume(&mut tx, coupon.uuid, order.uuid, customer, true)
                .await?;

            if !consumed {
                return Err(OrdersServiceError::InvalidCoupon(
                    CouponRejection::UsageLimitExhausted,
                ));
            }
        }

        if draft.breakdown.referral_bonus > 0 {
            let consumed = self
                .customers
                .consume_referral_credit(&mut tx, customer, draft.breakdown.referral_bonus)
                .await?;

            if !consumed {
                return Err(OrdersServiceError::Conflict);
            }
        }

        self.carts.delete_cart(&mut tx, draft.cart.uuid).await?;

        tx.commit().await?;

        info!(
            order_uuid = %order.uuid,
            order_number = %order.order_number,
            method = place.method.as_str(),
            total = order.price.total,
            "placed order"
        );

        Ok(order)
    }

    async fn load_shipping_address(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        place: &PlaceOrder,
    ) -> Result<ShippingAddress, OrdersServiceError> {
        let address = self
            .customers
            .get_address(tx, customer, place.address_uuid)
            .await
            .map_err(|error| match error {
                sqlx::Error::RowNotFound => OrdersServiceError::AddressNotFound,
                other => other.into(),
            })?;

        Ok(ShippingAddress {
            recipient: address.recipient,
            line1: address.line1,
            line2: address.line2,
            city: address.city,
            state: address.state,
            postal_code: address.postal_code,
            phone: address.phone,
        })
    }

    /// Lazily expire an unverified gateway intent past its window:
    /// restock, restore referral credit, fail the payment. The order
    /// must be locked.
    async fn maybe_expire(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
        now: Timestamp,
    ) -> Result<bool, OrdersServiceError> {
        if !self.expiry_due(order, now) {
            return Ok(false);
        }

        order_transition(order.status, OrderAction::ExpireIntent)?;

        for item in &order.items {
            if item_transition(item.status, ItemAction::Cancel).is_err() {
                continue;
            }

            self.orders
                .update_order_item(
                    tx,
                    item.uuid,
                    item,
                    &OrderItemChange {
                        status: Some(ItemStatus::Cancelled),
                        cancel_reason: Some("payment window expired".to_string()),
                        ..OrderItemChange::default()
                    },
                )
                .await?;

            self.catalog
                .restock(tx, item.product_uuid, &item.size, item.quantity)
                .await?;
        }

        if order.price.referral_bonus > 0 {
            self.customers
                .restore_referral_credit(tx, order.customer_uuid, order.price.referral_bonus)
                .await?;
        }

        self.orders
            .update_order_state(
                tx,
                order.uuid,
                order,
                &OrderStateChange {
                    status: Some(OrderStatus::Cancelled),
                    payment_status: Some(PaymentStatus::Failed),
                    cancelled_at: Some(now),
                    ..OrderStateChange::default()
                },
            )
            .await?;

        warn!(order_uuid = %order.uuid, "expired unverified gateway intent");

        Ok(true)
    }

    fn expiry_due(&self, order: &Order, now: Timestamp) -> bool {
        order.status == OrderStatus::Initialized
            && order.payment.method == PaymentMethod::Gateway
            && order
                .timeline
                .placed_at
                .and_then(|placed| placed.checked_add(self.policy.intent_expiry).ok())
                .is_some_and(|deadline| now > deadline)
    }

    /// Prorated amount the customer paid for one line: its sale value
    /// less its own seasonal offer and its share of the order-level
    /// coupon and referral deductions.
    fn item_payable(order: &Order, item: &OrderItem) -> u64 {
        let active_sale_value = order.active_sale_value();
        let sale = item.sale_value();

        let coupon_share = prorated_deduction(sale, active_sale_value, order.price.coupon_discount);
        let referral_share =
            prorated_deduction(sale, active_sale_value, order.price.referral_bonus);

        sale.saturating_sub(item.offer_value())
            .saturating_sub(coupon_share)
            .saturating_sub(referral_share)
    }

    fn item_cancellation_effect(
        &self,
        order: &Order,
        item: &OrderItem,
    ) -> Result<CancellationPreview, OrdersServiceError> {
        // Item cancellation shares the order-level gate: only orders
        // that could themselves still be cancelled accept item cancels.
        order_transition(order.status, OrderAction::Cancel)?;
        item_transition(item.status, ItemAction::Cancel)?;

        let payable = Self::item_payable(order, item);

        let remaining_payable = order
            .price
            .total
            .saturating_sub(order.price.delivery_fee)
            .saturating_sub(payable);

        let fee_warning = (order.price.delivery_fee == 0
            && remaining_payable > 0
            && remaining_payable < self.policy.partial_cancel_fee_floor)
            .then_some(FeeWarning {
                fee: self.policy.delivery_fee,
                floor: self.policy.partial_cancel_fee_floor,
            });

        let new_fee = match fee_warning {
            Some(warning) => warning.fee,
            None => {
                if remaining_payable == 0 {
                    0
                } else {
                    order.price.delivery_fee
                }
            }
        };

        let refund_amount = if order.payment.status == PaymentStatus::Paid {
            payable
        } else {
            0
        };

        Ok(CancellationPreview {
            refund_amount,
            remaining_total: remaining_payable + new_fee,
            fee_warning,
        })
    }

    /// Remaining breakdown after removing one line, keeping the price
    /// identity intact over the surviving lines.
    fn price_without_item(order: &Order, item: &OrderItem, new_fee: u64) -> PriceBreakdown {
        let active_sale_value = order.active_sale_value();
        let sale = item.sale_value();

        let coupon_share = prorated_deduction(sale, active_sale_value, order.price.coupon_discount);
        let referral_share =
            prorated_deduction(sale, active_sale_value, order.price.referral_bonus);

        let price = &order.price;

        let subtotal = price.subtotal.saturating_sub(item.gross_value());
        let discount = price.discount.saturating_sub(item.markdown_value());
        let special_discount = price.special_discount.saturating_sub(item.offer_value());
        let coupon_discount = price.coupon_discount.saturating_sub(coupon_share);
        let referral_bonus = price.referral_bonus.saturating_sub(referral_share);

        let total = subtotal
            .saturating_sub(discount)
            .saturating_sub(special_discount)
            .saturating_sub(coupon_discount)
            .saturating_sub(referral_bonus)
            + new_fee;

        PriceBreakdown {
            subtotal,
            discount,
            special_discount,
            coupon_discount,
            referral_bonus,
            delivery_fee: new_fee,
            total,
        }
    }

    async fn credit_refund(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        order: OrderUuid,
        amount: u64,
    ) -> Result<(), OrdersServiceError> {
        if amount == 0 {
            return Ok(());
        }

        self.customers.lock_customer(tx, customer).await?;

        self.wallet
            .insert(
                tx,
                &NewWalletTransaction {
                    uuid: WalletTransactionUuid::generate(),
                    customer_uuid: customer,
                    entry: WalletEntry::Credit,
                    amount,
                    reason: WalletReason::OrderRefund,
                    order_uuid: Some(order),
                },
            )
            .await?;

        Ok(())
    }

    /// Re-derive the aggregate status from the items and persist it with
    /// the right stamps. Call after any item-level action.
    async fn settle_aggregate_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
        now: Timestamp,
    ) -> Result<(), OrdersServiceError> {
        let items = self.orders.get_order_items(tx, order.uuid).await?;
        let statuses: Vec<ItemStatus> = items.iter().map(|item| item.status).collect();

        let derived = derive_order_status(order.status, &statuses);

        let mut change = OrderStateChange {
            status: Some(derived),
            ..OrderStateChange::default()
        };

        match derived {
            OrderStatus::Cancelled if order.status != OrderStatus::Cancelled => {
                change.cancelled_at = Some(now);

                if order.payment.status == PaymentStatus::Paid {
                    change.payment_status = Some(PaymentStatus::Refunded);
                }
            }
            OrderStatus::Returned if order.status != OrderStatus::Returned => {
                change.returned_at = Some(now);

                if order.payment.status == PaymentStatus::Paid {
                    change.payment_status = Some(PaymentStatus::Refunded);
                }
            }
            _ => {}
        }

        self.orders
            .update_order_state(tx, order.uuid, order, &change)
            .await?;

        Ok(())
    }

    async fn owned_locked_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        let order = self.load_order(tx, order, true).await?;

        if order.customer_uuid != customer {
            return Err(OrdersServiceError::NotFound);
        }

        Ok(order)
    }
}

fn generate_order_number(now: Timestamp) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();

    format!("KB-{}-{suffix}", now.strftime("%Y%m%d"))
}

#[async_trait]
impl OrdersService for PgOrdersService {
    #[tracing::instrument(
        name = "orders.service.place_order",
        skip(self, place),
        fields(customer_uuid = %customer, order_uuid = %place.uuid, method = place.method.as_str()),
        err
    )]
    async fn place_order(
        &self,
        customer: CustomerUuid,
        place: PlaceOrder,
    ) -> Result<Order, OrdersServiceError> {
        // The gateway round-trip is the only cross-process call; keep it
        // outside the checkout transaction.
        let intent = match place.method {
            PaymentMethod::Gateway => {
                let now = Timestamp::now();

                let mut tx = self.db.begin().await?;
                let draft = self.build_draft(&mut tx, customer, now, false).await?;
                tx.commit().await?;

                let intent = self
                    .gateway
                    .create_intent(&place.uuid.to_string(), draft.breakdown.total)
                    .await?;

                Some(intent)
            }
            _ => None,
        };

        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.execute_checkout(customer, &place, intent.as_ref()).await {
                Err(error) if error.is_retryable() && attempt < CHECKOUT_ATTEMPTS => {
                    warn!(attempt, "retrying checkout after conflict");

                    tokio::time::sleep(std::time::Duration::from_millis(u64::from(attempt) * 25))
                        .await;

                    continue;
                }
                Err(OrdersServiceError::AlreadyExists) => {
                    // Replay of an already-committed checkout (double
                    // submit): hand back the existing order, with no
                    // second debit or stock decrement.
                    return self.get_order(customer, place.uuid).await;
                }
                other => return other,
            }
        }
    }

    #[tracing::instrument(
        name = "orders.service.verify_gateway_payment",
        skip(self, verify),
        fields(customer_uuid = %customer, order_uuid = %verify.order_uuid),
        err
    )]
    async fn verify_gateway_payment(
        &self,
        customer: CustomerUuid,
        verify: VerifyGatewayPayment,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let order = self
            .owned_locked_order(&mut tx, customer, verify.order_uuid)
            .await?;

        if self.maybe_expire(&mut tx, &order, now).await? {
            tx.commit().await?;

            return Err(OrdersServiceError::PaymentVerificationFailed);
        }

        if order.status != OrderStatus::Initialized {
            // Replaying an already-verified payload is a no-op success;
            // anything else is an illegal transition.
            if order.payment.status == PaymentStatus::Paid
                && order.payment.gateway_payment_id.as_deref()
                    == Some(verify.gateway_payment_id.as_str())
            {
                return Ok(order);
            }

            return match order_transition(order.status, OrderAction::ConfirmPayment) {
                Err(rejected) => Err(rejected.into()),
                Ok(_) => Err(OrdersServiceError::PaymentVerificationFailed),
            };
        }

        if order.payment.gateway_order_id.as_deref() != Some(verify.gateway_order_id.as_str()) {
            return Err(OrdersServiceError::PaymentVerificationFailed);
        }

        // A failed verification leaves the order initialized; expiry
        // will reap it.
        self.gateway.verify_signature(
            &verify.gateway_order_id,
            &verify.gateway_payment_id,
            &verify.signature,
        )?;

        let next = order_transition(order.status, OrderAction::ConfirmPayment)?;

        self.orders
            .update_order_state(
                &mut tx,
                order.uuid,
                &order,
                &OrderStateChange {
                    status: Some(next),
                    payment_status: Some(PaymentStatus::Paid),
                    confirmed_at: Some(now),
                    gateway_payment_id: Some(verify.gateway_payment_id.clone()),
                    gateway_signature: Some(verify.signature.clone()),
                    ..OrderStateChange::default()
                },
            )
            .await?;

        if let Some(code) = &order.coupon_code
            && let Some(coupon) = self.coupons.find_by_code(&mut tx, code).await?
        {
            // The price was locked at placement; the redemption is
            // recorded unguarded even if the budget filled up meanwhile.
            self.coupons
                .consume(&mut tx, coupon.uuid, order.uuid, customer, false)
                .await?;
        }

        let refreshed = self.load_order(&mut tx, order.uuid, false).await?;

        tx.commit().await?;

        info!(order_uuid = %refreshed.uuid, "confirmed gateway payment");

        Ok(refreshed)
    }

    async fn list_orders(
        &self,
        customer: CustomerUuid,
        page: Page,
    ) -> Result<Vec<OrderSummary>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let orders = self.orders.list_orders(&mut tx, customer, page).await?;

        tx.commit().await?;

        Ok(orders)
    }

    async fn get_order(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let loaded = self.load_order(&mut tx, order, false).await?;

        if loaded.customer_uuid != customer {
            return Err(OrdersServiceError::NotFound);
        }

        if self.expiry_due(&loaded, now) {
            // Upgrade to a locked read and apply the expiry.
            let locked = self.load_order(&mut tx, order, true).await?;

            self.maybe_expire(&mut tx, &locked, now).await?;

            let refreshed = self.load_order(&mut tx, order, false).await?;

            tx.commit().await?;

            return Ok(refreshed);
        }

        tx.commit().await?;

        Ok(loaded)
    }

    async fn preview_cancel_order(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
    ) -> Result<CancellationPreview, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.owned_locked_order(&mut tx, customer, order).await?;

        order_transition(order.status, OrderAction::Cancel)?;

        let refund_amount = if order.payment.status == PaymentStatus::Paid {
            order.price.total
        } else {
            0
        };

        Ok(CancellationPreview {
            refund_amount,
            remaining_total: 0,
            fee_warning: None,
        })
    }

    #[tracing::instrument(
        name = "orders.service.cancel_order",
        skip(self, cancel),
        fields(customer_uuid = %customer, order_uuid = %order),
        err
    )]
    async fn cancel_order(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
        cancel: CancelOrder,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let order = self.owned_locked_order(&mut tx, customer, order).await?;

        let next = order_transition(order.status, OrderAction::Cancel)?;

        for item in &order.items {
            if item_transition(item.status, ItemAction::Cancel).is_err() {
                continue;
            }

            self.orders
                .update_order_item(
                    &mut tx,
                    item.uuid,
                    item,
                    &OrderItemChange {
                        status: Some(ItemStatus::Cancelled),
                        cancel_reason: cancel.reason.clone(),
                        ..OrderItemChange::default()
                    },
                )
                .await?;

            self.catalog
                .restock(&mut tx, item.product_uuid, &item.size, item.quantity)
                .await?;
        }

        // Refund whatever was actually paid, whichever way it was paid.
        let paid = order.payment.status == PaymentStatus::Paid;

        if paid {
            self.credit_refund(&mut tx, customer, order.uuid, order.price.total)
                .await?;
        }

        self.orders
            .update_order_state(
                &mut tx,
                order.uuid,
                &order,
                &OrderStateChange {
                    status: Some(next),
                    payment_status: Some(if paid {
                        PaymentStatus::Refunded
                    } else {
                        PaymentStatus::Failed
                    }),
                    cancelled_at: Some(now),
                    ..OrderStateChange::default()
                },
            )
            .await?;

        let refreshed = self.load_order(&mut tx, order.uuid, false).await?;

        tx.commit().await?;

        info!(order_uuid = %refreshed.uuid, refund = order.price.total, "cancelled order");

        Ok(refreshed)
    }

    async fn preview_cancel_item(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<CancellationPreview, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.owned_locked_order(&mut tx, customer, order).await?;

        let item = order
            .items
            .iter()
            .find(|candidate| candidate.uuid == item)
            .ok_or(OrdersServiceError::NotFound)?;

        self.item_cancellation_effect(&order, item)
    }

    #[tracing::instrument(
        name = "orders.service.cancel_item",
        skip(self, cancel),
        fields(customer_uuid = %customer, order_uuid = %order, item_uuid = %item),
        err
    )]
    async fn cancel_item(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
        cancel: CancelItem,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let order = self.owned_locked_order(&mut tx, customer, order).await?;

        let line = order
            .items
            .iter()
            .find(|candidate| candidate.uuid == item)
            .ok_or(OrdersServiceError::NotFound)?;

        let preview = self.item_cancellation_effect(&order, line)?;

        // The fee impact is a confirmation gate, not a hard block: the
        // commit goes through once the caller has acknowledged it.
        if let Some(warning) = preview.fee_warning
            && !cancel.acknowledge_fee
        {
            return Err(OrdersServiceError::FeeAcknowledgementRequired { fee: warning.fee });
        }

        let new_fee = match preview.fee_warning {
            Some(warning) => warning.fee,
            None if preview.remaining_total == 0 => 0,
            None => order.price.delivery_fee,
        };

        self.orders
            .update_order_item(
                &mut tx,
                line.uuid,
                line,
                &OrderItemChange {
                    status: Some(ItemStatus::Cancelled),
                    cancel_reason: cancel.reason.clone(),
                    refund_delta: preview.refund_amount,
                    ..OrderItemChange::default()
                },
            )
            .await?;

        self.catalog
            .restock(&mut tx, line.product_uuid, &line.size, line.quantity)
            .await?;

        self.credit_refund(&mut tx, customer, order.uuid, preview.refund_amount)
            .await?;

        let remaining_price = Self::price_without_item(&order, line, new_fee);

        self.orders
            .update_order_price(&mut tx, order.uuid, &remaining_price)
            .await?;

        self.settle_aggregate_status(&mut tx, &order, now).await?;

        let refreshed = self.load_order(&mut tx, order.uuid, false).await?;

        tx.commit().await?;

        info!(
            order_uuid = %refreshed.uuid,
            item_uuid = %item,
            refund = preview.refund_amount,
            "cancelled order item"
        );

        Ok(refreshed)
    }

    #[tracing::instrument(
        name = "orders.service.request_return",
        skip(self, reason),
        fields(customer_uuid = %customer, order_uuid = %order, item_uuid = %item),
        err
    )]
    async fn request_return(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
        reason: String,
    ) -> Result<Order, OrdersServiceError> {
        if reason.trim().is_empty() {
            return Err(OrdersServiceError::ReasonRequired);
        }

        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let order = self.owned_locked_order(&mut tx, customer, order).await?;

        let line = order
            .items
            .iter()
            .find(|candidate| candidate.uuid == item)
            .ok_or(OrdersServiceError::NotFound)?;

        let next = item_transition(line.status, ItemAction::RequestReturn)?;

        self.orders
            .update_order_item(
                &mut tx,
                line.uuid,
                line,
                &OrderItemChange {
                    status: Some(next),
                    return_reason: Some(reason),
                    ..OrderItemChange::default()
                },
            )
            .await?;

        self.settle_aggregate_status(&mut tx, &order, now).await?;

        let refreshed = self.load_order(&mut tx, order.uuid, false).await?;

        tx.commit().await?;

        Ok(refreshed)
    }

    #[tracing::instrument(
        name = "orders.service.set_status",
        skip(self),
        fields(order_uuid = %order, target = target.as_str()),
        err
    )]
    async fn set_status(
        &self,
        order: OrderUuid,
        target: OrderStatus,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let order = self.load_order(&mut tx, order, true).await?;

        let next = order_transition(order.status, OrderAction::Advance(target))?;

        let (item_target, advance_from) = match next {
            OrderStatus::Processing => (ItemStatus::Processing, vec![ItemStatus::Pending]),
            OrderStatus::Shipped => (
                ItemStatus::Shipped,
                vec![ItemStatus::Pending, ItemStatus::Processing],
            ),
            OrderStatus::Delivered => (
                ItemStatus::Delivered,
                vec![ItemStatus::Pending, ItemStatus::Processing, ItemStatus::Shipped],
            ),
            _ => (ItemStatus::Pending, Vec::new()),
        };

        if !advance_from.is_empty() {
            self.orders
                .advance_order_items(&mut tx, order.uuid, &advance_from, item_target)
                .await?;
        }

        let mut change = OrderStateChange {
            status: Some(next),
            ..OrderStateChange::default()
        };

        match next {
            OrderStatus::Shipped => change.shipped_at = Some(now),
            OrderStatus::Delivered => {
                change.delivered_at = Some(now);

                // Cash on delivery settles physically at the door.
                if order.payment.method == PaymentMethod::Cod
                    && order.payment.status == PaymentStatus::Pending
                {
                    change.payment_status = Some(PaymentStatus::Paid);
                }
            }
            _ => {}
        }

        self.orders
            .update_order_state(&mut tx, order.uuid, &order, &change)
            .await?;

        let refreshed = self.load_order(&mut tx, order.uuid, false).await?;

        tx.commit().await?;

        info!(order_uuid = %refreshed.uuid, status = next.as_str(), "advanced order status");

        Ok(refreshed)
    }

    #[tracing::instrument(
        name = "orders.service.approve_return",
        skip(self),
        fields(order_uuid = %order, item_uuid = %item),
        err
    )]
    async fn approve_return(
        &self,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let order = self.load_order(&mut tx, order, true).await?;
        let line = self.orders.get_order_item(&mut tx, order.uuid, item).await?;

        let next = item_transition(line.status, ItemAction::ApproveReturn)?;

        self.orders
            .update_order_item(
                &mut tx,
                line.uuid,
                &line,
                &OrderItemChange {
                    status: Some(next),
                    ..OrderItemChange::default()
                },
            )
            .await?;

        self.settle_aggregate_status(&mut tx, &order, now).await?;

        let refreshed = self.load_order(&mut tx, order.uuid, false).await?;

        tx.commit().await?;

        Ok(refreshed)
    }

    #[tracing::instrument(
        name = "orders.service.reject_return",
        skip(self, reason),
        fields(order_uuid = %order, item_uuid = %item),
        err
    )]
    async fn reject_return(
        &self,
        order: OrderUuid,
        item: OrderItemUuid,
        reason: String,
    ) -> Result<Order, OrdersServiceError> {
        if reason.trim().is_empty() {
            return Err(OrdersServiceError::ReasonRequired);
        }

        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let order = self.load_order(&mut tx, order, true).await?;
        let line = self.orders.get_order_item(&mut tx, order.uuid, item).await?;

        let next = item_transition(line.status, ItemAction::RejectReturn)?;

        self.orders
            .update_order_item(
                &mut tx,
                line.uuid,
                &line,
                &OrderItemChange {
                    status: Some(next),
                    reject_reason: Some(reason),
                    ..OrderItemChange::default()
                },
            )
            .await?;

        self.settle_aggregate_status(&mut tx, &order, now).await?;

        let refreshed = self.load_order(&mut tx, order.uuid, false).await?;

        tx.commit().await?;

        Ok(refreshed)
    }

    #[tracing::instrument(
        name = "orders.service.confirm_return_received",
        skip(self),
        fields(order_uuid = %order, item_uuid = %item),
        err
    )]
    async fn confirm_return_received(
        &self,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<Order, OrdersServiceError> {
        let now = Timestamp::now();

        let mut tx = self.db.begin().await?;

        let order = self.load_order(&mut tx, order, true).await?;
        let line = self.orders.get_order_item(&mut tx, order.uuid, item).await?;

        let next = item_transition(line.status, ItemAction::ConfirmReturnReceived)?;

        // Restock, wallet credit and the status flip commit together or
        // not at all. No refund happens before this point.
        let refund = if order.payment.status == PaymentStatus::Paid {
            Self::item_payable(&order, &line)
        } else {
            0
        };

        self.orders
            .update_order_item(
                &mut tx,
                line.uuid,
                &line,
                &OrderItemChange {
                    status: Some(next),
                    refund_delta: refund,
                    ..OrderItemChange::default()
                },
            )
            .await?;

        self.catalog
            .restock(&mut tx, line.product_uuid, &line.size, line.quantity)
            .await?;

        self.credit_refund(&mut tx, order.customer_uuid, order.uuid, refund)
            .await?;

        self.settle_aggregate_status(&mut tx, &order, now).await?;

        let refreshed = self.load_order(&mut tx, order.uuid, false).await?;

        tx.commit().await?;

        info!(
            order_uuid = %refreshed.uuid,
            item_uuid = %item,
            refund,
            "confirmed return receipt"
        );

        Ok(refreshed)
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Convert the live cart into an order. The client-supplied UUID is
    /// the idempotency key: replays return the already-placed order.
    async fn place_order(
        &self,
        customer: CustomerUuid,
        place: PlaceOrder,
    ) -> Result<Order, OrdersServiceError>;

    /// Verify a gateway callback. Idempotent: replaying the same payload
    /// yields exactly one paid transition.
    async fn verify_gateway_payment(
        &self,
        customer: CustomerUuid,
        verify: VerifyGatewayPayment,
    ) -> Result<Order, OrdersServiceError>;

    /// The customer's orders, newest first.
    async fn list_orders(
        &self,
        customer: CustomerUuid,
        page: Page,
    ) -> Result<Vec<OrderSummary>, OrdersServiceError>;

    /// One order with its items. Applies lazy intent expiry.
    async fn get_order(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError>;

    /// Dry-run of an order-level cancellation.
    async fn preview_cancel_order(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
    ) -> Result<CancellationPreview, OrdersServiceError>;

    /// Cancel the whole order: every non-terminal item is cancelled and
    /// restocked, and the paid amount lands back in the wallet.
    async fn cancel_order(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
        cancel: CancelOrder,
    ) -> Result<Order, OrdersServiceError>;

    /// Dry-run of an item-level cancellation, including the fee impact
    /// on the remainder.
    async fn preview_cancel_item(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<CancellationPreview, OrdersServiceError>;

    /// Cancel one line. Requires fee acknowledgement when the preview
    /// carried a warning.
    async fn cancel_item(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
        cancel: CancelItem,
    ) -> Result<Order, OrdersServiceError>;

    /// Customer return request for a delivered line; the reason is
    /// mandatory.
    async fn request_return(
        &self,
        customer: CustomerUuid,
        order: OrderUuid,
        item: OrderItemUuid,
        reason: String,
    ) -> Result<Order, OrdersServiceError>;

    /// Admin status advance along the fulfilment track.
    async fn set_status(
        &self,
        order: OrderUuid,
        target: OrderStatus,
    ) -> Result<Order, OrdersServiceError>;

    /// Admin approval of a requested return.
    async fn approve_return(
        &self,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<Order, OrdersServiceError>;

    /// Admin rejection of a requested return; terminal, reason required.
    async fn reject_return(
        &self,
        order: OrderUuid,
        item: OrderItemUuid,
        reason: String,
    ) -> Result<Order, OrdersServiceError>;

    /// Admin confirmation that a returned item arrived: restock and
    /// wallet credit happen atomically with the status flip.
    async fn confirm_return_received(
        &self,
        order: OrderUuid,
        item: OrderItemUuid,
    ) -> Result<Order, OrdersServiceError>;
}
