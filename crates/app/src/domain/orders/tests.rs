//! Order lifecycle integration tests: checkout, payment paths,
//! cancellation and returns against a real database.

use testresult::TestResult;

use crate::{
    config::CheckoutPolicy,
    domain::{
        orders::{
            errors::OrdersServiceError,
            models::{
                CancelItem, CancelOrder, ItemStatus, OrderStatus, OrderUuid, PlaceOrder,
                VerifyGatewayPayment,
            },
            service::OrdersService,
        },
        payments::models::{PaymentMethod, PaymentStatus},
        pricing::errors::CouponRejection,
    },
    test::TestContext,
};

use crate::database::Page;
use crate::domain::carts::CartsService;
use crate::domain::catalog::CatalogService;
use crate::test::VALID_SIGNATURE;

#[tokio::test]
async fn wallet_checkout_debits_stock_and_balance() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 500, "M", 5).await;
    ctx.add_to_cart(product, "M", 2).await?;
    ctx.fund_wallet(1_000).await;

    let order = ctx.place_order(PaymentMethod::Wallet).await?;

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment.status, PaymentStatus::Paid);
    assert_eq!(order.price.subtotal, 1_000);
    assert_eq!(order.price.delivery_fee, 0);
    assert_eq!(order.price.total, 1_000);
    assert!(order.timeline.confirmed_at.is_some());

    assert_eq!(ctx.wallet_balance().await, 0);
    assert_eq!(ctx.stock_of(product, "M").await, 3);

    // The cart was cleared by checkout.
    let cart = ctx.carts.get_cart(ctx.customer).await?;
    assert!(cart.items.is_empty());

    Ok(())
}

#[tokio::test]
async fn wallet_checkout_with_insufficient_balance_changes_nothing() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 500, "M", 5).await;
    ctx.add_to_cart(product, "M", 2).await?;
    ctx.fund_wallet(100).await;

    let result = ctx.place_order(PaymentMethod::Wallet).await;

    assert!(
        matches!(result, Err(OrdersServiceError::InsufficientBalance)),
        "expected InsufficientBalance, got {result:?}"
    );

    // No partial effects: balance, stock and cart are untouched.
    assert_eq!(ctx.wallet_balance().await, 100);
    assert_eq!(ctx.stock_of(product, "M").await, 5);
    assert_eq!(ctx.carts.get_cart(ctx.customer).await?.items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn cod_checkout_stays_payment_pending() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Away Jersey", 700, "L", 3).await;
    ctx.add_to_cart(product, "L", 1).await?;

    let order = ctx.place_order(PaymentMethod::Cod).await?;

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment.status, PaymentStatus::Pending);
    assert_eq!(ctx.wallet_balance().await, 0);
    assert_eq!(ctx.stock_of(product, "L").await, 2);

    Ok(())
}

#[tokio::test]
async fn cod_above_the_ceiling_is_rejected() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Signed Jersey", 20_000, "M", 2).await;
    ctx.add_to_cart(product, "M", 1).await?;

    let result = ctx.place_order(PaymentMethod::Cod).await;

    assert!(
        matches!(
            result,
            Err(OrdersServiceError::CodCeilingExceeded { ceiling: 10_000 })
        ),
        "expected CodCeilingExceeded, got {result:?}"
    );

    assert_eq!(ctx.stock_of(product, "M").await, 2);

    Ok(())
}

#[tokio::test]
async fn checkout_with_stale_stock_is_rejected() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 500, "M", 2).await;
    ctx.add_to_cart(product, "M", 2).await?;

    // Stock drains between carting and checkout.
    ctx.catalog.set_stock(product, "M", 1).await?;
    ctx.fund_wallet(1_000).await;

    let result = ctx.place_order(PaymentMethod::Wallet).await;

    assert!(
        matches!(result, Err(OrdersServiceError::InsufficientStock { .. })),
        "expected InsufficientStock, got {result:?}"
    );

    // The failed checkout held nothing back.
    assert_eq!(ctx.stock_of(product, "M").await, 1);
    assert_eq!(ctx.wallet_balance().await, 1_000);

    Ok(())
}

#[tokio::test]
async fn checkout_replay_returns_the_same_order_once() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 500, "M", 5).await;
    ctx.add_to_cart(product, "M", 2).await?;
    ctx.fund_wallet(2_000).await;

    let place = PlaceOrder {
        uuid: OrderUuid::generate(),
        method: PaymentMethod::Wallet,
        address_uuid: ctx.address,
    };

    let first = ctx.orders.place_order(ctx.customer, place.clone()).await?;

    // Double submit: same order UUID, after the cart is already cleared.
    let product_b = ctx.stocked_product("Away Jersey", 300, "M", 5).await;
    ctx.add_to_cart(product_b, "M", 1).await?;

    let second = ctx.orders.place_order(ctx.customer, place).await?;

    assert_eq!(first.uuid, second.uuid);
    assert_eq!(first.order_number, second.order_number);

    // Exactly one debit and one stock decrement happened.
    assert_eq!(ctx.wallet_balance().await, 1_000);
    assert_eq!(ctx.stock_of(product, "M").await, 3);
    assert_eq!(ctx.stock_of(product_b, "M").await, 5);

    Ok(())
}

#[tokio::test]
async fn gateway_checkout_initializes_and_verifies() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_200, "M", 4).await;
    ctx.add_to_cart(product, "M", 1).await?;

    let order = ctx.place_order(PaymentMethod::Gateway).await?;

    assert_eq!(order.status, OrderStatus::Initialized);
    assert_eq!(order.payment.status, PaymentStatus::Pending);
    assert!(order.payment.gateway_order_id.is_some());
    // Stock is held while the intent awaits confirmation.
    assert_eq!(ctx.stock_of(product, "M").await, 3);

    let gateway_order_id = order.payment.gateway_order_id.clone().expect("intent id");

    let verified = ctx
        .orders
        .verify_gateway_payment(
            ctx.customer,
            VerifyGatewayPayment {
                order_uuid: order.uuid,
                gateway_order_id,
                gateway_payment_id: "pay_123".to_string(),
                signature: VALID_SIGNATURE.to_string(),
            },
        )
        .await?;

    assert_eq!(verified.status, OrderStatus::Pending);
    assert_eq!(verified.payment.status, PaymentStatus::Paid);
    assert!(verified.timeline.confirmed_at.is_some());

    Ok(())
}

#[tokio::test]
async fn gateway_verification_with_bad_signature_leaves_order_initialized() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_200, "M", 4).await;
    ctx.add_to_cart(product, "M", 1).await?;

    let order = ctx.place_order(PaymentMethod::Gateway).await?;
    let gateway_order_id = order.payment.gateway_order_id.clone().expect("intent id");

    let result = ctx
        .orders
        .verify_gateway_payment(
            ctx.customer,
            VerifyGatewayPayment {
                order_uuid: order.uuid,
                gateway_order_id,
                gateway_payment_id: "pay_123".to_string(),
                signature: "forged".to_string(),
            },
        )
        .await;

    assert!(
        matches!(result, Err(OrdersServiceError::PaymentVerificationFailed)),
        "expected PaymentVerificationFailed, got {result:?}"
    );

    let unchanged = ctx.orders.get_order(ctx.customer, order.uuid).await?;

    assert_eq!(unchanged.status, OrderStatus::Initialized);
    assert_eq!(unchanged.payment.status, PaymentStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn gateway_verification_is_idempotent() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_200, "M", 4).await;
    ctx.add_to_cart(product, "M", 1).await?;

    let order = ctx.place_order(PaymentMethod::Gateway).await?;
    let gateway_order_id = order.payment.gateway_order_id.clone().expect("intent id");

    let payload = VerifyGatewayPayment {
        order_uuid: order.uuid,
        gateway_order_id,
        gateway_payment_id: "pay_123".to_string(),
        signature: VALID_SIGNATURE.to_string(),
    };

    let first = ctx
        .orders
        .verify_gateway_payment(ctx.customer, payload.clone())
        .await?;

    let second = ctx
        .orders
        .verify_gateway_payment(ctx.customer, payload)
        .await?;

    assert_eq!(first.status, OrderStatus::Pending);
    assert_eq!(second.status, OrderStatus::Pending);

    // Exactly one stock decrement happened across both calls.
    assert_eq!(ctx.stock_of(product, "M").await, 3);

    Ok(())
}

#[tokio::test]
async fn unverified_intent_expires_on_next_access() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_200, "M", 4).await;
    ctx.add_to_cart(product, "M", 1).await?;

    let order = ctx.place_order(PaymentMethod::Gateway).await?;
    assert_eq!(ctx.stock_of(product, "M").await, 3);

    // Backdate the order beyond the intent window.
    sqlx::query("UPDATE orders SET placed_at = now() - interval '10 minutes' WHERE uuid = $1")
        .bind(order.uuid.into_uuid())
        .execute(ctx.db.pool())
        .await?;

    let expired = ctx.orders.get_order(ctx.customer, order.uuid).await?;

    assert_eq!(expired.status, OrderStatus::Cancelled);
    assert_eq!(expired.payment.status, PaymentStatus::Failed);
    // The inventory hold was released.
    assert_eq!(ctx.stock_of(product, "M").await, 4);

    let verify = ctx
        .orders
        .verify_gateway_payment(
            ctx.customer,
            VerifyGatewayPayment {
                order_uuid: order.uuid,
                gateway_order_id: "gw_whatever".to_string(),
                gateway_payment_id: "pay_late".to_string(),
                signature: VALID_SIGNATURE.to_string(),
            },
        )
        .await;

    assert!(
        verify.is_err(),
        "late verification should fail, got {verify:?}"
    );

    Ok(())
}

#[tokio::test]
async fn coupon_is_applied_and_consumed_at_checkout() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 500, "M", 5).await;
    ctx.add_to_cart(product, "M", 2).await?;
    ctx.create_coupon("SAVE10", 10, Some(100), 500).await?;
    ctx.carts.apply_coupon(ctx.customer, "SAVE10").await?;
    ctx.fund_wallet(900).await;

    let order = ctx.place_order(PaymentMethod::Wallet).await?;

    assert_eq!(order.price.coupon_discount, 100);
    assert_eq!(order.price.total, 900);
    assert_eq!(order.coupon_code.as_deref(), Some("SAVE10"));
    assert_eq!(ctx.wallet_balance().await, 0);

    // Per-user limit: the same coupon cannot be applied again.
    let product_b = ctx.stocked_product("Away Jersey", 600, "M", 5).await;
    ctx.add_to_cart(product_b, "M", 1).await?;

    let result = ctx.carts.apply_coupon(ctx.customer, "SAVE10").await;

    assert!(
        matches!(
            result,
            Err(crate::domain::carts::CartsServiceError::InvalidCoupon(
                CouponRejection::PerUserLimitExhausted
            ))
        ),
        "expected PerUserLimitExhausted, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn full_cancellation_restocks_and_refunds() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 500, "M", 5).await;
    ctx.add_to_cart(product, "M", 2).await?;
    ctx.fund_wallet(1_000).await;

    let order = ctx.place_order(PaymentMethod::Wallet).await?;
    assert_eq!(ctx.wallet_balance().await, 0);

    let cancelled = ctx
        .orders
        .cancel_order(
            ctx.customer,
            order.uuid,
            CancelOrder {
                reason: Some("changed my mind".to_string()),
            },
        )
        .await?;

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.payment.status, PaymentStatus::Refunded);
    assert!(cancelled.timeline.cancelled_at.is_some());

    assert!(
        cancelled
            .items
            .iter()
            .all(|item| item.status == ItemStatus::Cancelled),
        "all items should be cancelled"
    );

    assert_eq!(ctx.stock_of(product, "M").await, 5);
    assert_eq!(ctx.wallet_balance().await, 1_000);

    Ok(())
}

#[tokio::test]
async fn cancelling_a_delivered_order_is_rejected_without_effects() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 500, "M", 5).await;
    ctx.add_to_cart(product, "M", 2).await?;
    ctx.fund_wallet(1_000).await;

    let order = ctx.place_order(PaymentMethod::Wallet).await?;

    ctx.orders
        .set_status(order.uuid, OrderStatus::Delivered)
        .await?;

    let result = ctx
        .orders
        .cancel_order(ctx.customer, order.uuid, CancelOrder::default())
        .await;

    assert!(
        matches!(result, Err(OrdersServiceError::InvalidStateTransition { .. })),
        "expected InvalidStateTransition, got {result:?}"
    );

    // Nothing moved: no restock, no refund, status intact.
    let unchanged = ctx.orders.get_order(ctx.customer, order.uuid).await?;
    assert_eq!(unchanged.status, OrderStatus::Delivered);
    assert_eq!(ctx.stock_of(product, "M").await, 3);
    assert_eq!(ctx.wallet_balance().await, 0);

    Ok(())
}

#[tokio::test]
async fn partial_cancellation_below_the_floor_requires_fee_acknowledgement() -> TestResult {
    // Free delivery above 800 so the original order ships free, but the
    // post-cancellation remainder (400) falls under the 500 floor.
    let policy = CheckoutPolicy {
        delivery_fee: 49,
        free_delivery_threshold: 800,
        partial_cancel_fee_floor: 500,
        cod_ceiling: 10_000,
        max_quantity_per_line: 5,
        intent_expiry: jiff::SignedDuration::from_mins(5),
    };

    let ctx = TestContext::with_policy(policy).await;

    let jersey = ctx.stocked_product("Home Jersey", 500, "M", 5).await;
    let shorts = ctx.stocked_product("Shorts", 400, "M", 5).await;

    ctx.add_to_cart(jersey, "M", 1).await?;
    ctx.add_to_cart(shorts, "M", 1).await?;
    ctx.fund_wallet(900).await;

    let order = ctx.place_order(PaymentMethod::Wallet).await?;
    assert_eq!(order.price.delivery_fee, 0);
    assert_eq!(order.price.total, 900);

    let jersey_item = order
        .items
        .iter()
        .find(|item| item.product_uuid == jersey)
        .expect("jersey line")
        .uuid;

    // The preview surfaces the fee impact before anything commits.
    let preview = ctx
        .orders
        .preview_cancel_item(ctx.customer, order.uuid, jersey_item)
        .await?;

    assert_eq!(preview.refund_amount, 500);
    assert_eq!(preview.remaining_total, 400 + 49);
    let warning = preview.fee_warning.expect("fee warning");
    assert_eq!(warning.fee, 49);
    assert_eq!(warning.floor, 500);

    // Committing without acknowledgement is refused, with no effects.
    let unacknowledged = ctx
        .orders
        .cancel_item(
            ctx.customer,
            order.uuid,
            jersey_item,
            CancelItem {
                reason: Some("too small".to_string()),
                acknowledge_fee: false,
            },
        )
        .await;

    assert!(
        matches!(
            unacknowledged,
            Err(OrdersServiceError::FeeAcknowledgementRequired { fee: 49 })
        ),
        "expected FeeAcknowledgementRequired, got {unacknowledged:?}"
    );

    assert_eq!(ctx.stock_of(jersey, "M").await, 4);

    // Acknowledged: item cancelled, quantity restocked, price refunded,
    // and the remainder picks up the delivery fee.
    let after = ctx
        .orders
        .cancel_item(
            ctx.customer,
            order.uuid,
            jersey_item,
            CancelItem {
                reason: Some("too small".to_string()),
                acknowledge_fee: true,
            },
        )
        .await?;

    assert_eq!(ctx.stock_of(jersey, "M").await, 5);
    assert_eq!(ctx.wallet_balance().await, 500);
    assert_eq!(after.price.delivery_fee, 49);
    assert_eq!(after.price.total, 449);
    assert_eq!(after.status, OrderStatus::Pending);

    let cancelled_line = after
        .items
        .iter()
        .find(|item| item.uuid == jersey_item)
        .expect("jersey line");

    assert_eq!(cancelled_line.status, ItemStatus::Cancelled);
    assert_eq!(cancelled_line.refunded_amount, 500);

    Ok(())
}

#[tokio::test]
async fn cancelling_the_last_item_cancels_the_order() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_000, "M", 5).await;
    ctx.add_to_cart(product, "M", 1).await?;
    ctx.fund_wallet(1_000).await;

    let order = ctx.place_order(PaymentMethod::Wallet).await?;
    let item = order.items[0].uuid;

    let after = ctx
        .orders
        .cancel_item(
            ctx.customer,
            order.uuid,
            item,
            CancelItem {
                reason: None,
                acknowledge_fee: false,
            },
        )
        .await?;

    assert_eq!(after.status, OrderStatus::Cancelled);
    assert_eq!(after.payment.status, PaymentStatus::Refunded);
    assert_eq!(ctx.wallet_balance().await, 1_000);
    assert_eq!(ctx.stock_of(product, "M").await, 5);

    Ok(())
}

#[tokio::test]
async fn admin_advances_the_order_and_its_items() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_000, "M", 5).await;
    ctx.add_to_cart(product, "M", 1).await?;
    ctx.fund_wallet(1_000).await;

    let order = ctx.place_order(PaymentMethod::Wallet).await?;

    let shipped = ctx.orders.set_status(order.uuid, OrderStatus::Shipped).await?;

    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert!(shipped.timeline.shipped_at.is_some());
    assert_eq!(shipped.items[0].status, ItemStatus::Shipped);

    let backwards = ctx
        .orders
        .set_status(order.uuid, OrderStatus::Processing)
        .await;

    assert!(
        matches!(
            backwards,
            Err(OrdersServiceError::InvalidStateTransition { .. })
        ),
        "expected InvalidStateTransition, got {backwards:?}"
    );

    let delivered = ctx
        .orders
        .set_status(order.uuid, OrderStatus::Delivered)
        .await?;

    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.timeline.delivered_at.is_some());
    assert_eq!(delivered.items[0].status, ItemStatus::Delivered);

    Ok(())
}

#[tokio::test]
async fn delivering_a_cod_order_marks_it_paid() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_000, "M", 5).await;
    ctx.add_to_cart(product, "M", 1).await?;

    let order = ctx.place_order(PaymentMethod::Cod).await?;
    assert_eq!(order.payment.status, PaymentStatus::Pending);

    let delivered = ctx
        .orders
        .set_status(order.uuid, OrderStatus::Delivered)
        .await?;

    assert_eq!(delivered.payment.status, PaymentStatus::Paid);

    Ok(())
}

#[tokio::test]
async fn return_request_requires_a_reason() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_000, "M", 5).await;
    ctx.add_to_cart(product, "M", 1).await?;
    ctx.fund_wallet(1_000).await;

    let order = ctx.place_order(PaymentMethod::Wallet).await?;
    ctx.orders
        .set_status(order.uuid, OrderStatus::Delivered)
        .await?;

    let result = ctx
        .orders
        .request_return(ctx.customer, order.uuid, order.items[0].uuid, "  ".to_string())
        .await;

    assert!(
        matches!(result, Err(OrdersServiceError::ReasonRequired)),
        "expected ReasonRequired, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn rejected_return_leaves_stock_and_wallet_untouched() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_000, "M", 5).await;
    ctx.add_to_cart(product, "M", 1).await?;
    ctx.fund_wallet(1_000).await;

    let order = ctx.place_order(PaymentMethod::Wallet).await?;
    ctx.orders
        .set_status(order.uuid, OrderStatus::Delivered)
        .await?;

    let item = order.items[0].uuid;

    ctx.orders
        .request_return(ctx.customer, order.uuid, item, "colour faded".to_string())
        .await?;

    let rejected = ctx
        .orders
        .reject_return(order.uuid, item, "washed".to_string())
        .await?;

    let line = rejected
        .items
        .iter()
        .find(|candidate| candidate.uuid == item)
        .expect("returned line");

    assert_eq!(line.status, ItemStatus::ReturnRejected);
    assert_eq!(line.reject_reason.as_deref(), Some("washed"));

    // No restock, no wallet credit before (or after) a rejection.
    assert_eq!(ctx.stock_of(product, "M").await, 4);
    assert_eq!(ctx.wallet_balance().await, 0);

    Ok(())
}

#[tokio::test]
async fn confirmed_return_restocks_and_credits_the_wallet() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_000, "M", 5).await;
    ctx.add_to_cart(product, "M", 1).await?;
    ctx.fund_wallet(1_000).await;

    let order = ctx.place_order(PaymentMethod::Wallet).await?;
    ctx.orders
        .set_status(order.uuid, OrderStatus::Delivered)
        .await?;

    let item = order.items[0].uuid;

    ctx.orders
        .request_return(ctx.customer, order.uuid, item, "wrong size".to_string())
        .await?;

    let approved = ctx.orders.approve_return(order.uuid, item).await?;

    let line = approved
        .items
        .iter()
        .find(|candidate| candidate.uuid == item)
        .expect("approved line");

    assert_eq!(line.status, ItemStatus::ReturnApproved);

    // No refund happens before the physical receipt is confirmed.
    assert_eq!(ctx.wallet_balance().await, 0);
    assert_eq!(ctx.stock_of(product, "M").await, 4);

    let returned = ctx.orders.confirm_return_received(order.uuid, item).await?;

    let line = returned
        .items
        .iter()
        .find(|candidate| candidate.uuid == item)
        .expect("returned line");

    assert_eq!(line.status, ItemStatus::Returned);
    assert_eq!(line.refunded_amount, 1_000);

    assert_eq!(returned.status, OrderStatus::Returned);
    assert_eq!(returned.payment.status, PaymentStatus::Refunded);
    assert!(returned.timeline.returned_at.is_some());

    assert_eq!(ctx.stock_of(product, "M").await, 5);
    assert_eq!(ctx.wallet_balance().await, 1_000);

    Ok(())
}

#[tokio::test]
async fn approving_a_return_that_was_never_requested_is_rejected() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_000, "M", 5).await;
    ctx.add_to_cart(product, "M", 1).await?;
    ctx.fund_wallet(1_000).await;

    let order = ctx.place_order(PaymentMethod::Wallet).await?;
    ctx.orders
        .set_status(order.uuid, OrderStatus::Delivered)
        .await?;

    let result = ctx
        .orders
        .approve_return(order.uuid, order.items[0].uuid)
        .await;

    assert!(
        matches!(result, Err(OrdersServiceError::InvalidStateTransition { .. })),
        "expected InvalidStateTransition, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn orders_are_listed_newest_first() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 500, "M", 10).await;

    ctx.add_to_cart(product, "M", 1).await?;
    let first = ctx.place_order(PaymentMethod::Cod).await?;

    ctx.add_to_cart(product, "M", 1).await?;
    let second = ctx.place_order(PaymentMethod::Cod).await?;

    let listed = ctx.orders.list_orders(ctx.customer, Page::default()).await?;

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].uuid, second.uuid);
    assert_eq!(listed[1].uuid, first.uuid);

    Ok(())
}

#[tokio::test]
async fn orders_are_not_visible_to_other_customers() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 500, "M", 10).await;
    ctx.add_to_cart(product, "M", 1).await?;

    let order = ctx.place_order(PaymentMethod::Cod).await?;

    let stranger = ctx.create_customer("Stranger").await;

    let get = ctx.orders.get_order(stranger, order.uuid).await;
    assert!(
        matches!(get, Err(OrdersServiceError::NotFound)),
        "expected NotFound, got {get:?}"
    );

    let cancel = ctx
        .orders
        .cancel_order(stranger, order.uuid, CancelOrder::default())
        .await;
    assert!(
        matches!(cancel, Err(OrdersServiceError::NotFound)),
        "expected NotFound, got {cancel:?}"
    );

    Ok(())
}

#[tokio::test]
async fn checkout_with_an_empty_cart_is_rejected() -> TestResult {
    let ctx = TestContext::new().await;

    let result = ctx.place_order(PaymentMethod::Cod).await;

    assert!(
        matches!(result, Err(OrdersServiceError::EmptyCart)),
        "expected EmptyCart, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn verified_gateway_order_can_be_cancelled_with_wallet_refund() -> TestResult {
    let ctx = TestContext::new().await;

    let product = ctx.stocked_product("Home Jersey", 1_200, "M", 4).await;
    ctx.add_to_cart(product, "M", 1).await?;

    let order = ctx.place_verified_gateway_order().await?;
    assert_eq!(order.payment.status, PaymentStatus::Paid);

    let cancelled = ctx
        .orders
        .cancel_order(ctx.customer, order.uuid, CancelOrder::default())
        .await?;

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    // Refund lands in the wallet regardless of the original payment path.
    assert_eq!(ctx.wallet_balance().await, 1_200);
    assert_eq!(ctx.stock_of(product, "M").await, 4);

    Ok(())
}
