//! Shared helpers for handler tests: mocked services wired into a
//! salvo `Service`, with a stubbed identity instead of the real auth
//! middleware.

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{affix_state::inject, prelude::*};
use uuid::Uuid;

use kitbag_app::{
    auth::{MockAuthService, models::Identity},
    context::AppContext,
    domain::{
        carts::{MockCartsService, models::PricedCart},
        catalog::MockCatalogService,
        coupons::MockCouponsService,
        customers::{MockCustomersService, models::CustomerUuid},
        orders::{
            MockOrdersService,
            models::{Order, OrderStatus, OrderUuid, ShippingAddress, Timeline},
        },
        payments::models::{Payment, PaymentMethod, PaymentStatus},
        pricing::models::PriceBreakdown,
        wallet::MockWalletService,
    },
};

use crate::{auth::middleware::require_admin, state::State};

pub(crate) const TEST_CUSTOMER_UUID: CustomerUuid = CustomerUuid::from_uuid(Uuid::nil());

/// An app context where every service is an expectation-less mock;
/// tests swap in the mock under test.
pub(crate) fn mock_app() -> AppContext {
    AppContext {
        auth: Arc::new(MockAuthService::new()),
        carts: Arc::new(MockCartsService::new()),
        catalog: Arc::new(MockCatalogService::new()),
        coupons: Arc::new(MockCouponsService::new()),
        customers: Arc::new(MockCustomersService::new()),
        orders: Arc::new(MockOrdersService::new()),
        wallet: Arc::new(MockWalletService::new()),
    }
}

pub(crate) fn state_with_auth(auth: MockAuthService) -> Arc<State> {
    let mut app = mock_app();
    app.auth = Arc::new(auth);

    State::from_app_context(app)
}

#[salvo::handler]
async fn stub_customer_identity(depot: &mut Depot) {
    use crate::extensions::*;

    depot.insert_identity(Identity {
        customer: TEST_CUSTOMER_UUID,
        is_admin: false,
    });
}

#[salvo::handler]
async fn stub_admin_identity(depot: &mut Depot) {
    use crate::extensions::*;

    depot.insert_identity(Identity {
        customer: TEST_CUSTOMER_UUID,
        is_admin: true,
    });
}

fn service_with_state(state: Arc<State>, router: Router, is_admin: bool) -> Service {
    let identity_hoop = if is_admin {
        Router::new().hoop(stub_admin_identity)
    } else {
        Router::new().hoop(stub_customer_identity)
    };

    Service::new(
        Router::new()
            .hoop(inject(state))
            .push(identity_hoop.push(router)),
    )
}

pub(crate) fn customer_service(carts: MockCartsService, router: Router) -> Service {
    let mut app = mock_app();
    app.carts = Arc::new(carts);

    service_with_state(State::from_app_context(app), router, false)
}

pub(crate) fn orders_service(orders: MockOrdersService, router: Router) -> Service {
    let mut app = mock_app();
    app.orders = Arc::new(orders);

    service_with_state(State::from_app_context(app), router, false)
}

/// Orders routes mounted behind the admin gate, with a customer or
/// admin identity stubbed in.
pub(crate) fn orders_service_router(
    orders: MockOrdersService,
    router: Router,
    is_admin: bool,
) -> Service {
    let mut app = mock_app();
    app.orders = Arc::new(orders);

    let identity_hoop = if is_admin {
        Router::new().hoop(stub_admin_identity)
    } else {
        Router::new().hoop(stub_customer_identity)
    };

    Service::new(
        Router::new()
            .hoop(inject(State::from_app_context(app)))
            .push(identity_hoop.hoop(require_admin).push(router)),
    )
}

pub(crate) fn admin_service(orders: MockOrdersService, router: Router) -> Service {
    orders_service_router(orders, router, true)
}

pub(crate) fn wallet_service(wallet: MockWalletService, router: Router) -> Service {
    let mut app = mock_app();
    app.wallet = Arc::new(wallet);

    service_with_state(State::from_app_context(app), router, false)
}

pub(crate) fn make_priced_cart() -> PricedCart {
    use kitbag_app::domain::carts::models::{Cart, CartUuid};

    PricedCart {
        cart: Cart {
            uuid: CartUuid::generate(),
            customer_uuid: TEST_CUSTOMER_UUID,
            coupon_code: None,
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
            deleted_at: None,
        },
        items: Vec::new(),
        price: PriceBreakdown::default(),
        coupon_rejection: None,
    }
}

pub(crate) fn make_order(uuid: Uuid) -> Order {
    Order {
        uuid: OrderUuid::from_uuid(uuid),
        order_number: "KB-20250601-TEST01".to_string(),
        customer_uuid: TEST_CUSTOMER_UUID,
        status: OrderStatus::Pending,
        payment: Payment {
            method: PaymentMethod::Cod,
            status: PaymentStatus::Pending,
            gateway_order_id: None,
            gateway_payment_id: None,
            gateway_signature: None,
        },
        coupon_code: None,
        price: PriceBreakdown::default(),
        shipping: ShippingAddress {
            recipient: "Test Customer".to_string(),
            line1: "12 Stadium Road".to_string(),
            line2: None,
            city: "Kochi".to_string(),
            state: "Kerala".to_string(),
            postal_code: "682001".to_string(),
            phone: "9999999999".to_string(),
        },
        timeline: Timeline {
            placed_at: Some(Timestamp::now()),
            ..Timeline::default()
        },
        items: Vec::new(),
        created_at: Timestamp::now(),
        updated_at: Timestamp::now(),
    }
}
