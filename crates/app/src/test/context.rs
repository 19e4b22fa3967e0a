//! Test context for service-level integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;

use crate::{
    auth::token::{generate_api_token, hash_api_token},
    config::CheckoutPolicy,
    database::Db,
    domain::{
        carts::{CartsService, PgCartsService, models::CartItemUuid, models::NewCartItem},
        catalog::{
            CatalogService, PgCatalogService,
            models::{NewProduct, ProductUuid},
        },
        coupons::{
            CouponsService, PgCouponsService,
            models::{CouponUuid, NewCoupon},
        },
        customers::{
            CustomersService, PgCustomersService,
            models::{AddressUuid, CustomerUuid, NewAddress, NewCustomer},
        },
        orders::{
            OrdersService, PgOrdersService,
            models::{Order, OrderUuid, PlaceOrder, VerifyGatewayPayment},
        },
        payments::{
            GatewayError, PaymentGateway,
            models::{GatewayIntent, PaymentMethod},
        },
        pricing::models::CouponKind,
        wallet::{PgWalletService, WalletService},
    },
};

use super::db::TestDb;

/// Deterministic in-process gateway: the intent id derives from the
/// receipt, and `"valid"` is the one accepted signature.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FakeGateway;

pub(crate) const VALID_SIGNATURE: &str = "valid";

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(
        &self,
        receipt: &str,
        amount: u64,
    ) -> Result<GatewayIntent, GatewayError> {
        Ok(GatewayIntent {
            gateway_order_id: format!("gw_{receipt}"),
            amount,
            currency: "INR".to_string(),
        })
    }

    fn verify_signature(
        &self,
        _gateway_order_id: &str,
        _gateway_payment_id: &str,
        signature: &str,
    ) -> Result<(), GatewayError> {
        if signature == VALID_SIGNATURE {
            Ok(())
        } else {
            Err(GatewayError::VerificationFailed)
        }
    }
}

pub(crate) struct TestContext {
    pub db: TestDb,
    pub policy: CheckoutPolicy,
    pub customer: CustomerUuid,
    pub address: AddressUuid,
    pub carts: PgCartsService,
    pub catalog: PgCatalogService,
    pub coupons: PgCouponsService,
    pub customers: PgCustomersService,
    pub orders: PgOrdersService,
    pub wallet: PgWalletService,
}

impl TestContext {
    pub(crate) async fn new() -> Self {
        Self::with_policy(test_policy()).await
    }

    pub(crate) async fn with_policy(policy: CheckoutPolicy) -> Self {
        let test_db = TestDb::new().await;
        let db = Db::new(test_db.pool().clone());

        let customers = PgCustomersService::new(db.clone());

        let customer = customers
            .create_customer(NewCustomer {
                uuid: CustomerUuid::generate(),
                name: "Test Customer".to_string(),
                token_hash: hash_api_token(&generate_api_token()),
                is_admin: false,
            })
            .await
            .expect("Failed to create default test customer")
            .uuid;

        let address = customers
            .create_address(NewAddress {
                uuid: AddressUuid::generate(),
                customer_uuid: customer,
                recipient: "Test Customer".to_string(),
                line1: "12 Stadium Road".to_string(),
                line2: None,
                city: "Kochi".to_string(),
                state: "Kerala".to_string(),
                postal_code: "682001".to_string(),
                phone: "9999999999".to_string(),
            })
            .await
            .expect("Failed to create default test address")
            .uuid;

        Self {
            policy: policy.clone(),
            customer,
            address,
            carts: PgCartsService::new(db.clone(), policy.clone()),
            catalog: PgCatalogService::new(db.clone()),
            coupons: PgCouponsService::new(db.clone()),
            customers,
            orders: PgOrdersService::new(db.clone(), policy, Arc::new(FakeGateway)),
            wallet: PgWalletService::new(db),
            db: test_db,
        }
    }

    /// Create an additional customer, for ownership-isolation tests.
    pub(crate) async fn create_customer(&self, name: &str) -> CustomerUuid {
        self.customers
            .create_customer(NewCustomer {
                uuid: CustomerUuid::generate(),
                name: name.to_string(),
                token_hash: hash_api_token(&generate_api_token()),
                is_admin: false,
            })
            .await
            .expect("Failed to create test customer")
            .uuid
    }

    pub(crate) async fn create_product(
        &self,
        name: &str,
        list_price: u64,
        sale_price: u64,
    ) -> Result<ProductUuid, crate::domain::catalog::CatalogServiceError> {
        let product = self
            .catalog
            .create_product(NewProduct {
                uuid: ProductUuid::generate(),
                name: name.to_string(),
                list_price,
                sale_price,
                offer_pct: None,
            })
            .await?;

        Ok(product.uuid)
    }

    /// Create a stocked product ready to order.
    pub(crate) async fn stocked_product(
        &self,
        name: &str,
        price: u64,
        size: &str,
        stock: u64,
    ) -> ProductUuid {
        let product = self
            .create_product(name, price, price)
            .await
            .expect("Failed to create product");

        self.catalog
            .set_stock(product, size, stock)
            .await
            .expect("Failed to stock product");

        product
    }

    pub(crate) async fn add_to_cart(
        &self,
        product: ProductUuid,
        size: &str,
        quantity: u32,
    ) -> Result<CartItemUuid, crate::domain::carts::CartsServiceError> {
        let uuid = CartItemUuid::generate();

        self.carts
            .add_item(
                self.customer,
                NewCartItem {
                    uuid,
                    product_uuid: product,
                    size: size.to_string(),
                    quantity,
                },
            )
            .await?;

        Ok(uuid)
    }

    /// Create a percentage coupon in a wide validity window.
    pub(crate) async fn create_coupon(
        &self,
        code: &str,
        percentage: u64,
        max_discount: Option<u64>,
        min_purchase: u64,
    ) -> Result<CouponUuid, crate::domain::coupons::CouponsServiceError> {
        let coupon = self
            .coupons
            .create_coupon(NewCoupon {
                uuid: CouponUuid::generate(),
                code: code.to_string(),
                kind: CouponKind::Percentage,
                value: percentage,
                min_purchase,
                max_discount,
                usage_limit: None,
                per_user_limit: 1,
                starts_at: Timestamp::UNIX_EPOCH,
                expires_at: "2100-01-01T00:00:00Z".parse().expect("valid timestamp"),
            })
            .await?;

        Ok(coupon.uuid)
    }

    pub(crate) async fn fund_wallet(&self, amount: u64) {
        self.wallet
            .top_up(self.customer, amount)
            .await
            .expect("Failed to fund wallet");
    }

    pub(crate) async fn wallet_balance(&self) -> u64 {
        self.wallet
            .summary(self.customer, crate::database::Page::default())
            .await
            .expect("Failed to read wallet")
            .balance
    }

    pub(crate) async fn stock_of(&self, product: ProductUuid, size: &str) -> u64 {
        self.catalog
            .get_stock(product, size)
            .await
            .expect("Failed to read stock")
            .stock
    }

    pub(crate) async fn place_order(
        &self,
        method: PaymentMethod,
    ) -> Result<Order, crate::domain::orders::OrdersServiceError> {
        self.orders
            .place_order(
                self.customer,
                PlaceOrder {
                    uuid: OrderUuid::generate(),
                    method,
                    address_uuid: self.address,
                },
            )
            .await
    }

    /// Place a gateway order and verify it with the accepted signature.
    pub(crate) async fn place_verified_gateway_order(
        &self,
    ) -> Result<Order, crate::domain::orders::OrdersServiceError> {
        let order = self.place_order(PaymentMethod::Gateway).await?;

        let gateway_order_id = order
            .payment
            .gateway_order_id
            .clone()
            .expect("gateway order id should be set");

        self.orders
            .verify_gateway_payment(
                self.customer,
                VerifyGatewayPayment {
                    order_uuid: order.uuid,
                    gateway_order_id,
                    gateway_payment_id: "pay_test".to_string(),
                    signature: VALID_SIGNATURE.to_string(),
                },
            )
            .await
    }
}

/// Policy with spec-sized thresholds, amounts in small minor units so
/// scenario tests read like the product requirements.
fn test_policy() -> CheckoutPolicy {
    CheckoutPolicy {
        delivery_fee: 49,
        free_delivery_threshold: 999,
        partial_cancel_fee_floor: 500,
        cod_ceiling: 10_000,
        max_quantity_per_line: 5,
        intent_expiry: jiff::SignedDuration::from_mins(5),
    }
}
