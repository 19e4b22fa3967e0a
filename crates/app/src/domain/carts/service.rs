//! Carts service.
//!
//! The cart is the source of truth until checkout. Reads come back
//! priced: lines are joined with live catalog prices and run through the
//! pricing engine, so the client is always a view over server-issued
//! state.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::info;

use crate::{
    config::CheckoutPolicy,
    database::Db,
    domain::{
        carts::{
            PgCartItemsRepository, PgCartsRepository,
            errors::CartsServiceError,
            models::{Cart, CartItemUuid, CartUuid, NewCartItem, PricedCart, PricedCartItem},
        },
        catalog::PgCatalogRepository,
        coupons::PgCouponsRepository,
        customers::{PgCustomersRepository, models::CustomerUuid},
        pricing::{
            self,
            errors::{CouponRejection, PricingError},
            models::{CouponTerms, PricedLine},
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    policy: CheckoutPolicy,
    carts: PgCartsRepository,
    items: PgCartItemsRepository,
    catalog: PgCatalogRepository,
    coupons: PgCouponsRepository,
    customers: PgCustomersRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db, policy: CheckoutPolicy) -> Self {
        Self {
            db,
            policy,
            carts: PgCartsRepository::new(),
            items: PgCartItemsRepository::new(),
            catalog: PgCatalogRepository::new(),
            coupons: PgCouponsRepository::new(),
            customers: PgCustomersRepository::new(),
        }
    }

    async fn get_or_create_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<Cart, CartsServiceError> {
        if let Some(cart) = self.carts.get_live_cart(tx, customer).await? {
            return Ok(cart);
        }

        let cart = self
            .carts
            .create_cart(tx, CartUuid::generate(), customer)
            .await?;

        Ok(cart)
    }

    /// Join the cart lines with live catalog data and price the result.
    /// A coupon that no longer qualifies is reported, not dropped
    /// silently: the breakdown is recomputed without it and the
    /// rejection travels with the cart.
    async fn price_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: Cart,
    ) -> Result<PricedCart, CartsServiceError> {
        let items = self.items.list_items(tx, cart.uuid).await?;

        let mut lines = Vec::with_capacity(items.len());
        let mut priced_items = Vec::with_capacity(items.len());

        for item in &items {
            let product = self.catalog.get_product(tx, item.product_uuid).await?;
            let offer_pct = product.offer_pct.unwrap_or(0);

            lines.push(PricedLine {
                quantity: item.quantity,
                list_price: product.list_price,
                sale_price: product.sale_price,
                offer_pct,
            });

            priced_items.push(PricedCartItem {
                uuid: item.uuid,
                product_uuid: item.product_uuid,
                product_name: product.name,
                size: item.size.clone(),
                quantity: item.quantity,
                unit_list_price: product.list_price,
                unit_sale_price: product.sale_price,
                offer_pct,
                line_total: product.sale_price * u64::from(item.quantity),
            });
        }

        let referral_credit = self
            .customers
            .get_customer(tx, cart.customer_uuid)
            .await?
            .referral_credit;

        let coupon_terms = match &cart.coupon_code {
            Some(code) => self.coupon_terms(tx, code, cart.customer_uuid).await?,
            None => None,
        };

        let now = Timestamp::now();

        let (price, coupon_rejection) = match pricing::quote(
            &lines,
            coupon_terms.as_ref(),
            referral_credit,
            now,
            &self.policy.delivery_policy(),
        ) {
            Ok(price) => (price, None),
            Err(PricingError::Coupon(rejection)) => {
                let without_coupon = pricing::quote(
                    &lines,
                    None,
                    referral_credit,
                    now,
                    &self.policy.delivery_policy(),
                )?;

                (without_coupon, Some(rejection))
            }
            Err(error) => return Err(error.into()),
        };

        Ok(PricedCart {
            cart,
            items: priced_items,
            price,
            coupon_rejection,
        })
    }

    async fn coupon_terms(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
        customer: CustomerUuid,
    ) -> Result<Option<CouponTerms>, CartsServiceError> {
        let Some(coupon) = self.coupons.find_by_code(tx, code).await? else {
            return Ok(None);
        };

        let used_by_customer = self
            .coupons
            .count_customer_redemptions(tx, coupon.uuid, customer)
            .await?;

        Ok(Some(coupon.terms(used_by_customer)))
    }

    /// Validate that `quantity` of the line's (product, size) can be
    /// carried: within the per-line cap and covered by current stock.
    async fn check_line_quantity(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: crate::domain::catalog::models::ProductUuid,
        size: &str,
        quantity: u32,
    ) -> Result<(), CartsServiceError> {
        if quantity > self.policy.max_quantity_per_line {
            return Err(CartsServiceError::QuantityCapExceeded {
                limit: self.policy.max_quantity_per_line,
            });
        }

        let available = match self.catalog.get_stock(tx, product, size).await {
            Ok(level) => level.stock,
            Err(sqlx::Error::RowNotFound) => 0,
            Err(error) => return Err(error.into()),
        };

        if u64::from(quantity) > available {
            return Err(CartsServiceError::InsufficientStock { available });
        }

        Ok(())
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    async fn get_cart(&self, customer: CustomerUuid) -> Result<PricedCart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.get_or_create_cart(&mut tx, customer).await?;
        let priced = self.price_cart(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(priced)
    }

    async fn add_item(
        &self,
        customer: CustomerUuid,
        item: NewCartItem,
    ) -> Result<PricedCart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.get_or_create_cart(&mut tx, customer).await?;
        let product = self.catalog.get_product(&mut tx, item.product_uuid).await?;

        self.check_line_quantity(&mut tx, item.product_uuid, &item.size, item.quantity)
            .await?;

        self.items
            .create_item(&mut tx, cart.uuid, &item, product.sale_price)
            .await?;

        let priced = self.price_cart(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(priced)
    }

    async fn increment_item(
        &self,
        customer: CustomerUuid,
        item: CartItemUuid,
    ) -> Result<PricedCart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts
            .get_live_cart(&mut tx, customer)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        let line = self.items.get_item(&mut tx, cart.uuid, item).await?;

        self.check_line_quantity(&mut tx, line.product_uuid, &line.size, line.quantity + 1)
            .await?;

        self.items
            .set_quantity(&mut tx, item, line.quantity + 1)
            .await?;

        let priced = self.price_cart(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(priced)
    }

    async fn decrement_item(
        &self,
        customer: CustomerUuid,
        item: CartItemUuid,
    ) -> Result<PricedCart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts
            .get_live_cart(&mut tx, customer)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        let line = self.items.get_item(&mut tx, cart.uuid, item).await?;

        if line.quantity <= 1 {
            return Err(CartsServiceError::QuantityAtMinimum);
        }

        self.items
            .set_quantity(&mut tx, item, line.quantity - 1)
            .await?;

        let priced = self.price_cart(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(priced)
    }

    async fn remove_item(
        &self,
        customer: CustomerUuid,
        item: CartItemUuid,
    ) -> Result<PricedCart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts
            .get_live_cart(&mut tx, customer)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        // Scope the delete to this customer's cart.
        self.items.get_item(&mut tx, cart.uuid, item).await?;

        let rows_affected = self.items.delete_item(&mut tx, item).await?;

        if rows_affected == 0 {
            return Err(CartsServiceError::NotFound);
        }

        let priced = self.price_cart(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(priced)
    }

    async fn clear_cart(&self, customer: CustomerUuid) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let Some(cart) = self.carts.get_live_cart(&mut tx, customer).await? else {
            return Ok(());
        };

        self.carts.delete_cart(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        info!(customer_uuid = %customer, "cleared cart");

        Ok(())
    }

    async fn apply_coupon(
        &self,
        customer: CustomerUuid,
        code: &str,
    ) -> Result<PricedCart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.get_or_create_cart(&mut tx, customer).await?;

        let terms = self
            .coupon_terms(&mut tx, code, customer)
            .await?
            .ok_or(CartsServiceError::InvalidCoupon(CouponRejection::NotFound))?;

        self.carts
            .set_coupon(&mut tx, cart.uuid, Some(&terms.code))
            .await?;

        let cart = Cart {
            coupon_code: Some(terms.code.clone()),
            ..cart
        };

        let priced = self.price_cart(&mut tx, cart).await?;

        // Applying a coupon that does not qualify is an error, not a
        // warning; the rejection carries the reason.
        if let Some(rejection) = priced.coupon_rejection.clone() {
            return Err(rejection.into());
        }

        tx.commit().await?;

        Ok(priced)
    }

    async fn remove_coupon(&self, customer: CustomerUuid) -> Result<PricedCart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts
            .get_live_cart(&mut tx, customer)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        self.carts.set_coupon(&mut tx, cart.uuid, None).await?;

        let cart = Cart {
            coupon_code: None,
            ..cart
        };

        let priced = self.price_cart(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(priced)
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// The customer's live cart, priced. Creates an empty cart on first
    /// access.
    async fn get_cart(&self, customer: CustomerUuid) -> Result<PricedCart, CartsServiceError>;

    /// Add a (product, size, quantity) line.
    async fn add_item(
        &self,
        customer: CustomerUuid,
        item: NewCartItem,
    ) -> Result<PricedCart, CartsServiceError>;

    /// Increase a line's quantity by one.
    async fn increment_item(
        &self,
        customer: CustomerUuid,
        item: CartItemUuid,
    ) -> Result<PricedCart, CartsServiceError>;

    /// Decrease a line's quantity by one; the floor is one.
    async fn decrement_item(
        &self,
        customer: CustomerUuid,
        item: CartItemUuid,
    ) -> Result<PricedCart, CartsServiceError>;

    /// Remove a line entirely.
    async fn remove_item(
        &self,
        customer: CustomerUuid,
        item: CartItemUuid,
    ) -> Result<PricedCart, CartsServiceError>;

    /// Drop the whole cart.
    async fn clear_cart(&self, customer: CustomerUuid) -> Result<(), CartsServiceError>;

    /// Apply a coupon to the live cart. Fails when the coupon does not
    /// qualify.
    async fn apply_coupon(
        &self,
        customer: CustomerUuid,
        code: &str,
    ) -> Result<PricedCart, CartsServiceError>;

    /// Remove the applied coupon.
    async fn remove_coupon(&self, customer: CustomerUuid)
    -> Result<PricedCart, CartsServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::catalog::CatalogService;
    use crate::test::TestContext;

    use super::*;

    #[tokio::test]
    async fn empty_cart_prices_to_zero() -> TestResult {
        let ctx = TestContext::new().await;

        let cart = ctx.carts.get_cart(ctx.customer).await?;

        assert!(cart.items.is_empty());
        assert_eq!(cart.price.subtotal, 0);
        assert_eq!(cart.price.total, ctx.policy.delivery_fee);

        Ok(())
    }

    #[tokio::test]
    async fn adding_item_prices_the_cart() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx.create_product("Home Jersey", 500, 500).await?;
        ctx.catalog.set_stock(product, "M", 10).await?;

        let cart = ctx
            .carts
            .add_item(
                ctx.customer,
                NewCartItem {
                    uuid: CartItemUuid::generate(),
                    product_uuid: product,
                    size: "M".to_string(),
                    quantity: 2,
                },
            )
            .await?;

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.price.subtotal, 1000);

        Ok(())
    }

    #[tokio::test]
    async fn adding_more_than_stock_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx.create_product("Away Jersey", 500, 500).await?;
        ctx.catalog.set_stock(product, "S", 1).await?;

        let result = ctx
            .carts
            .add_item(
                ctx.customer,
                NewCartItem {
                    uuid: CartItemUuid::generate(),
                    product_uuid: product,
                    size: "S".to_string(),
                    quantity: 2,
                },
            )
            .await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::InsufficientStock { available: 1 })
            ),
            "expected InsufficientStock, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn adding_beyond_the_line_cap_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx.create_product("Third Kit", 500, 500).await?;
        ctx.catalog.set_stock(product, "L", 100).await?;

        let result = ctx
            .carts
            .add_item(
                ctx.customer,
                NewCartItem {
                    uuid: CartItemUuid::generate(),
                    product_uuid: product,
                    size: "L".to_string(),
                    quantity: ctx.policy.max_quantity_per_line + 1,
                },
            )
            .await;

        assert!(
            matches!(result, Err(CartsServiceError::QuantityCapExceeded { .. })),
            "expected QuantityCapExceeded, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_line_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx.create_product("Keeper Kit", 700, 700).await?;
        ctx.catalog.set_stock(product, "M", 10).await?;

        ctx.add_to_cart(product, "M", 1).await?;

        let result = ctx
            .carts
            .add_item(
                ctx.customer,
                NewCartItem {
                    uuid: CartItemUuid::generate(),
                    product_uuid: product,
                    size: "M".to_string(),
                    quantity: 1,
                },
            )
            .await;

        assert!(
            matches!(result, Err(CartsServiceError::AlreadyInCart)),
            "expected AlreadyInCart, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn increment_and_decrement_adjust_quantity() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx.create_product("Home Jersey", 500, 500).await?;
        ctx.catalog.set_stock(product, "M", 10).await?;

        let item = ctx.add_to_cart(product, "M", 1).await?;

        let cart = ctx.carts.increment_item(ctx.customer, item).await?;
        assert_eq!(cart.items[0].quantity, 2);

        let cart = ctx.carts.decrement_item(ctx.customer, item).await?;
        assert_eq!(cart.items[0].quantity, 1);

        Ok(())
    }

    #[tokio::test]
    async fn decrement_at_one_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx.create_product("Home Jersey", 500, 500).await?;
        ctx.catalog.set_stock(product, "M", 10).await?;

        let item = ctx.add_to_cart(product, "M", 1).await?;

        let result = ctx.carts.decrement_item(ctx.customer, item).await;

        assert!(
            matches!(result, Err(CartsServiceError::QuantityAtMinimum)),
            "expected QuantityAtMinimum, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn clear_cart_leaves_an_empty_cart_behind() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx.create_product("Home Jersey", 500, 500).await?;
        ctx.catalog.set_stock(product, "M", 10).await?;
        ctx.add_to_cart(product, "M", 2).await?;

        ctx.carts.clear_cart(ctx.customer).await?;

        let cart = ctx.carts.get_cart(ctx.customer).await?;

        assert!(cart.items.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn applying_a_qualifying_coupon_discounts_the_cart() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx.create_product("Home Jersey", 500, 500).await?;
        ctx.catalog.set_stock(product, "M", 10).await?;
        ctx.add_to_cart(product, "M", 2).await?;

        ctx.create_coupon("SAVE10", 10, Some(100), 500).await?;

        let cart = ctx.carts.apply_coupon(ctx.customer, "save10").await?;

        assert_eq!(cart.cart.coupon_code.as_deref(), Some("SAVE10"));
        assert_eq!(cart.price.coupon_discount, 100);

        Ok(())
    }

    #[tokio::test]
    async fn applying_an_unknown_coupon_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;

        let result = ctx.carts.apply_coupon(ctx.customer, "NOPE").await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::InvalidCoupon(CouponRejection::NotFound))
            ),
            "expected NotFound rejection, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn coupon_below_min_purchase_is_rejected_on_apply() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx.create_product("Socks", 100, 100).await?;
        ctx.catalog.set_stock(product, "M", 10).await?;
        ctx.add_to_cart(product, "M", 1).await?;

        ctx.create_coupon("SAVE10", 10, Some(100), 500).await?;

        let result = ctx.carts.apply_coupon(ctx.customer, "SAVE10").await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::InvalidCoupon(
                    CouponRejection::MinPurchaseNotMet { required: 500 }
                ))
            ),
            "expected MinPurchaseNotMet, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn remove_coupon_restores_the_undiscounted_price() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx.create_product("Home Jersey", 500, 500).await?;
        ctx.catalog.set_stock(product, "M", 10).await?;
        ctx.add_to_cart(product, "M", 2).await?;
        ctx.create_coupon("SAVE10", 10, Some(100), 500).await?;

        ctx.carts.apply_coupon(ctx.customer, "SAVE10").await?;
        let cart = ctx.carts.remove_coupon(ctx.customer).await?;

        assert_eq!(cart.cart.coupon_code, None);
        assert_eq!(cart.price.coupon_discount, 0);

        Ok(())
    }
}
