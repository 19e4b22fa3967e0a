//! Coupons service.
//!
//! Coupon administration happens elsewhere (seeded via the admin CLI);
//! the checkout path consumes coupons through the repository inside its
//! own transaction. This service is the read boundary plus CLI
//! provisioning.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::coupons::{
        PgCouponsRepository,
        errors::CouponsServiceError,
        models::{Coupon, NewCoupon},
    },
};

#[derive(Debug, Clone)]
pub struct PgCouponsService {
    db: Db,
    repository: PgCouponsRepository,
}

impl PgCouponsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCouponsRepository::new(),
        }
    }
}

#[async_trait]
impl CouponsService for PgCouponsService {
    async fn find_by_code(&self, code: &str) -> Result<Coupon, CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let coupon = self
            .repository
            .find_by_code(&mut tx, code)
            .await?
            .ok_or(CouponsServiceError::NotFound)?;

        tx.commit().await?;

        Ok(coupon)
    }

    async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon, CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_coupon(&mut tx, &coupon).await?;

        tx.commit().await?;

        Ok(created)
    }
}

#[automock]
#[async_trait]
pub trait CouponsService: Send + Sync {
    /// Fetch a coupon by its (case-insensitive) code.
    async fn find_by_code(&self, code: &str) -> Result<Coupon, CouponsServiceError>;

    /// Create a coupon (admin CLI).
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon, CouponsServiceError>;
}
