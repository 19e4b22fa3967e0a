//! Catalog service.
//!
//! The catalog proper (names, images, categories) is managed elsewhere;
//! this service is the boundary the order subsystem consumes: price and
//! stock lookups plus the provisioning operations the admin CLI needs.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::catalog::{
        PgCatalogRepository,
        errors::CatalogServiceError,
        models::{NewProduct, Product, ProductUuid, StockLevel},
    },
};

#[derive(Debug, Clone)]
pub struct PgCatalogService {
    db: Db,
    repository: PgCatalogRepository,
}

impl PgCatalogService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCatalogRepository::new(),
        }
    }
}

#[async_trait]
impl CatalogService for PgCatalogService {
    async fn get_product(&self, product: ProductUuid) -> Result<Product, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let product = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(product)
    }

    async fn get_stock(
        &self,
        product: ProductUuid,
        size: &str,
    ) -> Result<StockLevel, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let stock = self.repository.get_stock(&mut tx, product, size).await?;

        tx.commit().await?;

        Ok(stock)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_product(&mut tx, &product).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn set_stock(
        &self,
        product: ProductUuid,
        size: &str,
        stock: u64,
    ) -> Result<(), CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        // Reject unknown products up front; the upsert would otherwise
        // surface an opaque foreign key violation.
        self.repository.get_product(&mut tx, product).await?;

        self.repository
            .upsert_stock(&mut tx, product, size, stock)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Look up a live product.
    async fn get_product(&self, product: ProductUuid) -> Result<Product, CatalogServiceError>;

    /// Current stock for a (product, size).
    async fn get_stock(
        &self,
        product: ProductUuid,
        size: &str,
    ) -> Result<StockLevel, CatalogServiceError>;

    /// Create a product (admin CLI).
    async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogServiceError>;

    /// Set the stock counter for a (product, size) (admin CLI).
    async fn set_stock(
        &self,
        product: ProductUuid,
        size: &str,
        stock: u64,
    ) -> Result<(), CatalogServiceError>;
}
