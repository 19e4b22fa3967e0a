//! Customers service.
//!
//! Account management lives outside this system; the operations here are
//! what the admin CLI needs to provision customers and addresses.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::customers::{
        PgCustomersRepository,
        errors::CustomersServiceError,
        models::{Address, Customer, CustomerUuid, NewAddress, NewCustomer},
    },
};

#[derive(Debug, Clone)]
pub struct PgCustomersService {
    db: Db,
    repository: PgCustomersRepository,
}

impl PgCustomersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCustomersRepository::new(),
        }
    }
}

#[async_trait]
impl CustomersService for PgCustomersService {
    async fn get_customer(
        &self,
        customer: CustomerUuid,
    ) -> Result<Customer, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let customer = self.repository.get_customer(&mut tx, customer).await?;

        tx.commit().await?;

        Ok(customer)
    }

    async fn create_customer(
        &self,
        customer: NewCustomer,
    ) -> Result<Customer, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_customer(&mut tx, &customer).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn create_address(&self, address: NewAddress) -> Result<Address, CustomersServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_address(&mut tx, &address).await?;

        tx.commit().await?;

        Ok(created)
    }
}

#[automock]
#[async_trait]
pub trait CustomersService: Send + Sync {
    /// Retrieve a customer.
    async fn get_customer(&self, customer: CustomerUuid)
    -> Result<Customer, CustomersServiceError>;

    /// Create a customer with a pre-hashed API token (admin CLI).
    async fn create_customer(
        &self,
        customer: NewCustomer,
    ) -> Result<Customer, CustomersServiceError>;

    /// Create a shipping address for a customer (admin CLI).
    async fn create_address(&self, address: NewAddress) -> Result<Address, CustomersServiceError>;
}
