//! Wallet service.

use async_trait::async_trait;
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::{
        customers::PgCustomersRepository,
        wallet::{
            PgWalletRepository,
            errors::WalletServiceError,
            models::{
                NewWalletTransaction, Page, WalletEntry, WalletReason, WalletSummary,
                WalletTransaction, WalletTransactionUuid,
            },
        },
    },
};

use crate::domain::customers::models::CustomerUuid;

#[derive(Debug, Clone)]
pub struct PgWalletService {
    db: Db,
    wallet: PgWalletRepository,
    customers: PgCustomersRepository,
}

impl PgWalletService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            wallet: PgWalletRepository::new(),
            customers: PgCustomersRepository::new(),
        }
    }
}

#[async_trait]
impl WalletService for PgWalletService {
    async fn summary(
        &self,
        customer: CustomerUuid,
        page: Page,
    ) -> Result<WalletSummary, WalletServiceError> {
        let mut tx = self.db.begin().await?;

        // Reject unknown customers rather than reporting a zero balance.
        self.customers.get_customer(&mut tx, customer).await?;

        let balance = self.wallet.balance(&mut tx, customer).await?;
        let transactions = self.wallet.list(&mut tx, customer, page).await?;

        tx.commit().await?;

        Ok(WalletSummary {
            balance,
            transactions,
        })
    }

    async fn top_up(
        &self,
        customer: CustomerUuid,
        amount: u64,
    ) -> Result<WalletTransaction, WalletServiceError> {
        let mut tx = self.db.begin().await?;

        self.customers.lock_customer(&mut tx, customer).await?;

        let transaction = self
            .wallet
            .insert(
                &mut tx,
                &NewWalletTransaction {
                    uuid: WalletTransactionUuid::generate(),
                    customer_uuid: customer,
                    entry: WalletEntry::Credit,
                    amount,
                    reason: WalletReason::TopUp,
                    order_uuid: None,
                },
            )
            .await?;

        tx.commit().await?;

        info!(customer_uuid = %customer, amount, "credited wallet top-up");

        Ok(transaction)
    }
}

#[automock]
#[async_trait]
pub trait WalletService: Send + Sync {
    /// Balance plus one page of the ledger, newest first.
    async fn summary(
        &self,
        customer: CustomerUuid,
        page: Page,
    ) -> Result<WalletSummary, WalletServiceError>;

    /// Credit the wallet outside of any order (admin CLI).
    async fn top_up(
        &self,
        customer: CustomerUuid,
        amount: u64,
    ) -> Result<WalletTransaction, WalletServiceError>;
}
