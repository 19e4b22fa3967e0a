//! Wallet Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as, query_scalar};

use crate::domain::{
    customers::models::CustomerUuid,
    orders::models::OrderUuid,
    wallet::models::{
        NewWalletTransaction, Page, WalletEntry, WalletReason, WalletTransaction,
        WalletTransactionStatus, WalletTransactionUuid,
    },
};

const BALANCE_SQL: &str = include_str!("sql/balance.sql");
const INSERT_TRANSACTION_SQL: &str = include_str!("sql/insert_transaction.sql");
const LIST_TRANSACTIONS_SQL: &str = include_str!("sql/list_transactions.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgWalletRepository;

impl PgWalletRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Spendable balance: sum(CREDIT) - sum(DEBIT) over SUCCESS entries.
    pub(crate) async fn balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<u64, sqlx::Error> {
        let balance: i64 = query_scalar(BALANCE_SQL)
            .bind(customer.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        u64::try_from(balance).map_err(|e| sqlx::Error::ColumnDecode {
            index: "balance".to_string(),
            source: Box::new(e),
        })
    }

    /// Append an entry. Callers debiting must hold the customer row lock
    /// and have verified the balance first; the ledger itself is
    /// append-only.
    pub(crate) async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        transaction: &NewWalletTransaction,
    ) -> Result<WalletTransaction, sqlx::Error> {
        let amount = i64::try_from(transaction.amount).map_err(|e| sqlx::Error::ColumnDecode {
            index: "amount".to_string(),
            source: Box::new(e),
        })?;

        query_as::<Postgres, WalletTransaction>(INSERT_TRANSACTION_SQL)
            .bind(transaction.uuid.into_uuid())
            .bind(transaction.customer_uuid.into_uuid())
            .bind(transaction.entry.as_str())
            .bind(amount)
            .bind(transaction.reason.as_str())
            .bind(transaction.order_uuid.map(OrderUuid::into_uuid))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        page: Page,
    ) -> Result<Vec<WalletTransaction>, sqlx::Error> {
        query_as::<Postgres, WalletTransaction>(LIST_TRANSACTIONS_SQL)
            .bind(customer.into_uuid())
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for WalletTransaction {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let entry: String = row.try_get("entry")?;

        let entry = match entry.as_str() {
            "CREDIT" => WalletEntry::Credit,
            "DEBIT" => WalletEntry::Debit,
            other => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "entry".to_string(),
                    source: format!("unknown wallet entry {other:?}").into(),
                });
            }
        };

        let reason: String = row.try_get("reason")?;

        let reason = match reason.as_str() {
            "ORDER_PAYMENT" => WalletReason::OrderPayment,
            "ORDER_REFUND" => WalletReason::OrderRefund,
            "REFERRAL_BONUS" => WalletReason::ReferralBonus,
            "TOP_UP" => WalletReason::TopUp,
            other => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "reason".to_string(),
                    source: format!("unknown wallet reason {other:?}").into(),
                });
            }
        };

        let status: String = row.try_get("status")?;

        let status = match status.as_str() {
            "SUCCESS" => WalletTransactionStatus::Success,
            "PENDING" => WalletTransactionStatus::Pending,
            other => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "status".to_string(),
                    source: format!("unknown wallet transaction status {other:?}").into(),
                });
            }
        };

        let amount: i64 = row.try_get("amount")?;

        let amount = u64::try_from(amount).map_err(|e| sqlx::Error::ColumnDecode {
            index: "amount".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            uuid: WalletTransactionUuid::from_uuid(row.try_get("uuid")?),
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            entry,
            amount,
            reason,
            order_uuid: row
                .try_get::<Option<uuid::Uuid>, _>("order_uuid")?
                .map(OrderUuid::from_uuid),
            status,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
