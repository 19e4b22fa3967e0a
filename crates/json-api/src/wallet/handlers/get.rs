//! Get Wallet Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::QueryParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kitbag_app::{
    database::Page,
    domain::wallet::{
        WalletServiceError,
        models::{WalletSummary, WalletTransaction},
    },
};

use crate::{extensions::*, state::State};

/// Wallet Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct WalletResponse {
    /// Spendable balance, minor currency units
    pub balance: u64,

    /// One page of the ledger, newest first
    pub transactions: Vec<WalletTransactionResponse>,
}

impl From<WalletSummary> for WalletResponse {
    fn from(summary: WalletSummary) -> Self {
        Self {
            balance: summary.balance,
            transactions: summary
                .transactions
                .into_iter()
                .map(WalletTransactionResponse::from)
                .collect(),
        }
    }
}

/// Wallet Transaction Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct WalletTransactionResponse {
    pub uuid: Uuid,

    /// CREDIT or DEBIT
    pub entry: String,

    /// Amount, minor currency units
    pub amount: u64,

    /// Why the entry exists
    pub reason: String,

    /// The order that triggered the entry, if any
    pub order_uuid: Option<Uuid>,

    /// SUCCESS or PENDING
    pub status: String,

    /// When the entry was appended
    pub created_at: String,
}

impl From<WalletTransaction> for WalletTransactionResponse {
    fn from(transaction: WalletTransaction) -> Self {
        Self {
            uuid: transaction.uuid.into_uuid(),
            entry: transaction.entry.as_str().to_string(),
            amount: transaction.amount,
            reason: transaction.reason.as_str().to_string(),
            order_uuid: transaction.order_uuid.map(Into::into),
            status: transaction.status.as_str().to_string(),
            created_at: transaction.created_at.to_string(),
        }
    }
}

/// Get Wallet Handler
///
/// Returns the balance and a page of the ledger.
#[endpoint(
    tags("wallet"),
    summary = "Get Wallet",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(
    limit: QueryParam<u32, false>,
    offset: QueryParam<u32, false>,
    depot: &mut Depot,
) -> Result<Json<WalletResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let customer = depot.customer_uuid_or_401()?;

    let default_page = Page::default();

    let page = Page {
        limit: limit.into_inner().unwrap_or(default_page.limit),
        offset: offset.into_inner().unwrap_or(default_page.offset),
    };

    let summary = state
        .app
        .wallet
        .summary(customer, page)
        .await
        .map_err(into_status_error)?;

    Ok(Json(summary.into()))
}

fn into_status_error(error: WalletServiceError) -> StatusError {
    match error {
        WalletServiceError::NotFound => StatusError::not_found(),
        WalletServiceError::InsufficientBalance => {
            StatusError::unprocessable_entity().brief("Wallet balance is insufficient")
        }
        WalletServiceError::AlreadyRecorded
        | WalletServiceError::InvalidReference
        | WalletServiceError::InvalidData => StatusError::bad_request(),
        WalletServiceError::Sql(source) => {
            tracing::error!("wallet operation failed: {source}");

            StatusError::internal_server_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use kitbag_app::domain::wallet::MockWalletService;
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use crate::test_helpers::{TEST_CUSTOMER_UUID, wallet_service};

    use super::*;

    fn make_service(wallet: MockWalletService) -> Service {
        wallet_service(wallet, Router::with_path("wallet").get(handler))
    }

    #[tokio::test]
    async fn test_get_wallet_returns_balance() -> TestResult {
        let mut wallet = MockWalletService::new();

        wallet
            .expect_summary()
            .once()
            .withf(|customer, _page| *customer == TEST_CUSTOMER_UUID)
            .return_once(|_, _| {
                Ok(WalletSummary {
                    balance: 750_00,
                    transactions: Vec::new(),
                })
            });

        let mut res = TestClient::get("http://example.com/wallet")
            .send(&make_service(wallet))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: WalletResponse = res.take_json().await?;

        assert_eq!(body.balance, 750_00);

        Ok(())
    }

    #[tokio::test]
    async fn test_pagination_params_are_forwarded() -> TestResult {
        let mut wallet = MockWalletService::new();

        wallet
            .expect_summary()
            .once()
            .withf(|_customer, page| page.limit == 5 && page.offset == 10)
            .return_once(|_, _| {
                Ok(WalletSummary {
                    balance: 0,
                    transactions: Vec::new(),
                })
            });

        let res = TestClient::get("http://example.com/wallet?limit=5&offset=10")
            .send(&make_service(wallet))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        Ok(())
    }
}
