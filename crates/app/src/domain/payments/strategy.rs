//! Payment strategies.
//!
//! One tagged variant per payment path, selected by the order's payment
//! method. `initial_state` decides the statuses the order draft is
//! written with; `authorize` then runs inside the same checkout
//! transaction, so a declined payment rolls the whole order back.

use jiff::Timestamp;
use sqlx::{Postgres, Transaction};

use crate::domain::{
    customers::{PgCustomersRepository, models::CustomerUuid},
    orders::models::{OrderStatus, OrderUuid},
    payments::models::{GatewayIntent, PaymentStatus},
    wallet::{
        PgWalletRepository,
        models::{NewWalletTransaction, WalletEntry, WalletReason, WalletTransactionUuid},
    },
};

/// What the strategy needs to know about the order draft.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PaymentContext {
    pub order: OrderUuid,
    pub customer: CustomerUuid,
    pub total: u64,
    pub now: Timestamp,
}

/// Statuses an order draft starts out with under a given strategy.
#[derive(Debug, Clone)]
pub(crate) struct InitialPaymentState {
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub confirmed_at: Option<Timestamp>,
    pub gateway_order_id: Option<String>,
}

#[derive(Debug)]
pub(crate) enum AuthorizeError {
    InsufficientBalance,
    CodCeilingExceeded { ceiling: u64 },
    Sql(sqlx::Error),
}

impl From<sqlx::Error> for AuthorizeError {
    fn from(error: sqlx::Error) -> Self {
        Self::Sql(error)
    }
}

/// The three payment paths.
#[derive(Debug)]
pub(crate) enum PaymentStrategy<'a> {
    /// Debit the customer's wallet, atomically with the order write.
    Wallet {
        wallet: &'a PgWalletRepository,
        customers: &'a PgCustomersRepository,
    },

    /// Cash on delivery: accepted up to a ceiling, settled physically at
    /// delivery.
    Cod { ceiling: u64 },

    /// An already-registered gateway intent awaiting interactive
    /// confirmation; the order starts out unverified.
    Gateway { intent: &'a GatewayIntent },
}

impl PaymentStrategy<'_> {
    pub(crate) fn initial_state(&self, now: Timestamp) -> InitialPaymentState {
        match self {
            Self::Wallet { .. } => InitialPaymentState {
                order_status: OrderStatus::Pending,
                payment_status: PaymentStatus::Paid,
                confirmed_at: Some(now),
                gateway_order_id: None,
            },
            Self::Cod { .. } => InitialPaymentState {
                order_status: OrderStatus::Pending,
                payment_status: PaymentStatus::Pending,
                confirmed_at: Some(now),
                gateway_order_id: None,
            },
            Self::Gateway { intent } => InitialPaymentState {
                order_status: OrderStatus::Initialized,
                payment_status: PaymentStatus::Pending,
                confirmed_at: None,
                gateway_order_id: Some(intent.gateway_order_id.clone()),
            },
        }
    }

    /// Authorize funds for the draft. Runs after the order row exists so
    /// the wallet debit can reference it.
    pub(crate) async fn authorize(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ctx: PaymentContext,
    ) -> Result<(), AuthorizeError> {
        match self {
            Self::Wallet { wallet, customers } => {
                // The customer row lock serialises concurrent debits; the
                // unique order-payment index absorbs duplicate submissions
                // of the same order id.
                customers.lock_customer(tx, ctx.customer).await?;

                if ctx.total > 0 {
                    let balance = wallet.balance(tx, ctx.customer).await?;

                    if balance < ctx.total {
                        return Err(AuthorizeError::InsufficientBalance);
                    }

                    wallet
                        .insert(
                            tx,
                            &NewWalletTransaction {
                                uuid: WalletTransactionUuid::generate(),
                                customer_uuid: ctx.customer,
                                entry: WalletEntry::Debit,
                                amount: ctx.total,
                                reason: WalletReason::OrderPayment,
                                order_uuid: Some(ctx.order),
                            },
                        )
                        .await?;
                }

                Ok(())
            }

            Self::Cod { ceiling } => {
                if ctx.total > *ceiling {
                    return Err(AuthorizeError::CodCeilingExceeded { ceiling: *ceiling });
                }

                Ok(())
            }

            // The gateway authorizes out of band; verification of the
            // signed callback is what moves the order on.
            Self::Gateway { .. } => Ok(()),
        }
    }
}
