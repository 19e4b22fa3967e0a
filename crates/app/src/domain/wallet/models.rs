//! Wallet Models
//!
//! The wallet is an append-only ledger: the balance is the running sum
//! of SUCCESS entries, never a mutable counter.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{customers::models::CustomerUuid, orders::models::OrderUuid},
    uuids::TypedUuid,
};

pub use crate::database::Page;

/// Wallet Transaction UUID
pub type WalletTransactionUuid = TypedUuid<WalletTransaction>;

/// Ledger entry direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletEntry {
    Credit,
    Debit,
}

impl WalletEntry {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
        }
    }
}

/// Why an entry exists. Order-linked reasons carry the order id for
/// auditability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletReason {
    OrderPayment,
    OrderRefund,
    ReferralBonus,
    TopUp,
}

impl WalletReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderPayment => "ORDER_PAYMENT",
            Self::OrderRefund => "ORDER_REFUND",
            Self::ReferralBonus => "REFERRAL_BONUS",
            Self::TopUp => "TOP_UP",
        }
    }
}

/// Entry settlement status. Only SUCCESS entries count towards the
/// balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletTransactionStatus {
    Success,
    Pending,
}

impl WalletTransactionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Pending => "PENDING",
        }
    }
}

/// Wallet Transaction Model
#[derive(Debug, Clone)]
pub struct WalletTransaction {
    pub uuid: WalletTransactionUuid,
    pub customer_uuid: CustomerUuid,
    pub entry: WalletEntry,
    pub amount: u64,
    pub reason: WalletReason,
    pub order_uuid: Option<OrderUuid>,
    pub status: WalletTransactionStatus,
    pub created_at: Timestamp,
}

/// New Wallet Transaction Model
#[derive(Debug, Clone)]
pub struct NewWalletTransaction {
    pub uuid: WalletTransactionUuid,
    pub customer_uuid: CustomerUuid,
    pub entry: WalletEntry,
    pub amount: u64,
    pub reason: WalletReason,
    pub order_uuid: Option<OrderUuid>,
}

/// Balance plus one page of the ledger.
#[derive(Debug, Clone)]
pub struct WalletSummary {
    pub balance: u64,
    pub transactions: Vec<WalletTransaction>,
}
