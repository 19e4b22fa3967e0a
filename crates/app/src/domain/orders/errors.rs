//! Orders service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::{
    database::is_retryable_conflict,
    domain::{
        orders::transitions::InvalidTransition,
        payments::errors::GatewayError,
        pricing::errors::{CouponRejection, PricingError},
    },
};

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    #[error("order not found")]
    NotFound,

    #[error("order already exists")]
    AlreadyExists,

    #[error("cart is empty")]
    EmptyCart,

    #[error("shipping address not found")]
    AddressNotFound,

    #[error("at most {limit} of a size per order")]
    QuantityCapExceeded { limit: u32 },

    #[error("{product_name} ({size}) is out of stock")]
    InsufficientStock { product_name: String, size: String },

    #[error("wallet balance is insufficient")]
    InsufficientBalance,

    #[error("cash on delivery is limited to orders up to {ceiling}")]
    CodCeilingExceeded { ceiling: u64 },

    #[error(transparent)]
    InvalidCoupon(#[from] CouponRejection),

    #[error("cannot {action} an order that is {from}")]
    InvalidStateTransition { from: String, action: String },

    #[error("payment verification failed")]
    PaymentVerificationFailed,

    #[error("the payment gateway is unavailable")]
    GatewayUnavailable(#[source] GatewayError),

    #[error("cancelling this item adds a delivery fee of {fee} to the remainder")]
    FeeAcknowledgementRequired { fee: u64 },

    #[error("a reason is required")]
    ReasonRequired,

    #[error("please try again")]
    Conflict,

    #[error("related resource not found")]
    InvalidReference,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for OrdersServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        if is_retryable_conflict(&error) {
            return Self::Conflict;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::CheckViolation | ErrorKind::NotNullViolation) => Self::InvalidData,
            _ => Self::Sql(error),
        }
    }
}

impl From<InvalidTransition> for OrdersServiceError {
    fn from(rejected: InvalidTransition) -> Self {
        Self::InvalidStateTransition {
            from: rejected.from.to_string(),
            action: rejected.action.to_string(),
        }
    }
}

impl From<PricingError> for OrdersServiceError {
    fn from(error: PricingError) -> Self {
        match error {
            PricingError::Coupon(rejection) => Self::InvalidCoupon(rejection),
            PricingError::AmountOverflow => Self::InvalidData,
        }
    }
}

impl From<GatewayError> for OrdersServiceError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::VerificationFailed => Self::PaymentVerificationFailed,
            other => Self::GatewayUnavailable(other),
        }
    }
}

impl OrdersServiceError {
    /// Whether retrying the whole operation may succeed (lost lock
    /// races).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}
