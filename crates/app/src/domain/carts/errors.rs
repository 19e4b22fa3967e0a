//! Carts service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::pricing::errors::{CouponRejection, PricingError};

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("cart or cart item not found")]
    NotFound,

    #[error("this product and size is already in the cart")]
    AlreadyInCart,

    #[error("only {available} left in stock")]
    InsufficientStock { available: u64 },

    #[error("at most {limit} of a size per order")]
    QuantityCapExceeded { limit: u32 },

    #[error("quantity is already at the minimum")]
    QuantityAtMinimum,

    #[error(transparent)]
    InvalidCoupon(#[from] CouponRejection),

    #[error("related resource not found")]
    InvalidReference,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for CartsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyInCart,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::CheckViolation | ErrorKind::NotNullViolation) => Self::InvalidData,
            _ => Self::Sql(error),
        }
    }
}

impl From<PricingError> for CartsServiceError {
    fn from(error: PricingError) -> Self {
        match error {
            PricingError::Coupon(rejection) => Self::InvalidCoupon(rejection),
            PricingError::AmountOverflow => Self::InvalidData,
        }
    }
}
