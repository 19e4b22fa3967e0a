//! Errors

use salvo::http::StatusError;
use tracing::error;

use kitbag_app::domain::carts::CartsServiceError;

pub(crate) fn into_status_error(error: CartsServiceError) -> StatusError {
    match error {
        CartsServiceError::NotFound => StatusError::not_found(),
        CartsServiceError::AlreadyInCart => {
            StatusError::conflict().brief("This product and size is already in the cart")
        }
        CartsServiceError::InsufficientStock { .. }
        | CartsServiceError::QuantityCapExceeded { .. }
        | CartsServiceError::QuantityAtMinimum
        | CartsServiceError::InvalidCoupon(_) => {
            StatusError::unprocessable_entity().brief(error.to_string())
        }
        CartsServiceError::InvalidReference | CartsServiceError::InvalidData => {
            StatusError::bad_request().brief("Invalid cart payload")
        }
        CartsServiceError::Sql(source) => {
            error!("cart operation failed: {source}");

            StatusError::internal_server_error()
        }
    }
}
