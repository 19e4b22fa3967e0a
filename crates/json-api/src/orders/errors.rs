//! Errors

use salvo::http::StatusError;
use tracing::error;

use kitbag_app::domain::orders::OrdersServiceError;

pub(crate) fn into_status_error(error: OrdersServiceError) -> StatusError {
    match error {
        OrdersServiceError::NotFound => StatusError::not_found(),
        OrdersServiceError::AlreadyExists => StatusError::conflict().brief("Order already exists"),
        OrdersServiceError::Conflict => StatusError::conflict().brief("Please try again"),
        OrdersServiceError::EmptyCart
        | OrdersServiceError::AddressNotFound
        | OrdersServiceError::ReasonRequired
        | OrdersServiceError::QuantityCapExceeded { .. } => {
            StatusError::bad_request().brief(error.to_string())
        }
        OrdersServiceError::InsufficientStock { .. }
        | OrdersServiceError::InsufficientBalance
        | OrdersServiceError::CodCeilingExceeded { .. }
        | OrdersServiceError::InvalidCoupon(_)
        | OrdersServiceError::InvalidStateTransition { .. }
        | OrdersServiceError::PaymentVerificationFailed
        | OrdersServiceError::FeeAcknowledgementRequired { .. } => {
            StatusError::unprocessable_entity().brief(error.to_string())
        }
        OrdersServiceError::GatewayUnavailable(source) => {
            error!("payment gateway unavailable: {source}");

            StatusError::bad_gateway().brief("The payment gateway is unavailable")
        }
        OrdersServiceError::InvalidReference | OrdersServiceError::InvalidData => {
            StatusError::bad_request().brief("Invalid order payload")
        }
        OrdersServiceError::Sql(source) => {
            error!("order operation failed: {source}");

            StatusError::internal_server_error()
        }
    }
}
