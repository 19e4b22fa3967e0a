//! Place Wallet Order Handler

use std::sync::Arc;

use salvo::{http::header::LOCATION, oapi::extract::JsonBody, prelude::*};

use kitbag_app::domain::payments::models::PaymentMethod;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, handlers::PlaceOrderRequest, models::OrderResponse},
    state::State,
};

/// Place Wallet Order Handler
///
/// Converts the live cart into an order paid from the wallet balance.
/// The debit and the order commit atomically; a short balance fails the
/// whole checkout.
#[endpoint(
    tags("orders"),
    summary = "Place Wallet Order",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::CREATED, description = "Order placed and paid"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Insufficient balance or stock"),
        (status_code = StatusCode::BAD_REQUEST, description = "Empty cart or unknown address"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<PlaceOrderRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let customer = depot.customer_uuid_or_401()?;

    let order = state
        .app
        .orders
        .place_order(
            customer,
            json.into_inner().into_place_order(PaymentMethod::Wallet),
        )
        .await
        .map_err(into_status_error)?;

    res.add_header(LOCATION, format!("/orders/{}", order.uuid), true)
        .or_500("failed to set location header")?
        .status_code(StatusCode::CREATED);

    Ok(Json(order.into()))
}
