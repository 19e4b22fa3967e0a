//! Place Gateway Order Handler

use std::sync::Arc;

use salvo::{http::header::LOCATION, oapi::extract::JsonBody, prelude::*};

use kitbag_app::domain::payments::models::PaymentMethod;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, handlers::PlaceOrderRequest, models::OrderResponse},
    state::State,
};

/// Place Gateway Order Handler
///
/// Registers a payment intent with the external gateway and creates the
/// order in `initialized` status. The client completes the payment
/// interactively and then calls the verify endpoint; unverified intents
/// expire and release their stock.
#[endpoint(
    tags("orders"),
    summary = "Place Gateway Order",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::CREATED, description = "Intent registered, order initialized"),
        (status_code = StatusCode::BAD_GATEWAY, description = "Gateway unavailable"),
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
            json.into_inner().into_place_order(PaymentMethod::Gateway),
        )
        .await
        .map_err(into_status_error)?;

    res.add_header(LOCATION, format!("/orders/{}", order.uuid), true)
        .or_500("failed to set location header")?
        .status_code(StatusCode::CREATED);

    Ok(Json(order.into()))
}
