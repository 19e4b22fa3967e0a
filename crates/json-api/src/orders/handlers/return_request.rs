//! Request Return Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, models::OrderResponse},
    state::State,
};

/// Request Return Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ReturnRequest {
    /// Why the item is coming back; mandatory
    pub reason: String,
}

/// Request Return Handler
///
/// Opens a return for a delivered line. No refund happens until the
/// returned item is received and confirmed.
#[endpoint(
    tags("orders"),
    summary = "Request Return",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Return requested"),
        (status_code = StatusCode::BAD_REQUEST, description = "Missing reason"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Item is not delivered"),
    ),
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    item: PathParam<Uuid>,
    json: JsonBody<ReturnRequest>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let customer = depot.customer_uuid_or_401()?;

    let order = state
        .app
        .orders
        .request_return(
            customer,
            order.into_inner().into(),
            item.into_inner().into(),
            json.into_inner().reason,
        )
        .await
        .map_err(into_status_error)?;

    Ok(Json(order.into()))
}
