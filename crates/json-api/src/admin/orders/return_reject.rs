//! Admin Reject Return Handler

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

/// Reject Return Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RejectReturnRequest {
    /// Why the return is refused; mandatory and terminal
    pub reason: String,
}

/// Admin Reject Return Handler
///
/// Rejects a requested return. Terminal: no restock, no refund.
#[endpoint(
    tags("admin"),
    summary = "Reject Return",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Return rejected"),
        (status_code = StatusCode::BAD_REQUEST, description = "Missing reason"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Return was not requested"),
    ),
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    item: PathParam<Uuid>,
    json: JsonBody<RejectReturnRequest>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let order = state
        .app
        .orders
        .reject_return(
            order.into_inner().into(),
            item.into_inner().into(),
            json.into_inner().reason,
        )
        .await
        .map_err(into_status_error)?;

    Ok(Json(order.into()))
}
