//! Preview Order Cancellation Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, models::CancellationPreviewResponse},
    state::State,
};

/// Preview Order Cancellation Handler
///
/// Dry-run of a full cancellation: what would be refunded. Nothing is
/// committed.
#[endpoint(
    tags("orders"),
    summary = "Preview Order Cancellation",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<CancellationPreviewResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let customer = depot.customer_uuid_or_401()?;

    let preview = state
        .app
        .orders
        .preview_cancel_order(customer, order.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(preview.into()))
}
