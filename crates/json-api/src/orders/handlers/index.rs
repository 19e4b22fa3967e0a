//! List Orders Handler

use std::sync::Arc;

use salvo::{oapi::extract::QueryParam, prelude::*};

use kitbag_app::database::Page;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, models::OrderSummaryResponse},
    state::State,
};

/// List Orders Handler
///
/// Returns the customer's orders, newest first.
#[endpoint(
    tags("orders"),
    summary = "List Orders",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(
    limit: QueryParam<u32, false>,
    offset: QueryParam<u32, false>,
    depot: &mut Depot,
) -> Result<Json<Vec<OrderSummaryResponse>>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let customer = depot.customer_uuid_or_401()?;

    let default_page = Page::default();

    let page = Page {
        limit: limit.into_inner().unwrap_or(default_page.limit),
        offset: offset.into_inner().unwrap_or(default_page.offset),
    };

    let orders = state
        .app
        .orders
        .list_orders(customer, page)
        .await
        .map_err(into_status_error)?;

    Ok(Json(
        orders.into_iter().map(OrderSummaryResponse::from).collect(),
    ))
}
