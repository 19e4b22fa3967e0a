//! Cancel Order Item Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kitbag_app::domain::orders::models::CancelItem;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, models::OrderResponse},
    state::State,
};

/// Cancel Order Item Request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct CancelItemRequest {
    /// Optional cancellation reason
    pub reason: Option<String>,

    /// Must be set when the preview carried a fee warning
    #[serde(default)]
    pub acknowledge_fee: bool,
}

/// Cancel Order Item Handler
///
/// Cancels one line: restocks it and refunds its paid value. When the
/// remainder falls below the fee floor the request must acknowledge the
/// delivery fee surfaced by the preview.
#[endpoint(
    tags("orders"),
    summary = "Cancel Order Item",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Item cancelled"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Illegal transition or unacknowledged fee"),
    ),
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    item: PathParam<Uuid>,
    json: JsonBody<CancelItemRequest>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let customer = depot.customer_uuid_or_401()?;

    let request = json.into_inner();

    let order = state
        .app
        .orders
        .cancel_item(
            customer,
            order.into_inner().into(),
            item.into_inner().into(),
            CancelItem {
                reason: request.reason,
                acknowledge_fee: request.acknowledge_fee,
            },
        )
        .await
        .map_err(into_status_error)?;

    Ok(Json(order.into()))
}

#[cfg(test)]
mod tests {
    use kitbag_app::domain::orders::{MockOrdersService, OrdersServiceError};
    use salvo::test::TestClient;
    use serde_json::json;
    use testresult::TestResult;

    use crate::test_helpers::{make_order, orders_service};

    use super::*;

    fn make_service(orders: MockOrdersService) -> Service {
        orders_service(
            orders,
            Router::with_path("orders/{order}/items/{item}/cancel").post(handler),
        )
    }

    #[tokio::test]
    async fn test_unacknowledged_fee_returns_422() -> TestResult {
        let mut orders = MockOrdersService::new();

        orders
            .expect_cancel_item()
            .once()
            .withf(|_customer, _order, _item, cancel| !cancel.acknowledge_fee)
            .return_once(|_, _, _, _| {
                Err(OrdersServiceError::FeeAcknowledgementRequired { fee: 49 })
            });

        let res = TestClient::post(format!(
            "http://example.com/orders/{}/items/{}/cancel",
            Uuid::now_v7(),
            Uuid::now_v7()
        ))
        .json(&json!({}))
        .send(&make_service(orders))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::UNPROCESSABLE_ENTITY));

        Ok(())
    }

    #[tokio::test]
    async fn test_acknowledged_cancel_returns_200() -> TestResult {
        let order_uuid = Uuid::now_v7();
        let order = make_order(order_uuid);

        let mut orders = MockOrdersService::new();

        orders
            .expect_cancel_item()
            .once()
            .withf(|_customer, _order, _item, cancel| cancel.acknowledge_fee)
            .return_once(move |_, _, _, _| Ok(order));

        let res = TestClient::post(format!(
            "http://example.com/orders/{order_uuid}/items/{}/cancel",
            Uuid::now_v7()
        ))
        .json(&json!({ "acknowledge_fee": true }))
        .send(&make_service(orders))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        Ok(())
    }
}
