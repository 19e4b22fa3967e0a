//! Cancel Order Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kitbag_app::domain::orders::models::CancelOrder;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, models::OrderResponse},
    state::State,
};

/// Cancel Order Request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct CancelOrderRequest {
    /// Optional cancellation reason
    pub reason: Option<String>,
}

/// Cancel Order Handler
///
/// Cancels the whole order: every non-terminal item is cancelled and
/// restocked, and the paid amount is refunded to the wallet.
#[endpoint(
    tags("orders"),
    summary = "Cancel Order",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Order cancelled"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Order is past cancellation"),
    ),
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    json: JsonBody<CancelOrderRequest>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let customer = depot.customer_uuid_or_401()?;

    let order = state
        .app
        .orders
        .cancel_order(
            customer,
            order.into_inner().into(),
            CancelOrder {
                reason: json.into_inner().reason,
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
            Router::with_path("orders/{order}/cancel").post(handler),
        )
    }

    #[tokio::test]
    async fn test_cancel_returns_200() -> TestResult {
        let order_uuid = Uuid::now_v7();
        let order = make_order(order_uuid);

        let mut orders = MockOrdersService::new();

        orders
            .expect_cancel_order()
            .once()
            .withf(move |_customer, uuid, cancel| {
                uuid.into_uuid() == order_uuid && cancel.reason.as_deref() == Some("changed my mind")
            })
            .return_once(move |_, _, _| Ok(order));

        let res = TestClient::post(format!("http://example.com/orders/{order_uuid}/cancel"))
            .json(&json!({ "reason": "changed my mind" }))
            .send(&make_service(orders))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        Ok(())
    }

    #[tokio::test]
    async fn test_cancelling_a_delivered_order_returns_422() -> TestResult {
        let mut orders = MockOrdersService::new();

        orders.expect_cancel_order().once().return_once(|_, _, _| {
            Err(OrdersServiceError::InvalidStateTransition {
                from: "delivered".to_string(),
                action: "cancel".to_string(),
            })
        });

        let res = TestClient::post(format!(
            "http://example.com/orders/{}/cancel",
            Uuid::now_v7()
        ))
        .json(&json!({}))
        .send(&make_service(orders))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::UNPROCESSABLE_ENTITY));

        Ok(())
    }
}
