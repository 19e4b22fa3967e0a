//! Admin Set Order Status Handler

use std::{str::FromStr, sync::Arc};

use salvo::{
    oapi::{ToSchema, extract::JsonBody, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kitbag_app::domain::orders::{models::OrderStatus, transitions::ADMIN_SELECTABLE};

use crate::{
    extensions::*,
    orders::{errors::into_status_error, models::OrderResponse},
    state::State,
};

/// Set Order Status Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct SetStatusRequest {
    /// Target status: processing, shipped or delivered
    pub status: String,
}

/// Admin Set Order Status Handler
///
/// Advances the order (and its items) along the fulfilment track.
/// Forward-only; only the whitelisted statuses are selectable.
#[endpoint(
    tags("admin"),
    summary = "Set Order Status",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Status advanced"),
        (status_code = StatusCode::BAD_REQUEST, description = "Unknown or non-selectable status"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Illegal transition"),
    ),
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    json: JsonBody<SetStatusRequest>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let target = OrderStatus::from_str(&json.into_inner().status)
        .ok()
        .filter(|status| ADMIN_SELECTABLE.contains(status))
        .ok_or_else(|| StatusError::bad_request().brief("Status is not admin-selectable"))?;

    let order = state
        .app
        .orders
        .set_status(order.into_inner().into(), target)
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

    use crate::test_helpers::{admin_service, make_order, orders_service_router};

    use super::*;

    fn make_service(orders: MockOrdersService) -> Service {
        admin_service(
            orders,
            Router::with_path("admin/orders/{order}/status").patch(handler),
        )
    }

    #[tokio::test]
    async fn test_advance_to_shipped_returns_200() -> TestResult {
        let order_uuid = Uuid::now_v7();
        let order = make_order(order_uuid);

        let mut orders = MockOrdersService::new();

        orders
            .expect_set_status()
            .once()
            .withf(move |uuid, target| {
                uuid.into_uuid() == order_uuid && *target == OrderStatus::Shipped
            })
            .return_once(move |_, _| Ok(order));

        let res = TestClient::patch(format!(
            "http://example.com/admin/orders/{order_uuid}/status"
        ))
        .json(&json!({ "status": "shipped" }))
        .send(&make_service(orders))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        Ok(())
    }

    #[tokio::test]
    async fn test_non_selectable_status_returns_400() -> TestResult {
        let mut orders = MockOrdersService::new();

        orders.expect_set_status().never();

        let res = TestClient::patch(format!(
            "http://example.com/admin/orders/{}/status",
            Uuid::now_v7()
        ))
        .json(&json!({ "status": "cancelled" }))
        .send(&make_service(orders))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_backwards_advance_returns_422() -> TestResult {
        let mut orders = MockOrdersService::new();

        orders.expect_set_status().once().return_once(|_, _| {
            Err(OrdersServiceError::InvalidStateTransition {
                from: "shipped".to_string(),
                action: "advance status".to_string(),
            })
        });

        let res = TestClient::patch(format!(
            "http://example.com/admin/orders/{}/status",
            Uuid::now_v7()
        ))
        .json(&json!({ "status": "processing" }))
        .send(&make_service(orders))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::UNPROCESSABLE_ENTITY));

        Ok(())
    }

    #[tokio::test]
    async fn test_non_admin_cannot_set_status() -> TestResult {
        let mut orders = MockOrdersService::new();

        orders.expect_set_status().never();

        // Same route mounted behind the customer (non-admin) test
        // identity: the admin gate turns it away.
        let service = orders_service_router(
            orders,
            Router::with_path("admin/orders/{order}/status").patch(handler),
            false,
        );

        let res = TestClient::patch(format!(
            "http://example.com/admin/orders/{}/status",
            Uuid::now_v7()
        ))
        .json(&json!({ "status": "shipped" }))
        .send(&service)
        .await;

        assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));

        Ok(())
    }
}
