//! Preview Item Cancellation Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, models::CancellationPreviewResponse},
    state::State,
};

/// Preview Item Cancellation Handler
///
/// Dry-run of cancelling one line: the refund and, when the remainder
/// falls under the fee floor, the delivery fee it would pick up. The
/// commit then requires explicit acknowledgement of that fee.
#[endpoint(
    tags("orders"),
    summary = "Preview Item Cancellation",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    item: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<CancellationPreviewResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let customer = depot.customer_uuid_or_401()?;

    let preview = state
        .app
        .orders
        .preview_cancel_item(
            customer,
            order.into_inner().into(),
            item.into_inner().into(),
        )
        .await
        .map_err(into_status_error)?;

    Ok(Json(preview.into()))
}

#[cfg(test)]
mod tests {
    use kitbag_app::domain::orders::{
        MockOrdersService,
        models::{CancellationPreview, FeeWarning},
    };
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use crate::test_helpers::orders_service;

    use super::*;

    fn make_service(orders: MockOrdersService) -> Service {
        orders_service(
            orders,
            Router::with_path("orders/{order}/items/{item}/cancel/preview").post(handler),
        )
    }

    #[tokio::test]
    async fn test_preview_surfaces_the_fee_warning() -> TestResult {
        let mut orders = MockOrdersService::new();

        orders.expect_preview_cancel_item().once().return_once(|_, _, _| {
            Ok(CancellationPreview {
                refund_amount: 500,
                remaining_total: 449,
                fee_warning: Some(FeeWarning {
                    fee: 49,
                    floor: 500,
                }),
            })
        });

        let mut res = TestClient::post(format!(
            "http://example.com/orders/{}/items/{}/cancel/preview",
            Uuid::now_v7(),
            Uuid::now_v7()
        ))
        .send(&make_service(orders))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: CancellationPreviewResponse = res.take_json().await?;

        assert_eq!(body.refund_amount, 500);
        let warning = body.fee_warning.expect("fee warning in response");
        assert_eq!(warning.fee, 49);

        Ok(())
    }
}
