//! Verify Gateway Payment Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kitbag_app::domain::orders::models::{OrderUuid, VerifyGatewayPayment};

use crate::{
    extensions::*,
    orders::{errors::into_status_error, models::OrderResponse},
    state::State,
};

/// Verify Gateway Payment Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct VerifyGatewayPaymentRequest {
    /// The order being paid
    pub order_uuid: Uuid,

    /// Gateway order id from the intent
    pub gateway_order_id: String,

    /// Gateway payment id from the interactive confirmation
    pub gateway_payment_id: String,

    /// Callback signature
    pub signature: String,
}

/// Verify Gateway Payment Handler
///
/// Confirms an initialized order against the signed gateway callback.
/// Replaying the same payload is a no-op success.
#[endpoint(
    tags("orders"),
    summary = "Verify Gateway Payment",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Payment confirmed"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Verification failed"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<VerifyGatewayPaymentRequest>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let customer = depot.customer_uuid_or_401()?;

    let request = json.into_inner();

    let order = state
        .app
        .orders
        .verify_gateway_payment(
            customer,
            VerifyGatewayPayment {
                order_uuid: OrderUuid::from_uuid(request.order_uuid),
                gateway_order_id: request.gateway_order_id,
                gateway_payment_id: request.gateway_payment_id,
                signature: request.signature,
            },
        )
        .await
        .map_err(into_status_error)?;

    Ok(Json(order.into()))
}
