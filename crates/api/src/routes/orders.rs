//! Order upload and listing routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{AppState, error::ApiResult, middleware::auth::AuthUser};
use loyalty_core::ledger::Order;
use loyalty_core::orders::{OrderService, OrderStatus, SubmitOutcome};
use loyalty_shared::OrderNumber;

/// Creates the orders router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/user/orders", post(upload_order).get(list_orders))
}

/// An order as listed to its owner.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Order number, as a string.
    pub number: OrderNumber,
    /// Current status.
    pub status: OrderStatus,
    /// Credited accrual, once processed.
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub accrual: Option<Decimal>,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            number: order.number,
            status: order.status,
            accrual: order.accrual,
            uploaded_at: order.uploaded_at,
        }
    }
}

/// POST /user/orders - Upload an order number (plain-text body).
async fn upload_order(
    State(state): State<AppState>,
    user: AuthUser,
    body: String,
) -> ApiResult<StatusCode> {
    let outcome = OrderService::submit(state.store.as_ref(), user.login(), &body).await?;
    Ok(match outcome {
        SubmitOutcome::Accepted => StatusCode::ACCEPTED,
        SubmitOutcome::AlreadyUploaded => StatusCode::OK,
    })
}

/// GET /user/orders - List the caller's orders, newest first.
async fn list_orders(State(state): State<AppState>, user: AuthUser) -> ApiResult<Response> {
    let orders = state.store.orders(user.login()).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(Json(body).into_response())
}
