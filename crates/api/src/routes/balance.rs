//! Balance, withdrawal and withdrawal history routes.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiResult, middleware::auth::AuthUser, routes::parse_json};
use loyalty_core::ledger::{Balance, Withdrawal};
use loyalty_core::orders::OrderService;
use loyalty_shared::OrderNumber;

/// Creates the balance router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/balance", get(balance))
        .route("/user/balance/withdraw", post(withdraw))
        .route("/user/withdrawals", get(list_withdrawals))
}

/// Current balance.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Spendable amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub current: Decimal,
    /// Total withdrawn so far.
    #[serde(with = "rust_decimal::serde::float")]
    pub withdrawn: Decimal,
}

impl From<Balance> for BalanceResponse {
    fn from(balance: Balance) -> Self {
        Self {
            current: balance.current,
            withdrawn: balance.withdrawn,
        }
    }
}

/// Withdrawal request.
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    /// Order number to record the withdrawal under.
    pub order: String,
    /// Amount to withdraw.
    pub sum: Decimal,
}

/// A recorded withdrawal.
#[derive(Debug, Serialize)]
pub struct WithdrawalResponse {
    /// Order number, as a string.
    pub order: OrderNumber,
    /// Amount withdrawn.
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
    /// When the withdrawal was recorded.
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(withdrawal: Withdrawal) -> Self {
        Self {
            order: withdrawal.order,
            sum: withdrawal.sum,
            processed_at: withdrawal.processed_at,
        }
    }
}

/// GET /user/balance - Current and withdrawn totals.
async fn balance(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<BalanceResponse>> {
    let balance = state.store.balance(user.login()).await?;
    Ok(Json(balance.into()))
}

/// POST /user/balance/withdraw - Spend part of the balance.
async fn withdraw(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let request: WithdrawRequest = parse_json(&body)?;
    OrderService::withdraw(state.store.as_ref(), user.login(), &request.order, request.sum).await?;
    Ok(StatusCode::OK)
}

/// GET /user/withdrawals - List the caller's withdrawals, newest first.
async fn list_withdrawals(State(state): State<AppState>, user: AuthUser) -> ApiResult<Response> {
    let withdrawals = state.store.withdrawals(user.login()).await?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<WithdrawalResponse> = withdrawals
        .into_iter()
        .map(WithdrawalResponse::from)
        .collect();
    Ok(Json(body).into_response())
}
