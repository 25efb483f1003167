//! API route definitions.

use axum::{Router, body::Bytes, middleware};
use serde::de::DeserializeOwned;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::auth::auth_middleware,
};
use loyalty_shared::AppError;

pub mod balance;
pub mod health;
pub mod orders;
pub mod user;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(orders::routes())
        .merge(balance::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Combine public and protected routes
    Router::new()
        .merge(health::routes())
        .merge(user::routes())
        .merge(protected_routes)
        .method_not_allowed_fallback(fallback)
}

/// Unknown routes and unsupported methods are client errors.
pub async fn fallback() -> ApiError {
    ApiError(AppError::Validation("Unsupported route or method".to_string()))
}

/// Parses a JSON body, reporting any failure as a validation error.
///
/// Axum's `Json` extractor answers 415/422 for some malformed bodies; this
/// API answers 400 for all of them.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError(AppError::Validation(format!("Malformed JSON body: {e}"))))
}
