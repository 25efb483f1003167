//! Registration and login routes.
//!
//! Both answer with a bearer token in the `Authorization` header and in the
//! JSON body.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::info;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    routes::parse_json,
};
use loyalty_core::ledger::LedgerError;
use loyalty_shared::{AppError, auth::Credentials, auth::TokenResponse};

/// Creates the user router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
}

fn credentials(body: &Bytes) -> ApiResult<Credentials> {
    let credentials: Credentials = parse_json(body)?;
    if !credentials.is_complete() {
        return Err(ApiError(AppError::Validation(
            "login and password are required".to_string(),
        )));
    }
    Ok(credentials)
}

fn token_response(state: &AppState, login: &str) -> ApiResult<Response> {
    let token = state
        .jwt_service
        .generate_access_token(login)
        .map_err(|e| ApiError(AppError::Internal(e.to_string())))?;
    let header = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| ApiError(AppError::Internal(e.to_string())))?;

    let body = TokenResponse::bearer(token, state.jwt_service.access_token_expires_in());
    Ok((StatusCode::OK, [(AUTHORIZATION, header)], Json(body)).into_response())
}

/// POST /user/register - Register a new user and sign them in.
async fn register(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let credentials = credentials(&body)?;

    // fast path; the unique constraint decides races
    if !state.store.is_login_available(&credentials.login).await? {
        return Err(LedgerError::DuplicateLogin(credentials.login).into());
    }
    state
        .store
        .register(&credentials.login, &credentials.password)
        .await?;

    info!(login = %credentials.login, "User registered");
    token_response(&state, &credentials.login)
}

/// POST /user/login - Authenticate a user.
async fn login(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let credentials = credentials(&body)?;

    if !state
        .store
        .authenticate(&credentials.login, &credentials.password)
        .await?
    {
        info!(login = %credentials.login, "Failed login attempt");
        return Err(ApiError(AppError::Unauthorized(
            "Invalid login or password".to_string(),
        )));
    }

    info!(login = %credentials.login, "User logged in");
    token_response(&state, &credentials.login)
}
