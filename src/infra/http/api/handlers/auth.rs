//! Registration, login, and the caller's own account.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::auth::RegisterCommand;

use super::auth_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::RequireAuth;
use crate::infra::http::api::models::{
    AccountResponse, AuthResponse, LoginRequest, RegisterRequest,
};
use crate::infra::http::api::state::ApiState;

pub async fn register(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let authenticated = state
        .auth
        .register(RegisterCommand {
            email: payload.email,
            username: payload.username,
            name: payload.name,
            password: payload.password,
        })
        .await
        .map_err(auth_to_api)?;

    let response = AuthResponse {
        user: AccountResponse::from(&authenticated.user),
        access_token: authenticated.access_token,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<ApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let authenticated = state
        .auth
        .login(&payload.email, &payload.password)
        .await
        .map_err(auth_to_api)?;

    let response = AuthResponse {
        user: AccountResponse::from(&authenticated.user),
        access_token: authenticated.access_token,
    };
    Ok(Json(response))
}

pub async fn me(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .auth
        .load_user(principal.user_id)
        .await
        .map_err(auth_to_api)?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(AccountResponse::from(&user)))
}
