// src/handlers/auth.rs

use axum::{extract::{rejection::JsonRejection, State}, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{Caller, LoginUserPayload, RegisterUserPayload},
};

// POST /api/auth/register
pub async fn register(
    State(app_state): State<AppState>,
    payload: Result<Json<RegisterUserPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_string();
    payload.validate()?;

    let response = app_state
        .auth_service
        .register_user(&payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

// POST /api/auth/login
pub async fn login(
    State(app_state): State<AppState>,
    payload: Result<Json<LoginUserPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_string();
    payload.validate()?;

    let response = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await?;

    Ok(Json(response))
}

// GET /api/users/me
pub async fn get_me(AuthenticatedUser(caller): AuthenticatedUser) -> Json<Caller> {
    Json(caller)
}
