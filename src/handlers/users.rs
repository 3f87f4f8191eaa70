// src/handlers/users.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PermListAgents, PermManageUsers, RequireAction},
    },
    models::auth::{CreateUserPayload, UpdateRolePayload},
};

// GET /api/users
pub async fn list_users(
    State(app_state): State<AppState>,
    _guard: RequireAction<PermManageUsers>,
) -> Result<impl IntoResponse, AppError> {
    let users = app_state.user_service.list_users().await?;
    Ok(Json(users))
}

// POST /api/users
pub async fn create_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequireAction<PermManageUsers>,
    payload: Result<Json<CreateUserPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_string();
    payload.validate()?;

    let user = app_state
        .user_service
        .create_user(&caller, &payload.email, &payload.password, payload.role)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

// PUT /api/users/{id}
pub async fn update_user_role(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequireAction<PermManageUsers>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateRolePayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let user = app_state
        .user_service
        .update_role(&caller, id, payload.role)
        .await?;

    Ok(Json(user))
}

// DELETE /api/users/{id}
pub async fn delete_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequireAction<PermManageUsers>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.user_service.delete_user(&caller, id).await?;
    Ok(Json(json!({ "message": "Usuário excluído" })))
}

// GET /api/users/sales-agents (dropdown de responsáveis)
pub async fn list_sales_agents(
    State(app_state): State<AppState>,
    _guard: RequireAction<PermListAgents>,
) -> Result<impl IntoResponse, AppError> {
    let agents = app_state.user_service.list_sales_agents().await?;
    Ok(Json(agents))
}
