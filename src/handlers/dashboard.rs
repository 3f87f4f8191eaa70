// src/handlers/dashboard.rs

use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PermViewReports, RequireAction},
    },
};

// GET /api/leads/stats/summary
// Qualquer papel; os números respeitam o que o usuário enxerga.
pub async fn summary(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let stats = app_state.report_service.summary(&caller).await?;
    Ok(Json(stats))
}

// GET /api/leads/stats/monthly
pub async fn monthly(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state.report_service.monthly(&caller).await?;
    Ok(Json(entries))
}

// GET /api/leads/stats/team (admin e gerente)
pub async fn team(
    State(app_state): State<AppState>,
    _guard: RequireAction<PermViewReports>,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state.report_service.team_performance().await?;
    Ok(Json(entries))
}
