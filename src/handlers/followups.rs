// src/handlers/followups.rs

use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    services::activity_service::FollowUpBucket,
};

// GET /api/followups/today
pub async fn today(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state
        .activity_service
        .follow_ups(&caller, FollowUpBucket::Today, app_state.config.today())
        .await?;
    Ok(Json(entries))
}

// GET /api/followups/overdue
pub async fn overdue(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state
        .activity_service
        .follow_ups(&caller, FollowUpBucket::Overdue, app_state.config.today())
        .await?;
    Ok(Json(entries))
}
