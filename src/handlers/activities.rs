// src/handlers/activities.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::crm::CreateActivityPayload,
};

// POST /api/activities/{lead_id}
// O papel (LogActivity) é checado no serviço, depois do 404 do lead.
pub async fn add_activity(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
    payload: Result<Json<CreateActivityPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let activity = app_state
        .activity_service
        .add_activity(&caller, lead_id, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(activity)))
}

// GET /api/activities/{lead_id}
pub async fn list_activities(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let today = app_state.config.today();

    let activities = app_state
        .activity_service
        .list_activities_for_lead(&caller, lead_id, today)
        .await?;

    Ok(Json(activities))
}
