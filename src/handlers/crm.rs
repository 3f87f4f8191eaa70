// src/handlers/crm.rs

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PermLeadCreate, PermLeadDelete, PermLeadEdit, RequireAction},
    },
    models::crm::{CreateLeadPayload, LeadQuery, UpdateLeadPayload},
};

// =============================================================================
//  LEADS
// =============================================================================

// POST /api/leads
pub async fn create_lead(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequireAction<PermLeadCreate>,
    payload: Result<Json<CreateLeadPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let lead = app_state.lead_service.create_lead(&caller, payload).await?;

    Ok((StatusCode::CREATED, Json(lead)))
}

// GET /api/leads?search=...&status=...
pub async fn list_leads(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    query: Result<Query<LeadQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let leads = app_state.lead_service.list_leads(&caller, &query).await?;
    Ok(Json(leads))
}

// GET /api/leads/{id}
pub async fn get_lead(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service.get_lead(&caller, id).await?;
    Ok(Json(lead))
}

// PUT /api/leads/{id}
pub async fn update_lead(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequireAction<PermLeadEdit>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateLeadPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let lead = app_state.lead_service.update_lead(&caller, id, payload).await?;
    Ok(Json(lead))
}

// DELETE /api/leads/{id}
pub async fn delete_lead(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequireAction<PermLeadDelete>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.lead_service.delete_lead(&caller, id).await?;
    Ok(Json(json!({ "message": "Lead excluído" })))
}

// =============================================================================
//  UPLOAD EM MASSA
// =============================================================================

// POST /api/leads/bulk-upload (multipart, campo "file")
pub async fn bulk_upload(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequireAction<PermLeadCreate>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            file = Some(field.bytes().await?);
            break;
        }
    }

    let bytes = file.ok_or_else(|| AppError::InvalidBody("Nenhum arquivo enviado.".into()))?;
    let result = app_state.lead_service.bulk_upload(&caller, &bytes).await?;

    Ok(Json(json!({
        "message": "Upload de CSV concluído",
        "inserted": result.inserted,
        "skipped": result.skipped,
    })))
}
