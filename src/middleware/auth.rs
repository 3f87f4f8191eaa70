// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{common::error::AppError, config::AppState, models::auth::Caller};

// O middleware em si: sem token válido a requisição nem chega no handler
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::InvalidToken)?;

    let caller = app_state.auth_service.validate_token(bearer.token()).await?;

    // Insere quem chamou nos "extensions" da requisição
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub Caller);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::InvalidToken)
    }
}
