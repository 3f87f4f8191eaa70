// src/common/error.rs

use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo inválido: {field}")]
    InvalidField { field: &'static str, message: String },

    #[error("Corpo da requisição inválido: {0}")]
    InvalidBody(String),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        AppError::InvalidField {
            field,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } | AppError::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::EmailAlreadyExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// JSON malformado ou com tipo errado também é 400, nunca o 422 padrão do axum
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidBody(rejection.body_text())
    }
}

// Filtro de listagem inválido (ex.: ?status=Foo)
impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidBody(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::InvalidBody(err.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            // Retorna todos os detalhes da validação
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }
            AppError::InvalidField { field, message } => json!({
                "error": "Um ou mais campos são inválidos.",
                "details": { field: [message] },
            }),
            AppError::InvalidBody(message) => json!({ "error": message }),
            AppError::EmailAlreadyExists => json!({ "error": "Este e-mail já está em uso." }),
            AppError::InvalidCredentials => json!({ "error": "E-mail ou senha inválidos." }),
            AppError::InvalidToken => {
                json!({ "error": "Token de autenticação inválido ou ausente." })
            }
            AppError::Forbidden(message) => json!({ "error": message }),
            AppError::NotFound(what) => json!({ "error": format!("{what} não encontrado.") }),

            // Todos os outros erros viram 500. O detalhe vai pro log, nunca pro cliente.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                json!({ "error": "Ocorreu um erro inesperado." })
            }
        };

        (status, Json(body)).into_response()
    }
}
