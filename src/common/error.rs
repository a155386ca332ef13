// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

// Taxonomia de erros do sistema. Cada variante vira um status HTTP distinto
// e uma mensagem legível para o app.
#[derive(Debug, Error)]
pub enum AppError {
    // Entrada ruim ou faltando (nome vazio, número inválido, lote grande demais)
    #[error("{0}")]
    Validation(String),

    #[error("Um ou mais campos são inválidos")]
    InvalidPayload(#[from] validator::ValidationErrors),

    #[error("{0}")]
    NotFound(String),

    // Colisão de id ou corrida de "create-if-absent"
    #[error("{0}")]
    Conflict(String),

    // Falha de rede/backend. Pode ser repetida.
    #[error("Falha transitória no armazenamento: {0}")]
    TransientStore(String),

    // Registro vindo do banco não bate com o schema esperado
    #[error("Registro inválido no armazenamento: {0}")]
    Schema(String),

    #[error("{0}")]
    Permission(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("OTP inválido ou expirado")]
    InvalidOtp,

    #[error("Conta não encontrada")]
    AccountNotFound,

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Só erros transitórios podem ser repetidos (e apenas em escritas idempotentes).
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientStore(_))
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::InvalidPayload(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::TransientStore(_) => "transient_store_error",
            AppError::Schema(_) => "schema_error",
            AppError::Permission(_) => "permission_error",
            AppError::InvalidToken => "invalid_token",
            AppError::InvalidOtp => "invalid_otp",
            AppError::AccountNotFound => "account_not_found",
            AppError::JwtError(_) => "invalid_token",
            AppError::BcryptError(_) | AppError::InternalServerError(_) => "internal_error",
        }
    }
}

// O sqlx é o nosso adaptador de documento: tradução para a taxonomia acima.
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::Conflict("The record already exists.".to_string());
            }
        }
        match e {
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => AppError::Schema(e.to_string()),
            other => AppError::TransientStore(other.to_string()),
        }
    }
}

// Corpo JSON de erro devolvido ao app
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = err.status();
        ApiError {
            status,
            error: err.code().to_string(),
            message: err.public_message(),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Permission(_) | AppError::AccountNotFound => StatusCode::FORBIDDEN,
            AppError::InvalidToken | AppError::InvalidOtp | AppError::JwtError(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Schema(_) | AppError::BcryptError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // Mensagem que vai para o usuário final (nunca detalhes internos)
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Permission(msg) => msg.clone(),
            AppError::InvalidPayload(_) => "One or more fields are invalid.".to_string(),
            AppError::TransientStore(_) => {
                "The service is temporarily unavailable. Please try again.".to_string()
            }
            AppError::InvalidToken | AppError::JwtError(_) => {
                "Invalid or missing authentication token.".to_string()
            }
            AppError::InvalidOtp => "Invalid OTP. Please try again.".to_string(),
            AppError::AccountNotFound => {
                "You are not authorized to access this resource".to_string()
            }
            AppError::Schema(_) | AppError::BcryptError(_) | AppError::InternalServerError(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Retorna todos os detalhes da validação
            AppError::InvalidPayload(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "validation_error",
                    "message": "One or more fields are invalid.",
                    "details": details,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            err => {
                if err.status().is_server_error() {
                    tracing::error!("Erro interno: {}", err);
                }
                ApiError::from(err).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_distinct_statuses() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::TransientStore("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::Permission("x".into()).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_details_do_not_leak() {
        let api = ApiError::from(AppError::TransientStore("connection reset by 10.0.0.3".into()));
        assert_eq!(api.error, "transient_store_error");
        assert!(!api.message.contains("10.0.0.3"));
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(AppError::TransientStore("timeout".into()).is_transient());
        assert!(!AppError::Conflict("dup".into()).is_transient());
        assert!(!AppError::Validation("empty".into()).is_transient());
    }
}
