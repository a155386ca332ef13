// src/middleware/admin.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{common::error::AppError, config::AppState, models::auth::Viewer};

/// Guardião das rotas de administração. Exige o `auth_guard` antes.
pub struct RequireAdmin(pub Viewer);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let viewer = parts
            .extensions
            .get::<Viewer>()
            .cloned()
            .ok_or(AppError::InvalidToken)?;

        app_state.auth_service.require_admin(&viewer).inspect_err(|_| {
            tracing::warn!("🚫 {} tentou uma ação de administrador", viewer.phone_number);
        })?;

        Ok(RequireAdmin(viewer))
    }
}
