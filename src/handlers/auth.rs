// src/handlers/auth.rs

use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::{AuthResponse, OtpChallengeResponse},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpPayload {
    #[validate(length(min = 1, message = "Please enter your mobile number."))]
    #[schema(example = "9876543210")]
    pub phone_number: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpPayload {
    #[validate(length(min = 1, message = "required"))]
    pub verification_id: String,

    #[validate(length(equal = 6, message = "Please enter the 6-digit code."))]
    #[schema(example = "123456")]
    pub code: String,
}

// POST /api/auth/otp
#[utoipa::path(
    post,
    path = "/api/auth/otp",
    tag = "Auth",
    request_body = RequestOtpPayload,
    responses(
        (status = 200, description = "Código enviado", body = OtpChallengeResponse),
        (status = 400, description = "Número inválido"),
        (status = 404, description = "Número não cadastrado")
    )
)]
pub async fn request_otp(
    State(app_state): State<AppState>,
    Json(payload): Json<RequestOtpPayload>,
) -> Result<Json<OtpChallengeResponse>, AppError> {
    payload.validate()?;

    let challenge = app_state.auth_service.request_otp(&payload.phone_number).await?;
    Ok(Json(challenge))
}

// POST /api/auth/otp/verify
#[utoipa::path(
    post,
    path = "/api/auth/otp/verify",
    tag = "Auth",
    request_body = VerifyOtpPayload,
    responses(
        (status = 200, description = "Token emitido", body = AuthResponse),
        (status = 401, description = "Código inválido ou expirado")
    )
)]
pub async fn verify_otp(
    State(app_state): State<AppState>,
    Json(payload): Json<VerifyOtpPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let auth = app_state
        .auth_service
        .verify_otp(&payload.verification_id, &payload.code)
        .await?;
    Ok(Json(auth))
}
