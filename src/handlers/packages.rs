// src/handlers/packages.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::admin::RequireAdmin,
    models::package::Package,
    services::package_service::DurationDraft,
};

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("Price must be greater than zero.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DurationPayload {
    #[validate(length(min = 1, message = "Please enter a duration."))]
    #[schema(example = "1 month")]
    pub duration: String,

    #[validate(custom(function = "validate_positive"))]
    #[schema(value_type = f64, example = 499.0)]
    pub price: Decimal,
}

impl From<&DurationPayload> for DurationDraft {
    fn from(payload: &DurationPayload) -> Self {
        DurationDraft {
            duration: payload.duration.clone(),
            price: payload.price,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePackagePayload {
    #[validate(length(min = 1, message = "Please enter a package name."))]
    #[schema(example = "Gold")]
    pub name: String,

    #[validate(length(min = 1, message = "Please add at least one duration."), nested)]
    pub durations: Vec<DurationPayload>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenamePackagePayload {
    #[validate(length(min = 1, message = "Please enter a package name."))]
    pub name: String,
}

// GET /api/packages (público: usado no cadastro)
#[utoipa::path(
    get,
    path = "/api/packages",
    tag = "Packages",
    responses((status = 200, description = "Pacotes por id", body = Vec<Package>))
)]
pub async fn list_packages(State(app_state): State<AppState>) -> Result<Json<Vec<Package>>, AppError> {
    Ok(Json(app_state.package_service.list_packages().await?))
}

// POST /api/admin/packages
#[utoipa::path(
    post,
    path = "/api/admin/packages",
    tag = "Packages",
    request_body = CreatePackagePayload,
    responses(
        (status = 201, description = "Pacote criado", body = Package),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_package(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Json(payload): Json<CreatePackagePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let durations: Vec<DurationDraft> = payload.durations.iter().map(DurationDraft::from).collect();
    let package = app_state
        .package_service
        .create_package(&payload.name, &durations)
        .await?;
    Ok((StatusCode::CREATED, Json(package)))
}

// PUT /api/admin/packages/{id}
#[utoipa::path(
    put,
    path = "/api/admin/packages/{id}",
    tag = "Packages",
    request_body = RenamePackagePayload,
    params(("id" = i64, Path, description = "Id do pacote")),
    responses(
        (status = 200, description = "Pacote renomeado", body = Package),
        (status = 404, description = "Pacote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn rename_package(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<RenamePackagePayload>,
) -> Result<Json<Package>, AppError> {
    payload.validate()?;
    Ok(Json(app_state.package_service.rename_package(id, &payload.name).await?))
}

// DELETE /api/admin/packages/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/packages/{id}",
    tag = "Packages",
    params(("id" = i64, Path, description = "Id do pacote")),
    responses(
        (status = 204, description = "Pacote apagado"),
        (status = 404, description = "Pacote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_package(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.package_service.delete_package(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/admin/packages/{id}/durations
#[utoipa::path(
    post,
    path = "/api/admin/packages/{id}/durations",
    tag = "Packages",
    request_body = DurationPayload,
    params(("id" = i64, Path, description = "Id do pacote")),
    responses(
        (status = 201, description = "Duração adicionada", body = Package),
        (status = 404, description = "Pacote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_duration(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<DurationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let package = app_state
        .package_service
        .add_duration(id, &DurationDraft::from(&payload))
        .await?;
    Ok((StatusCode::CREATED, Json(package)))
}

// PUT /api/admin/packages/{id}/durations/{duration_id}
#[utoipa::path(
    put,
    path = "/api/admin/packages/{id}/durations/{duration_id}",
    tag = "Packages",
    request_body = DurationPayload,
    params(
        ("id" = i64, Path, description = "Id do pacote"),
        ("duration_id" = String, Path, description = "Id da duração")
    ),
    responses(
        (status = 200, description = "Duração atualizada", body = Package),
        (status = 404, description = "Pacote ou duração não encontrados")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_duration(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path((id, duration_id)): Path<(i64, String)>,
    Json(payload): Json<DurationPayload>,
) -> Result<Json<Package>, AppError> {
    payload.validate()?;

    let package = app_state
        .package_service
        .update_duration(id, &duration_id, &DurationDraft::from(&payload))
        .await?;
    Ok(Json(package))
}

// DELETE /api/admin/packages/{id}/durations/{duration_id}
#[utoipa::path(
    delete,
    path = "/api/admin/packages/{id}/durations/{duration_id}",
    tag = "Packages",
    params(
        ("id" = i64, Path, description = "Id do pacote"),
        ("duration_id" = String, Path, description = "Id da duração")
    ),
    responses(
        (status = 200, description = "Duração removida", body = Package),
        (status = 404, description = "Pacote ou duração não encontrados")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_duration(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path((id, duration_id)): Path<(i64, String)>,
) -> Result<Json<Package>, AppError> {
    let package = app_state
        .package_service
        .delete_duration(id, &duration_id)
        .await?;
    Ok(Json(package))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: serde_json::Value) -> CreatePackagePayload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn package_needs_at_least_one_duration() {
        let errors = payload(serde_json::json!({ "name": "Gold", "durations": [] }))
            .validate()
            .unwrap_err();
        assert!(errors.errors().contains_key("durations"));
    }

    #[test]
    fn each_duration_is_validated() {
        let errors = payload(serde_json::json!({
            "name": "Gold",
            "durations": [
                { "duration": "1 month", "price": 99.5 },
                { "duration": "1 year", "price": 0 }
            ]
        }))
        .validate()
        .unwrap_err();
        assert!(errors.errors().contains_key("durations"));

        let ok = payload(serde_json::json!({
            "name": "Gold",
            "durations": [{ "duration": "1 month", "price": 99.5 }]
        }));
        assert!(ok.validate().is_ok());
    }
}
