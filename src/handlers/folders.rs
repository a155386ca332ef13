// src/handlers/folders.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::admin::RequireAdmin,
    models::folder::{Folder, FolderCount, FolderSummary, ImportReport},
};

// =============================================================================
//  ÁREA 1: PASTAS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderNamePayload {
    #[validate(length(min = 1, message = "Please enter a folder name."))]
    #[schema(example = "Gold Members")]
    pub name: String,
}

// GET /api/folders
#[utoipa::path(
    get,
    path = "/api/folders",
    tag = "Folders",
    responses(
        (status = 200, description = "Pastas com a contagem de membros", body = Vec<FolderSummary>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_folders(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<FolderSummary>>, AppError> {
    let folders = app_state.folder_service.list_folders_with_counts().await?;
    Ok(Json(folders))
}

// POST /api/folders
#[utoipa::path(
    post,
    path = "/api/folders",
    tag = "Folders",
    request_body = FolderNamePayload,
    responses(
        (status = 201, description = "Pasta criada", body = Folder),
        (status = 409, description = "Id tomado por outra criação")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_folder(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Json(payload): Json<FolderNamePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let folder = app_state.folder_service.create_folder(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

// PUT /api/folders/{id}
#[utoipa::path(
    put,
    path = "/api/folders/{id}",
    tag = "Folders",
    request_body = FolderNamePayload,
    params(("id" = i64, Path, description = "Id da pasta")),
    responses(
        (status = 200, description = "Pasta renomeada", body = Folder),
        (status = 404, description = "Pasta não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn rename_folder(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<FolderNamePayload>,
) -> Result<Json<Folder>, AppError> {
    payload.validate()?;

    let folder = app_state.folder_service.rename_folder(id, &payload.name).await?;
    Ok(Json(folder))
}

// DELETE /api/folders/{id}
#[utoipa::path(
    delete,
    path = "/api/folders/{id}",
    tag = "Folders",
    params(("id" = i64, Path, description = "Id da pasta")),
    responses(
        (status = 204, description = "Pasta apagada (contatos mantêm a referência)"),
        (status = 404, description = "Pasta não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_folder(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.folder_service.delete_folder(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountMembersPayload {
    pub folder_ids: Vec<i64>,
}

// POST /api/folders/counts
#[utoipa::path(
    post,
    path = "/api/folders/counts",
    tag = "Folders",
    request_body = CountMembersPayload,
    responses(
        (status = 200, description = "Contagem por pasta (erros ficam na própria entrada)", body = Vec<FolderCount>)
    ),
    security(("api_jwt" = []))
)]
pub async fn count_members(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Json(payload): Json<CountMembersPayload>,
) -> Json<Vec<FolderCount>> {
    Json(app_state.folder_service.count_members(&payload.folder_ids).await)
}

// =============================================================================
//  ÁREA 2: NÚMEROS DA PASTA
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NumberSearch {
    /// Trecho do número
    pub search: Option<String>,
}

// GET /api/folders/{id}/numbers
#[utoipa::path(
    get,
    path = "/api/folders/{id}/numbers",
    tag = "Folders",
    params(("id" = i64, Path, description = "Id da pasta"), NumberSearch),
    responses(
        (status = 200, description = "Números dos membros", body = Vec<String>),
        (status = 404, description = "Pasta não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_numbers(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
    Query(params): Query<NumberSearch>,
) -> Result<Json<Vec<String>>, AppError> {
    let numbers = app_state
        .folder_service
        .list_member_numbers(id, params.search.as_deref())
        .await?;
    Ok(Json(numbers))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportNumbersPayload {
    /// Números separados por quebra de linha ou vírgula
    #[schema(example = "9876543210\n+919123456789, 9000000000")]
    pub numbers: String,
}

// POST /api/folders/{id}/numbers
#[utoipa::path(
    post,
    path = "/api/folders/{id}/numbers",
    tag = "Folders",
    request_body = ImportNumbersPayload,
    params(("id" = i64, Path, description = "Id da pasta")),
    responses(
        (status = 200, description = "Relatório da importação", body = ImportReport),
        (status = 400, description = "Lote vazio, inválido ou grande demais"),
        (status = 404, description = "Pasta não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_numbers(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<ImportNumbersPayload>,
) -> Result<Json<ImportReport>, AppError> {
    let report = app_state
        .folder_service
        .bulk_import_numbers(id, &payload.numbers)
        .await?;
    Ok(Json(report))
}

// DELETE /api/folders/{id}/numbers/{phone}
#[utoipa::path(
    delete,
    path = "/api/folders/{id}/numbers/{phone}",
    tag = "Folders",
    params(
        ("id" = i64, Path, description = "Id da pasta"),
        ("phone" = String, Path, description = "Número (com ou sem +91)")
    ),
    responses(
        (status = 204, description = "Contato inteiro apagado"),
        (status = 404, description = "Número não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_number(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path((id, phone)): Path<(i64, String)>,
) -> Result<StatusCode, AppError> {
    app_state.folder_service.delete_number(id, &phone).await?;
    Ok(StatusCode::NO_CONTENT)
}
