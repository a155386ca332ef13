// src/handlers/posts.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::admin::RequireAdmin,
    models::post::{Post, PostCategory, PostFile, PostTargets},
    services::post_service::PostDraft,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    #[validate(required(message = "Please select a category."))]
    pub category: Option<PostCategory>,

    /// Obrigatória, exceto para anúncios
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub files: Vec<PostFile>,

    pub hyperlink: Option<String>,

    /// `"all"` ou lista de ids de pasta
    #[validate(required(message = "Please select at least one folder."))]
    #[schema(example = json!([1, 2]))]
    pub packages: Option<PostTargets>,
}

impl PostPayload {
    fn into_draft(self) -> Result<PostDraft, AppError> {
        let category = self
            .category
            .ok_or_else(|| AppError::Validation("Please select a category.".to_string()))?;
        let targets = self
            .packages
            .ok_or_else(|| AppError::Validation("Please select at least one folder.".to_string()))?;

        Ok(PostDraft {
            category,
            description: self.description,
            files: self.files,
            hyperlink: self.hyperlink.filter(|h| !h.trim().is_empty()),
            targets,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostListQuery {
    /// latest_updates | news | advertisement
    pub category: Option<PostCategory>,
}

// POST /api/admin/posts
#[utoipa::path(
    post,
    path = "/api/admin/posts",
    tag = "Posts",
    request_body = PostPayload,
    responses(
        (status = 201, description = "Post publicado", body = Post),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_post(
    State(app_state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(payload): Json<PostPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let post = app_state
        .post_service
        .create_post(&admin, payload.into_draft()?)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

// GET /api/admin/posts
#[utoipa::path(
    get,
    path = "/api/admin/posts",
    tag = "Posts",
    params(PostListQuery),
    responses((status = 200, description = "Todos os posts, mais novos primeiro", body = Vec<Post>)),
    security(("api_jwt" = []))
)]
pub async fn list_posts(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(app_state.post_service.list_posts(query.category).await?))
}

// GET /api/admin/posts/{id}
#[utoipa::path(
    get,
    path = "/api/admin/posts/{id}",
    tag = "Posts",
    params(("id" = Uuid, Path, description = "Id do post")),
    responses(
        (status = 200, description = "Post", body = Post),
        (status = 404, description = "Post não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_post(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, AppError> {
    Ok(Json(app_state.post_service.get_post(id).await?))
}

// PUT /api/admin/posts/{id}
#[utoipa::path(
    put,
    path = "/api/admin/posts/{id}",
    tag = "Posts",
    request_body = PostPayload,
    params(("id" = Uuid, Path, description = "Id do post")),
    responses(
        (status = 200, description = "Post atualizado", body = Post),
        (status = 404, description = "Post não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_post(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostPayload>,
) -> Result<Json<Post>, AppError> {
    payload.validate()?;

    let post = app_state
        .post_service
        .update_post(id, payload.into_draft()?)
        .await?;
    Ok(Json(post))
}

// DELETE /api/admin/posts/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/posts/{id}",
    tag = "Posts",
    params(("id" = Uuid, Path, description = "Id do post")),
    responses(
        (status = 204, description = "Post apagado"),
        (status = 404, description = "Post não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_post(
    State(app_state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.post_service.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
