// src/handlers/users.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::contact::{Address, Contact, PackageSelection, Profile, RegistrationReceipt},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[validate(length(min = 1, message = "Please enter your name."))]
    pub name: String,
    #[validate(length(min = 1, message = "Please enter your surname."))]
    pub surname: String,
    #[validate(length(min = 1, message = "Please enter your shop name."))]
    pub shop_name: String,
    #[validate(length(min = 1, message = "Please enter your village/city."))]
    pub village_city: String,
    #[validate(length(min = 1, message = "Please enter your street."))]
    pub street: String,
    #[validate(length(min = 1, message = "Please enter your mandal."))]
    pub mandal: String,
    #[validate(length(min = 1, message = "Please enter your district."))]
    pub district: String,
    #[validate(length(min = 1, message = "Please enter your state."))]
    pub state: String,

    #[validate(length(min = 1, message = "Please select at least one package."))]
    pub packages: Vec<PackageSelection>,
}

impl RegisterPayload {
    fn profile(&self) -> Profile {
        Profile {
            name: self.name.trim().to_string(),
            surname: self.surname.trim().to_string(),
            shop_name: self.shop_name.trim().to_string(),
            address: Address {
                village_city: self.village_city.trim().to_string(),
                street: self.street.trim().to_string(),
                mandal: self.mandal.trim().to_string(),
                district: self.district.trim().to_string(),
                state: self.state.trim().to_string(),
            },
        }
    }
}

// POST /api/users/register
#[utoipa::path(
    post,
    path = "/api/users/register",
    tag = "Users",
    request_body = RegisterPayload,
    responses(
        (status = 201, description = "Cadastro criado", body = RegistrationReceipt),
        (status = 200, description = "Cadastro atualizado", body = RegistrationReceipt),
        (status = 404, description = "Pacote ou duração inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn register(
    State(app_state): State<AppState>,
    AuthenticatedUser(viewer): AuthenticatedUser,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let receipt = app_state
        .contact_service
        .register(&viewer, payload.profile(), &payload.packages)
        .await?;

    let status = if receipt.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(receipt)))
}

// GET /api/users/me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Contato do usuário logado", body = Contact),
        (status = 404, description = "Ainda não cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    AuthenticatedUser(viewer): AuthenticatedUser,
) -> Result<Json<Contact>, AppError> {
    let contact = app_state.contact_service.me(&viewer).await?;
    Ok(Json(contact))
}
