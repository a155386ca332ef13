// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Quem está fazendo a requisição (telefone completo, ex: +919876543210)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub phone_number: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (telefone do usuário)
    pub exp: usize,  // Expiration time (quando o token expira)
    pub iat: usize,  // Issued At (quando o token foi criado)
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtpChallengeResponse {
    pub verification_id: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub phone_number: String,
    pub is_admin: bool,
}
