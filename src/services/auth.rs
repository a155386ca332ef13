// src/services/auth.rs

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::{error::AppError, phone::PhoneNormalizer},
    models::auth::{AuthResponse, Claims, OtpChallengeResponse, Viewer},
    services::{authorization::AuthorizationPolicy, contact_service::ContactService},
};

pub const OTP_DIGITS: usize = 6;
/// Tentativas permitidas antes de o código ser descartado
pub const OTP_MAX_ATTEMPTS: u32 = 5;

/// Quem entrega o código por SMS. O serviço só conhece este contrato.
#[async_trait]
pub trait OtpProvider: Send + Sync {
    /// Envia um código para o telefone e devolve o id da verificação.
    async fn send_code(&self, phone_number: &str) -> Result<String, AppError>;
    /// Confere o código e devolve o telefone verificado.
    async fn verify_code(&self, verification_id: &str, code: &str) -> Result<String, AppError>;
}

// ---
// Provedor local (desenvolvimento): o código sai no log
// ---

struct PendingCode {
    phone_number: String,
    code_hash: String,
    expires_at: DateTime<Utc>,
    attempts: u32,
}

pub struct LocalOtpProvider {
    pending: Mutex<HashMap<String, PendingCode>>,
    ttl: Duration,
    cost: u32,
}

impl LocalOtpProvider {
    pub fn new(ttl: Duration) -> Self {
        Self::with_cost(ttl, bcrypt::DEFAULT_COST)
    }

    pub fn with_cost(ttl: Duration, cost: u32) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl,
            cost,
        }
    }

    fn generate_code() -> String {
        let bytes = Uuid::new_v4().into_bytes();
        let seed = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        format!("{:06}", seed % 1_000_000)
    }
}

#[async_trait]
impl OtpProvider for LocalOtpProvider {
    async fn send_code(&self, phone_number: &str) -> Result<String, AppError> {
        let code = Self::generate_code();

        // bcrypt é CPU-bound: roda fora do executor
        let code_clone = code.clone();
        let cost = self.cost;
        let code_hash = tokio::task::spawn_blocking(move || hash(&code_clone, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let verification_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut pending = self.pending.lock().await;
        // Códigos vencidos que nunca foram conferidos
        pending.retain(|_, entry| entry.expires_at >= now);
        pending.insert(
            verification_id.clone(),
            PendingCode {
                phone_number: phone_number.to_string(),
                code_hash,
                expires_at: now + self.ttl,
                attempts: 0,
            },
        );
        drop(pending);

        tracing::info!("📲 OTP para {}: {} (verificação {})", phone_number, code, verification_id);
        Ok(verification_id)
    }

    async fn verify_code(&self, verification_id: &str, code: &str) -> Result<String, AppError> {
        let (phone_number, code_hash) = {
            let mut pending = self.pending.lock().await;
            let entry = pending.get_mut(verification_id).ok_or(AppError::InvalidOtp)?;
            if entry.expires_at < Utc::now() || entry.attempts >= OTP_MAX_ATTEMPTS {
                pending.remove(verification_id);
                return Err(AppError::InvalidOtp);
            }
            // Conta antes do bcrypt: tentativas em paralelo também entram no limite
            entry.attempts += 1;
            (entry.phone_number.clone(), entry.code_hash.clone())
        };

        let code_clone = code.to_owned();
        let is_valid = tokio::task::spawn_blocking(move || verify(&code_clone, &code_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação do OTP: {}", e))??;

        let mut pending = self.pending.lock().await;
        if !is_valid {
            let exhausted = pending
                .get(verification_id)
                .is_some_and(|entry| entry.attempts >= OTP_MAX_ATTEMPTS);
            if exhausted {
                pending.remove(verification_id);
                tracing::warn!("⚠️ Verificação {} descartada após {} tentativas", verification_id, OTP_MAX_ATTEMPTS);
            }
            return Err(AppError::InvalidOtp);
        }

        // Código de uso único: outra chamada concorrente pode ter consumido antes
        if pending.remove(verification_id).is_none() {
            return Err(AppError::InvalidOtp);
        }
        Ok(phone_number)
    }
}

// ---
// Serviço de autenticação
// ---

#[derive(Clone)]
pub struct AuthService {
    contacts: ContactService,
    authorization: Arc<dyn AuthorizationPolicy>,
    otp: Arc<dyn OtpProvider>,
    phones: PhoneNormalizer,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(
        contacts: ContactService,
        authorization: Arc<dyn AuthorizationPolicy>,
        otp: Arc<dyn OtpProvider>,
        phones: PhoneNormalizer,
        jwt_secret: String,
    ) -> Self {
        Self { contacts, authorization, otp, phones, jwt_secret }
    }

    /// Só envia código para contatos conhecidos ou administradores.
    pub async fn request_otp(&self, raw_phone: &str) -> Result<OtpChallengeResponse, AppError> {
        let phone_number = self.phones.require(raw_phone)?;

        if !self.authorization.is_admin(&phone_number)
            && self.contacts.find_contact(&phone_number).await?.is_none()
        {
            tracing::warn!("🚫 Pedido de OTP para número desconhecido {}", phone_number);
            return Err(AppError::AccountNotFound);
        }

        let verification_id = self.otp.send_code(&phone_number).await?;
        Ok(OtpChallengeResponse { verification_id })
    }

    pub async fn verify_otp(&self, verification_id: &str, code: &str) -> Result<AuthResponse, AppError> {
        let code = code.trim();
        if code.len() != OTP_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::Validation(format!(
                "Please enter the {}-digit code.",
                OTP_DIGITS
            )));
        }

        let phone_number = self.otp.verify_code(verification_id, code).await?;
        let token = self.create_token(&phone_number)?;

        tracing::info!("🔑 {} autenticado", phone_number);
        Ok(AuthResponse {
            token,
            is_admin: self.authorization.is_admin(&phone_number),
            phone_number,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Viewer, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(Viewer { phone_number: token_data.claims.sub })
    }

    pub fn require_admin(&self, viewer: &Viewer) -> Result<(), AppError> {
        self.authorization.require_admin(&viewer.phone_number)
    }

    fn create_token(&self, phone_number: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::days(7);

        let claims = Claims {
            sub: phone_number.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::db_utils::StorePolicy,
        db::{ContactStore, MemoryStore},
        models::contact::Contact,
        services::authorization::AllowListPolicy,
    };

    const ADMIN: &str = "+919999999999";

    fn service(store: &MemoryStore, otp: Arc<dyn OtpProvider>) -> AuthService {
        let contacts = ContactService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            StorePolicy::default(),
        );
        AuthService::new(
            contacts,
            Arc::new(AllowListPolicy::new([ADMIN])),
            otp,
            PhoneNormalizer::new("+91"),
            "test-secret".into(),
        )
    }

    fn local() -> LocalOtpProvider {
        LocalOtpProvider::with_cost(Duration::minutes(5), 4)
    }

    #[tokio::test]
    async fn unknown_numbers_cannot_request_a_code() {
        let store = MemoryStore::new();
        let service = service(&store, Arc::new(local()));

        assert!(matches!(
            service.request_otp("9876543210").await,
            Err(AppError::AccountNotFound)
        ));
        assert!(matches!(
            service.request_otp("12345").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn admins_and_known_contacts_can_request_a_code() {
        let store = MemoryStore::new();
        store
            .add_membership(&Contact::imported("+919876543210".into(), 1), 1)
            .await
            .unwrap();
        let service = service(&store, Arc::new(local()));

        assert!(service.request_otp("9999999999").await.is_ok());
        assert!(service.request_otp("+919876543210").await.is_ok());
    }

    #[tokio::test]
    async fn local_provider_accepts_the_right_code_once() {
        let provider = local();
        let id = provider.send_code("+919876543210").await.unwrap();

        // O código real só aparece no log: grava um conhecido por cima
        let known_hash = hash("123456", 4).unwrap();
        provider.pending.lock().await.get_mut(&id).unwrap().code_hash = known_hash;

        assert!(matches!(
            provider.verify_code(&id, "000000").await,
            Err(AppError::InvalidOtp)
        ));
        assert_eq!(provider.verify_code(&id, "123456").await.unwrap(), "+919876543210");
        assert!(matches!(
            provider.verify_code(&id, "123456").await,
            Err(AppError::InvalidOtp)
        ));
    }

    #[tokio::test]
    async fn expired_codes_are_rejected() {
        let provider = LocalOtpProvider::with_cost(Duration::seconds(-1), 4);
        let id = provider.send_code("+919876543210").await.unwrap();
        assert!(matches!(
            provider.verify_code(&id, "123456").await,
            Err(AppError::InvalidOtp)
        ));
    }

    #[tokio::test]
    async fn code_is_discarded_after_too_many_wrong_guesses() {
        let provider = local();
        let id = provider.send_code("+919876543210").await.unwrap();
        let known_hash = hash("123456", 4).unwrap();
        provider.pending.lock().await.get_mut(&id).unwrap().code_hash = known_hash;

        for _ in 0..OTP_MAX_ATTEMPTS {
            assert!(matches!(
                provider.verify_code(&id, "000000").await,
                Err(AppError::InvalidOtp)
            ));
        }
        assert!(provider.pending.lock().await.is_empty());
        assert!(matches!(
            provider.verify_code(&id, "123456").await,
            Err(AppError::InvalidOtp)
        ));
    }

    #[tokio::test]
    async fn expired_codes_are_purged_on_send() {
        let expired = LocalOtpProvider::with_cost(Duration::seconds(-1), 4);
        for _ in 0..20 {
            expired.send_code("+919876543210").await.unwrap();
        }
        // Só o último, recém-inserido, continua no mapa
        assert_eq!(expired.pending.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn verified_code_yields_a_token_for_the_phone_number() {
        let store = MemoryStore::new();
        let provider = Arc::new(local());
        let service = service(&store, provider.clone());

        let challenge = service.request_otp("9999999999").await.unwrap();
        // O código real só aparece no log: grava um conhecido por cima
        let known_hash = hash("654321", 4).unwrap();
        provider
            .pending
            .lock()
            .await
            .get_mut(&challenge.verification_id)
            .unwrap()
            .code_hash = known_hash;

        assert!(matches!(
            service.verify_otp(&challenge.verification_id, "12ab56").await,
            Err(AppError::Validation(_))
        ));

        let auth = service.verify_otp(&challenge.verification_id, "654321").await.unwrap();
        assert!(auth.is_admin);
        assert_eq!(auth.phone_number, ADMIN);

        let viewer = service.validate_token(&auth.token).unwrap();
        assert_eq!(viewer.phone_number, ADMIN);
        assert!(matches!(
            service.validate_token("garbage"),
            Err(AppError::InvalidToken)
        ));
    }
}
