// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::FixedOffset;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::{db_utils::StorePolicy, phone::PhoneNormalizer},
    db::{
        ContactRepository, ContactStore, FolderRepository, FolderStore, MemoryStore,
        PackageRepository, PackageStore, PostRepository, PostStore,
    },
    services::{
        auth::{AuthService, LocalOtpProvider},
        authorization::AllowListPolicy,
        contact_service::ContactService,
        feed_service::FeedService,
        folder_service::{FolderService, ImportLimits},
        package_service::PackageService,
        post_service::PostService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("STORE_BACKEND inválido: '{}' (use postgres ou memory)", other),
        }
    }
}

// Tudo que vem do ambiente (.env)
#[derive(Debug, Clone)]
pub struct Settings {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub admin_phone_numbers: String,
    pub country_code: String,
    pub import_limits: ImportLimits,
    pub store_policy: StorePolicy,
    pub feed_offset: FixedOffset,
    pub otp_ttl: chrono::Duration,
    pub bind_addr: String,
}

fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválido ('{}'): {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend: StoreBackend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL deve ser definida quando STORE_BACKEND=postgres");
        }

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let offset_minutes: i32 = var_or("FEED_UTC_OFFSET_MINUTES", 330)?;
        let feed_offset = FixedOffset::east_opt(offset_minutes * 60)
            .context("FEED_UTC_OFFSET_MINUTES fora do intervalo")?;

        Ok(Self {
            store_backend,
            database_url,
            jwt_secret,
            admin_phone_numbers: env::var("ADMIN_PHONE_NUMBERS").unwrap_or_default(),
            country_code: env::var("COUNTRY_CODE").unwrap_or_else(|_| "+91".to_string()),
            import_limits: ImportLimits {
                max_batch: var_or("BULK_IMPORT_LIMIT", 500)?,
                concurrency: var_or("IMPORT_CONCURRENCY", 16)?,
            },
            store_policy: StorePolicy {
                timeout: Duration::from_millis(var_or("STORE_TIMEOUT_MS", 5000)?),
                write_attempts: var_or("WRITE_RETRY_ATTEMPTS", 3)?,
                ..StorePolicy::default()
            },
            feed_offset,
            otp_ttl: chrono::Duration::seconds(var_or("OTP_TTL_SECS", 300)?),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        })
    }
}

// Os quatro armazenamentos, já como trait objects
struct Stores {
    folders: Arc<dyn FolderStore>,
    contacts: Arc<dyn ContactStore>,
    packages: Arc<dyn PackageStore>,
    posts: Arc<dyn PostStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    /// Só existe com STORE_BACKEND=postgres (usado pelas migrações).
    pub db_pool: Option<PgPool>,
    pub auth_service: AuthService,
    pub contact_service: ContactService,
    pub folder_service: FolderService,
    pub package_service: PackageService,
    pub post_service: PostService,
    pub feed_service: FeedService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = Settings::from_env()?;

        let (stores, db_pool) = match settings.store_backend {
            StoreBackend::Postgres => {
                let database_url = settings
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL deve ser definida")?;

                let db_pool = PgPoolOptions::new()
                    .max_connections(10)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;

                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                let posts = PostRepository::new(db_pool.clone());
                posts.spawn_change_listener();

                let stores = Stores {
                    folders: Arc::new(FolderRepository::new(db_pool.clone())),
                    contacts: Arc::new(ContactRepository::new(db_pool.clone())),
                    packages: Arc::new(PackageRepository::new(db_pool.clone())),
                    posts: Arc::new(posts),
                };
                (stores, Some(db_pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("⚠️ STORE_BACKEND=memory: os dados somem ao reiniciar");
                let memory = MemoryStore::new();
                let stores = Stores {
                    folders: Arc::new(memory.clone()),
                    contacts: Arc::new(memory.clone()),
                    packages: Arc::new(memory.clone()),
                    posts: Arc::new(memory),
                };
                (stores, None)
            }
        };

        Ok(Self::build(settings, stores, db_pool))
    }

    // --- Monta o gráfico de dependências ---
    fn build(settings: Settings, stores: Stores, db_pool: Option<PgPool>) -> Self {
        let policy = settings.store_policy;
        let phones = PhoneNormalizer::new(settings.country_code.clone());
        let authorization = Arc::new(AllowListPolicy::from_csv(&settings.admin_phone_numbers));

        let contact_service = ContactService::new(stores.contacts.clone(), stores.packages.clone(), policy);
        let auth_service = AuthService::new(
            contact_service.clone(),
            authorization.clone(),
            Arc::new(LocalOtpProvider::new(settings.otp_ttl)),
            phones.clone(),
            settings.jwt_secret.clone(),
        );
        let folder_service = FolderService::new(
            stores.folders.clone(),
            stores.contacts.clone(),
            phones,
            policy,
            settings.import_limits,
        );
        let package_service = PackageService::new(stores.packages, policy);
        let post_service = PostService::new(stores.posts.clone(), stores.folders, policy);
        let feed_service = FeedService::new(
            stores.posts,
            stores.contacts,
            authorization,
            settings.feed_offset,
            policy,
        );

        Self {
            settings: Arc::new(settings),
            db_pool,
            auth_service,
            contact_service,
            folder_service,
            package_service,
            post_service,
            feed_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_case_insensitively() {
        assert_eq!("Memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert!("mongo".parse::<StoreBackend>().is_err());
    }
}
