//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    // Nível vem de RUST_LOG (padrão: info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    if let Some(pool) = &app_state.db_pool {
        sqlx::migrate!()
            .run(pool)
            .await
            .expect("Falha ao rodar as migrações do banco de dados.");
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    }

    // Rotas públicas: login por OTP
    let auth_routes = Router::new()
        .route("/otp", post(handlers::auth::request_otp))
        .route("/otp/verify", post(handlers::auth::verify_otp));

    // Rotas do usuário logado
    let user_routes = Router::new()
        .route("/register", post(handlers::users::register))
        .route("/me", get(handlers::users::get_me))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let feed_routes = Router::new()
        .route("/", get(handlers::feed::get_feed))
        .route("/stream", get(handlers::feed::stream_feed))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Administração (RequireAdmin em cada handler)
    let folder_routes = Router::new()
        .route("/"
               ,get(handlers::folders::list_folders)
               .post(handlers::folders::create_folder)
        )
        .route("/counts", post(handlers::folders::count_members))
        .route("/{id}"
               ,put(handlers::folders::rename_folder)
               .delete(handlers::folders::delete_folder)
        )
        .route("/{id}/numbers"
               ,get(handlers::folders::list_numbers)
               .post(handlers::folders::import_numbers)
        )
        .route("/{id}/numbers/{phone}", axum::routing::delete(handlers::folders::delete_number))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let admin_routes = Router::new()
        .route("/packages", post(handlers::packages::create_package))
        .route("/packages/{id}"
               ,put(handlers::packages::rename_package)
               .delete(handlers::packages::delete_package)
        )
        .route("/packages/{id}/durations", post(handlers::packages::add_duration))
        .route("/packages/{id}/durations/{duration_id}"
               ,put(handlers::packages::update_duration)
               .delete(handlers::packages::delete_duration)
        )
        .route("/posts"
               ,post(handlers::posts::create_post)
               .get(handlers::posts::list_posts)
        )
        .route("/posts/{id}"
               ,get(handlers::posts::get_post)
               .put(handlers::posts::update_post)
               .delete(handlers::posts::delete_post)
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let bind_addr = app_state.settings.bind_addr.clone();

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/packages", get(handlers::packages::list_packages))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/feed", feed_routes)
        .nest("/api/folders", folder_routes)
        .nest("/api/admin", admin_routes)
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", bind_addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
