// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::request_otp,
        handlers::auth::verify_otp,

        // --- Users ---
        handlers::users::register,
        handlers::users::get_me,

        // --- Folders ---
        handlers::folders::list_folders,
        handlers::folders::create_folder,
        handlers::folders::rename_folder,
        handlers::folders::delete_folder,
        handlers::folders::count_members,
        handlers::folders::list_numbers,
        handlers::folders::import_numbers,
        handlers::folders::delete_number,

        // --- Packages ---
        handlers::packages::list_packages,
        handlers::packages::create_package,
        handlers::packages::rename_package,
        handlers::packages::delete_package,
        handlers::packages::add_duration,
        handlers::packages::update_duration,
        handlers::packages::delete_duration,

        // --- Posts ---
        handlers::posts::create_post,
        handlers::posts::list_posts,
        handlers::posts::get_post,
        handlers::posts::update_post,
        handlers::posts::delete_post,

        // --- Feed ---
        handlers::feed::get_feed,
        handlers::feed::stream_feed,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::OtpChallengeResponse,
            models::auth::AuthResponse,
            handlers::auth::RequestOtpPayload,
            handlers::auth::VerifyOtpPayload,

            // --- Contacts ---
            models::contact::Address,
            models::contact::Profile,
            models::contact::Subscription,
            models::contact::Contact,
            models::contact::PackageSelection,
            models::contact::RegistrationReceipt,
            handlers::users::RegisterPayload,

            // --- Folders ---
            models::folder::Folder,
            models::folder::FolderCount,
            models::folder::FolderSummary,
            models::folder::ImportReport,
            models::folder::ImportFailure,
            handlers::folders::FolderNamePayload,
            handlers::folders::CountMembersPayload,
            handlers::folders::ImportNumbersPayload,

            // --- Packages ---
            models::package::Package,
            models::package::PackageDuration,
            handlers::packages::DurationPayload,
            handlers::packages::CreatePackagePayload,
            handlers::packages::RenamePackagePayload,

            // --- Posts / Feed ---
            models::post::PostCategory,
            models::post::PostFile,
            models::post::Post,
            models::post::AllFolders,
            models::post::PostTargets,
            models::post::FeedBuckets,
            handlers::posts::PostPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Login por telefone (OTP)"),
        (name = "Users", description = "Cadastro e Perfil do Lojista"),
        (name = "Folders", description = "Pastas e Importação de Números"),
        (name = "Packages", description = "Pacotes, Durações e Preços"),
        (name = "Posts", description = "Publicações (Administração)"),
        (name = "Feed", description = "Feed Categorizado do Usuário")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
