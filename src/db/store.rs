// src/db/store.rs
//
// Contrato com o armazenamento de documentos. Os serviços só conhecem
// estes traits; o Postgres (produção) e a memória (dev/testes) implementam.

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        contact::{Contact, MembershipOutcome, Profile, Subscription},
        folder::Folder,
        package::{Package, PackageDuration},
        post::{NewPost, Post, PostQuery, PostUpdate},
    },
};

#[async_trait]
pub trait FolderStore: Send + Sync {
    /// Ordenadas por id crescente.
    async fn list_folders(&self) -> Result<Vec<Folder>, AppError>;
    async fn find_folder(&self, id: i64) -> Result<Option<Folder>, AppError>;
    /// max(ids existentes, maior id já emitido) + 1. Ids não são reusados após delete.
    async fn next_folder_id(&self) -> Result<i64, AppError>;
    /// Escrita condicional: `false` se o id já estava ocupado.
    async fn insert_folder_if_absent(&self, folder: &Folder) -> Result<bool, AppError>;
    async fn rename_folder(&self, id: i64, name: &str) -> Result<bool, AppError>;
    async fn delete_folder(&self, id: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Contact>, AppError>;
    async fn list_members(&self, folder_id: i64) -> Result<Vec<Contact>, AppError>;
    async fn count_members(&self, folder_id: i64) -> Result<u64, AppError>;
    /// Atômico por telefone: se não existe cria `candidate`; se existe e não é
    /// membro, adiciona a chave da pasta; se já é membro, nada muda.
    async fn add_membership(
        &self,
        candidate: &Contact,
        folder_id: i64,
    ) -> Result<MembershipOutcome, AppError>;
    async fn delete_contact(&self, userid: Uuid) -> Result<bool, AppError>;
    /// Cadastro: substitui perfil e assinaturas, preserva as pastas.
    /// Devolve o contato e `true` quando foi criado agora.
    async fn upsert_registration(
        &self,
        phone_number: &str,
        profile: &Profile,
        subscriptions: &[Subscription],
    ) -> Result<(Contact, bool), AppError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Sempre em ordem de timestamp decrescente.
    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, AppError>;
    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, AppError>;
    async fn insert_post(&self, post: &NewPost) -> Result<Post, AppError>;
    async fn update_post(&self, id: Uuid, update: &PostUpdate) -> Result<Option<Post>, AppError>;
    async fn delete_post(&self, id: Uuid) -> Result<bool, AppError>;
    /// Um aviso por mudança em `posts` (insert/update/delete).
    fn subscribe(&self) -> broadcast::Receiver<()>;
}

#[async_trait]
pub trait PackageStore: Send + Sync {
    async fn list_packages(&self) -> Result<Vec<Package>, AppError>;
    async fn find_package(&self, id: i64) -> Result<Option<Package>, AppError>;
    async fn next_package_id(&self) -> Result<i64, AppError>;
    async fn insert_package_if_absent(&self, package: &Package) -> Result<bool, AppError>;
    async fn rename_package(&self, id: i64, name: &str) -> Result<bool, AppError>;
    async fn replace_durations(
        &self,
        id: i64,
        durations: &[PackageDuration],
    ) -> Result<bool, AppError>;
    async fn delete_package(&self, id: i64) -> Result<bool, AppError>;
}
