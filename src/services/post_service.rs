// src/services/post_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{db_utils::StorePolicy, error::AppError},
    db::{FolderStore, PostStore},
    models::{
        auth::Viewer,
        post::{NewPost, Post, PostCategory, PostFile, PostQuery, PostTargets, PostUpdate},
    },
};

// O que o administrador preenche na tela de criação/edição
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub category: PostCategory,
    pub description: String,
    pub files: Vec<PostFile>,
    pub hyperlink: Option<String>,
    pub targets: PostTargets,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostStore>,
    folders: Arc<dyn FolderStore>,
    store_policy: StorePolicy,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostStore>, folders: Arc<dyn FolderStore>, store_policy: StorePolicy) -> Self {
        Self { posts, folders, store_policy }
    }

    /// Valida o rascunho e resolve `"all"` para os ids de pasta existentes.
    async fn resolve_draft(&self, draft: &PostDraft) -> Result<(String, Vec<i64>), AppError> {
        let description = draft.description.trim().to_string();
        // Anúncio pode ser só imagem
        if description.is_empty() && draft.category != PostCategory::Advertisement {
            return Err(AppError::Validation("Please enter a description.".to_string()));
        }

        let mut packages = match &draft.targets {
            PostTargets::All(_) => self
                .store_policy
                .bounded("list_folders", self.folders.list_folders())
                .await?
                .into_iter()
                .map(|f| f.id)
                .collect(),
            PostTargets::Folders(ids) => ids.clone(),
        };
        packages.sort_unstable();
        packages.dedup();

        if packages.is_empty() {
            return Err(AppError::Validation("Please select at least one folder.".to_string()));
        }

        Ok((description, packages))
    }

    pub async fn create_post(&self, author: &Viewer, draft: PostDraft) -> Result<Post, AppError> {
        let (description, packages) = self.resolve_draft(&draft).await?;

        let new_post = NewPost {
            category: draft.category,
            description,
            files: draft.files,
            hyperlink: draft.hyperlink.unwrap_or_default(),
            packages,
            posted_by: Some(author.phone_number.clone()),
        };

        // Sem retry: cada tentativa geraria um post novo
        let post = self
            .store_policy
            .bounded("insert_post", self.posts.insert_post(&new_post))
            .await?;

        tracing::info!(
            "📝 Post {} ({}) publicado para {} pasta(s)",
            post.id,
            post.category,
            post.packages.len()
        );
        Ok(post)
    }

    pub async fn update_post(&self, id: Uuid, draft: PostDraft) -> Result<Post, AppError> {
        let (description, packages) = self.resolve_draft(&draft).await?;

        let update = PostUpdate {
            category: draft.category,
            description,
            files: draft.files,
            hyperlink: draft.hyperlink.unwrap_or_default(),
            packages,
        };

        let post = self
            .store_policy
            .retry_idempotent("update_post", || self.posts.update_post(id, &update))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found.", id)))?;

        tracing::info!("✏️ Post {} atualizado", id);
        Ok(post)
    }

    pub async fn delete_post(&self, id: Uuid) -> Result<(), AppError> {
        let deleted = self
            .store_policy
            .bounded("delete_post", self.posts.delete_post(id))
            .await?;
        if !deleted {
            return Err(AppError::NotFound(format!("Post {} not found.", id)));
        }

        tracing::info!("🗑️ Post {} apagado", id);
        Ok(())
    }

    pub async fn get_post(&self, id: Uuid) -> Result<Post, AppError> {
        self.store_policy
            .bounded("find_post", self.posts.find_post(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found.", id)))
    }

    /// Listagem do administrador: todos os posts, mais novos primeiro.
    pub async fn list_posts(&self, category: Option<PostCategory>) -> Result<Vec<Post>, AppError> {
        let posts = self
            .store_policy
            .bounded("list_posts", self.posts.list_posts(&PostQuery::All))
            .await?;

        Ok(match category {
            Some(category) => posts
                .into_iter()
                .filter(|p| p.category == category.as_str())
                .collect(),
            None => posts,
        })
    }
}
