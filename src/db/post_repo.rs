// src/db/post_repo.rs

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgListener, types::Json, FromRow, PgPool};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::PostStore,
    models::post::{NewPost, Post, PostFile, PostQuery, PostUpdate},
};

const POST_CHANNEL: &str = "post_changes";

const POST_COLUMNS: &str =
    "id, category, description, created_at, files, hyperlink, packages, posted_by";

#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    category: String,
    description: String,
    created_at: DateTime<Utc>,
    files: Json<Vec<PostFile>>,
    hyperlink: String,
    packages: Vec<i64>,
    posted_by: Option<String>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            category: row.category,
            description: row.description,
            timestamp: row.created_at,
            files: row.files.0,
            hyperlink: row.hyperlink,
            packages: row.packages,
            posted_by: row.posted_by,
        }
    }
}

#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
    changes: broadcast::Sender<()>,
}

impl PostRepository {
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self { pool, changes }
    }

    /// Escuta o NOTIFY disparado pelo trigger de `posts` e repassa para os
    /// assinantes do feed. Reconecta sozinho se a conexão cair.
    pub fn spawn_change_listener(&self) -> tokio::task::JoinHandle<()> {
        let pool = self.pool.clone();
        let changes = self.changes.clone();

        tokio::spawn(async move {
            loop {
                match listen(&pool, &changes).await {
                    Ok(()) => return,
                    Err(e) => {
                        tracing::error!("🔥 Listener de posts caiu: {}. Reconectando...", e);
                        // Força os assinantes a recalcular: podemos ter perdido avisos
                        let _ = changes.send(());
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        })
    }
}

async fn listen(pool: &PgPool, changes: &broadcast::Sender<()>) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(POST_CHANNEL).await?;
    tracing::info!("👂 Escutando o canal '{}'", POST_CHANNEL);

    loop {
        let notification = listener.recv().await?;
        tracing::debug!("post alterado: {}", notification.payload());
        let _ = changes.send(());
    }
}

#[async_trait]
impl PostStore for PostRepository {
    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, AppError> {
        let folders: Option<Vec<i64>> = match query {
            PostQuery::All => None,
            PostQuery::AnyOfFolders(ids) => Some(ids.clone()),
        };

        // `&&` = interseção de arrays (array-contains-any)
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts
            WHERE $1::bigint[] IS NULL OR packages && $1::bigint[]
            ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(folders)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Post::from))
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post, AppError> {
        // created_at fica com o DEFAULT NOW() do servidor
        let sql = format!(
            r#"
            INSERT INTO posts (id, category, description, files, hyperlink, packages, posted_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {POST_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(post.category.as_str())
            .bind(&post.description)
            .bind(Json(&post.files))
            .bind(&post.hyperlink)
            .bind(&post.packages)
            .bind(&post.posted_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(Post::from(row))
    }

    async fn update_post(&self, id: Uuid, update: &PostUpdate) -> Result<Option<Post>, AppError> {
        let sql = format!(
            r#"
            UPDATE posts
            SET category = $2, description = $3, files = $4, hyperlink = $5, packages = $6
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(update.category.as_str())
            .bind(&update.description)
            .bind(Json(&update.files))
            .bind(&update.hyperlink)
            .bind(&update.packages)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Post::from))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}
