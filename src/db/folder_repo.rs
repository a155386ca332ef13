// src/db/folder_repo.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::{
    common::{
        db_utils::{bump_watermark, next_id},
        error::AppError,
    },
    db::store::FolderStore,
    models::folder::Folder,
};

#[derive(Debug, FromRow)]
struct FolderRow {
    id: i64,
    name: String,
}

impl From<FolderRow> for Folder {
    fn from(row: FolderRow) -> Self {
        Folder { id: row.id, name: row.name }
    }
}

// O repositório de pastas, responsável pela tabela 'folders'
#[derive(Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FolderStore for FolderRepository {
    async fn list_folders(&self) -> Result<Vec<Folder>, AppError> {
        let rows = sqlx::query_as::<_, FolderRow>("SELECT id, name FROM folders ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Folder::from).collect())
    }

    async fn find_folder(&self, id: i64) -> Result<Option<Folder>, AppError> {
        let row = sqlx::query_as::<_, FolderRow>("SELECT id, name FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Folder::from))
    }

    async fn next_folder_id(&self) -> Result<i64, AppError> {
        next_id(&self.pool, "folders").await
    }

    async fn insert_folder_if_absent(&self, folder: &Folder) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        // ON CONFLICT DO NOTHING: se outro admin pegou o id, nada é escrito
        let inserted = sqlx::query(
            r#"
            INSERT INTO folders (id, name) VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(folder.id)
        .bind(&folder.name)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            bump_watermark(&mut *tx, "folders", folder.id).await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn rename_folder(&self, id: i64, name: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE folders SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_folder(&self, id: i64) -> Result<bool, AppError> {
        // Não mexe em contacts.packages: a referência pendente é mantida
        let result = sqlx::query("DELETE FROM folders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
