// src/db/package_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool};

use crate::{
    common::{
        db_utils::{bump_watermark, next_id},
        error::AppError,
    },
    db::store::PackageStore,
    models::package::{Package, PackageDuration},
};

#[derive(Debug, FromRow)]
struct PackageRow {
    id: i64,
    name: String,
    durations: Json<Vec<PackageDuration>>,
}

impl From<PackageRow> for Package {
    fn from(row: PackageRow) -> Self {
        Package {
            id: row.id,
            name: row.name,
            durations: row.durations.0,
        }
    }
}

#[derive(Clone)]
pub struct PackageRepository {
    pool: PgPool,
}

impl PackageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PackageStore for PackageRepository {
    async fn list_packages(&self) -> Result<Vec<Package>, AppError> {
        let rows = sqlx::query_as::<_, PackageRow>(
            "SELECT id, name, durations FROM packages ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Package::from).collect())
    }

    async fn find_package(&self, id: i64) -> Result<Option<Package>, AppError> {
        let row = sqlx::query_as::<_, PackageRow>(
            "SELECT id, name, durations FROM packages WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Package::from))
    }

    async fn next_package_id(&self) -> Result<i64, AppError> {
        next_id(&self.pool, "packages").await
    }

    async fn insert_package_if_absent(&self, package: &Package) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO packages (id, name, durations) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(package.id)
        .bind(&package.name)
        .bind(Json(&package.durations))
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            bump_watermark(&mut *tx, "packages", package.id).await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn rename_package(&self, id: i64, name: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE packages SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_durations(
        &self,
        id: i64,
        durations: &[PackageDuration],
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE packages SET durations = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(durations))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_package(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM packages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
