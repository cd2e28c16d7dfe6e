// src/db/media_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::media::Media};

const MEDIA_COLUMNS: &str = "id, disk, path, original_name, mime_type, size_bytes, uploaded_by, created_at";

#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

impl MediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_media<'e, E>(
        &self,
        executor: E,
        disk: &str,
        path: &str,
        original_name: &str,
        mime_type: Option<&str>,
        size_bytes: i64,
        uploaded_by: Uuid,
    ) -> Result<Media, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let media = sqlx::query_as::<_, Media>(&format!(
            r#"
            INSERT INTO media (disk, path, original_name, mime_type, size_bytes, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MEDIA_COLUMNS}
            "#
        ))
        .bind(disk)
        .bind(path)
        .bind(original_name)
        .bind(mime_type)
        .bind(size_bytes)
        .bind(uploaded_by)
        .fetch_one(executor)
        .await?;

        Ok(media)
    }

    pub async fn list_media(&self) -> Result<Vec<Media>, AppError> {
        let media = sqlx::query_as::<_, Media>(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(media)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Media>, AppError> {
        let media = sqlx::query_as::<_, Media>(&format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(media)
    }

    /// Remove a linha e devolve o registro removido (para apagar o arquivo).
    pub async fn delete_media(&self, id: Uuid) -> Result<Option<Media>, AppError> {
        let media = sqlx::query_as::<_, Media>(&format!(
            "DELETE FROM media WHERE id = $1 RETURNING {MEDIA_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(media)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
