// src/db/settings_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::settings::{Setting, UpsertSettingRequest},
};

const SETTING_COLUMNS: &str = "id, key, value, value_type, is_public, updated_at";

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_settings(&self, only_public: bool) -> Result<Vec<Setting>, AppError> {
        let settings = sqlx::query_as::<_, Setting>(&format!(
            "SELECT {SETTING_COLUMNS} FROM settings WHERE ($1 = false OR is_public) ORDER BY key ASC"
        ))
        .bind(only_public)
        .fetch_all(&self.pool)
        .await?;

        Ok(settings)
    }

    pub async fn upsert_setting<'e, E>(
        &self,
        executor: E,
        input: &UpsertSettingRequest,
    ) -> Result<Setting, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT (Insert or Update)
        let setting = sqlx::query_as::<_, Setting>(&format!(
            r#"
            INSERT INTO settings (key, value, value_type, is_public)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key)
            DO UPDATE SET
                value = EXCLUDED.value,
                value_type = EXCLUDED.value_type,
                is_public = EXCLUDED.is_public,
                updated_at = NOW()
            RETURNING {SETTING_COLUMNS}
            "#
        ))
        .bind(&input.key)
        .bind(&input.value)
        .bind(input.value_type)
        .bind(input.is_public)
        .fetch_one(executor)
        .await?;

        Ok(setting)
    }

    pub async fn delete_setting(&self, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM settings WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
