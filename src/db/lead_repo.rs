// src/db/lead_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_constraint_error, error::AppError},
    models::lead::{Lead, LeadHistory, LeadQuery, NewLeadHistory},
    services::lead_service::LeadFields,
};

const LEAD_COLUMNS: &str = "id, plot_id, admin_user_id, name, email, phone, message, status, \
     score, metadata, created_at, updated_at, deleted_at";

fn invalid_reference(constraint: Option<&str>) -> AppError {
    match constraint {
        Some(c) if c.contains("admin_user_id") => {
            AppError::invalid_field("adminUserId", "Usuário responsável não encontrado.")
        }
        _ => AppError::invalid_field("plotId", "Lote não encontrado."),
    }
}

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create_lead<'e, E>(
        &self,
        executor: E,
        fields: &LeadFields,
        score: i32,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Lead>(&format!(
            r#"
            INSERT INTO leads (plot_id, admin_user_id, name, email, phone, message, status, score, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(fields.plot_id)
        .bind(fields.admin_user_id)
        .bind(&fields.name)
        .bind(fields.email.as_deref())
        .bind(fields.phone.as_deref())
        .bind(fields.message.as_deref())
        .bind(fields.status)
        .bind(score)
        .bind(&fields.metadata)
        .fetch_one(executor)
        .await
        .map_err(|e| map_constraint_error(e, |_| AppError::UniqueConstraintViolation("lead".into()), invalid_reference))
    }

    pub async fn list_leads<'e, E>(&self, executor: E, query: &LeadQuery) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let leads = sqlx::query_as::<_, Lead>(&format!(
            r#"
            SELECT {LEAD_COLUMNS}
            FROM leads
            WHERE deleted_at IS NULL
              AND ($1::lead_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR admin_user_id = $2)
              AND ($3::uuid IS NULL OR plot_id = $3)
            ORDER BY score DESC, created_at DESC
            "#
        ))
        .bind(query.status)
        .bind(query.admin_user_id)
        .bind(query.plot_id)
        .fetch_all(executor)
        .await?;

        Ok(leads)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    /// Lê o registro original travando a linha até o fim da transação,
    /// para que o diff do histórico compare com o valor realmente gravado.
    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    pub async fn update_lead<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        fields: &LeadFields,
        score: i32,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Lead>(&format!(
            r#"
            UPDATE leads SET
                plot_id = $2, admin_user_id = $3, name = $4, email = $5, phone = $6,
                message = $7, status = $8, score = $9, metadata = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(fields.plot_id)
        .bind(fields.admin_user_id)
        .bind(&fields.name)
        .bind(fields.email.as_deref())
        .bind(fields.phone.as_deref())
        .bind(fields.message.as_deref())
        .bind(fields.status)
        .bind(score)
        .bind(&fields.metadata)
        .fetch_one(executor)
        .await
        .map_err(|e| map_constraint_error(e, |_| AppError::UniqueConstraintViolation("lead".into()), invalid_reference))
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE leads SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  HISTÓRICO (somente inserção; não existe update nem delete aqui)
    // =========================================================================

    pub async fn append_history<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        actor_id: Option<Uuid>,
        entry: &NewLeadHistory,
    ) -> Result<LeadHistory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let history = sqlx::query_as::<_, LeadHistory>(
            r#"
            INSERT INTO lead_histories (lead_id, user_id, action, details, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, lead_id, user_id, action, details, metadata, created_at
            "#,
        )
        .bind(lead_id)
        .bind(actor_id)
        .bind(entry.action.as_str())
        .bind(entry.details.as_deref())
        .bind(&entry.metadata)
        .fetch_one(executor)
        .await?;

        Ok(history)
    }

    pub async fn list_history<'e, E>(&self, executor: E, lead_id: Uuid) -> Result<Vec<LeadHistory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let history = sqlx::query_as::<_, LeadHistory>(
            r#"
            SELECT id, lead_id, user_id, action, details, metadata, created_at
            FROM lead_histories
            WHERE lead_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(lead_id)
        .fetch_all(executor)
        .await?;

        Ok(history)
    }
}
