// src/db/ticket_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::ticket::{Ticket, TicketPriority, TicketQuery, TicketReply, TicketStatus},
};

const TICKET_COLUMNS: &str = "id, user_id, subject, message, status, priority, created_at, updated_at";

#[derive(Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_ticket<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        subject: &str,
        message: &str,
        priority: TicketPriority,
    ) -> Result<Ticket, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            INSERT INTO tickets (user_id, subject, message, priority)
            VALUES ($1, $2, $3, $4)
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(subject)
        .bind(message)
        .bind(priority)
        .fetch_one(executor)
        .await?;

        Ok(ticket)
    }

    /// Lista chamados; `owner` restringe aos chamados de um usuário.
    pub async fn list_tickets<'e, E>(
        &self,
        executor: E,
        owner: Option<Uuid>,
        query: &TicketQuery,
    ) -> Result<Vec<Ticket>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM tickets
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::ticket_status IS NULL OR status = $2)
              AND ($3::ticket_priority IS NULL OR priority = $3)
            ORDER BY updated_at DESC
            "#
        ))
        .bind(owner)
        .bind(query.status)
        .bind(query.priority)
        .fetch_all(executor)
        .await?;

        Ok(tickets)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Ticket>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ticket =
            sqlx::query_as::<_, Ticket>(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(ticket)
    }

    /// Atualiza status e/ou prioridade; campos nulos mantêm o valor atual.
    pub async fn update_ticket<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: Option<TicketStatus>,
        priority: Option<TicketPriority>,
    ) -> Result<Option<Ticket>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            UPDATE tickets SET
                status = COALESCE($2, status),
                priority = COALESCE($3, priority),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(priority)
        .fetch_optional(executor)
        .await?;

        Ok(ticket)
    }

    pub async fn add_reply<'e, E>(
        &self,
        executor: E,
        ticket_id: Uuid,
        user_id: Uuid,
        message: &str,
        is_admin_reply: bool,
    ) -> Result<TicketReply, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reply = sqlx::query_as::<_, TicketReply>(
            r#"
            INSERT INTO ticket_replies (ticket_id, user_id, message, is_admin_reply)
            VALUES ($1, $2, $3, $4)
            RETURNING id, ticket_id, user_id, message, is_admin_reply, created_at
            "#,
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(message)
        .bind(is_admin_reply)
        .fetch_one(executor)
        .await?;

        Ok(reply)
    }

    pub async fn list_replies<'e, E>(&self, executor: E, ticket_id: Uuid) -> Result<Vec<TicketReply>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let replies = sqlx::query_as::<_, TicketReply>(
            r#"
            SELECT id, ticket_id, user_id, message, is_admin_reply, created_at
            FROM ticket_replies
            WHERE ticket_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(executor)
        .await?;

        Ok(replies)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
