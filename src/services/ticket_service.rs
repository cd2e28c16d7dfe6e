// src/services/ticket_service.rs

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::TicketRepository,
    models::{
        auth::User,
        ticket::{
            CreateTicketPayload, ReplyTicketPayload, Ticket, TicketDetail, TicketQuery, TicketReply,
            TicketStatus, UpdateTicketPayload,
        },
    },
};

/// Novo status após uma resposta, se houver mudança.
/// Admin respondendo um chamado aberto passa a atendê-lo; o dono
/// respondendo um chamado resolvido o reabre.
pub fn status_after_reply(current: TicketStatus, is_admin_reply: bool) -> Option<TicketStatus> {
    match (current, is_admin_reply) {
        (TicketStatus::Open, true) => Some(TicketStatus::InProgress),
        (TicketStatus::Resolved, false) => Some(TicketStatus::Open),
        _ => None,
    }
}

#[derive(Clone)]
pub struct TicketService {
    repo: TicketRepository,
}

impl TicketService {
    pub fn new(repo: TicketRepository) -> Self {
        Self { repo }
    }

    pub async fn create_ticket(&self, user: &User, payload: CreateTicketPayload) -> Result<Ticket, AppError> {
        payload.validate()?;
        let ticket = self
            .repo
            .create_ticket(
                self.repo.pool(),
                user.id,
                payload.subject.trim(),
                payload.message.trim(),
                payload.priority,
            )
            .await?;
        tracing::info!(ticket_id = %ticket.id, user_id = %user.id, "chamado aberto");
        Ok(ticket)
    }

    /// `admin_view` lista todos os chamados; caso contrário, só os do usuário.
    pub async fn list_tickets(
        &self,
        user: &User,
        query: &TicketQuery,
        admin_view: bool,
    ) -> Result<Vec<Ticket>, AppError> {
        let owner = (!admin_view).then_some(user.id);
        self.repo.list_tickets(self.repo.pool(), owner, query).await
    }

    // Chamado de outro usuário é tratado como inexistente
    async fn load_visible(&self, user: &User, id: Uuid, admin_view: bool) -> Result<Ticket, AppError> {
        let ticket = self
            .repo
            .find_by_id(self.repo.pool(), id)
            .await?
            .ok_or(AppError::NotFound("Chamado"))?;

        if !admin_view && ticket.user_id != user.id {
            return Err(AppError::NotFound("Chamado"));
        }
        Ok(ticket)
    }

    pub async fn get_ticket(&self, user: &User, id: Uuid, admin_view: bool) -> Result<TicketDetail, AppError> {
        let ticket = self.load_visible(user, id, admin_view).await?;
        let replies = self.repo.list_replies(self.repo.pool(), id).await?;
        Ok(TicketDetail { ticket, replies })
    }

    pub async fn reply(
        &self,
        user: &User,
        id: Uuid,
        payload: ReplyTicketPayload,
        admin_view: bool,
    ) -> Result<TicketReply, AppError> {
        payload.validate()?;
        let ticket = self.load_visible(user, id, admin_view).await?;

        if !admin_view && ticket.status == TicketStatus::Closed {
            return Err(AppError::BadRequest("Este chamado está encerrado.".into()));
        }

        let mut tx = self.repo.pool().begin().await?;
        let reply = self
            .repo
            .add_reply(&mut *tx, id, user.id, payload.message.trim(), admin_view)
            .await?;

        let next = status_after_reply(ticket.status, admin_view);
        self.repo.update_ticket(&mut *tx, id, next, None).await?;
        tx.commit().await?;

        if let Some(status) = next {
            tracing::info!(ticket_id = %id, ?status, "status do chamado alterado pela resposta");
        }
        Ok(reply)
    }

    pub async fn update_ticket(&self, id: Uuid, payload: UpdateTicketPayload) -> Result<Ticket, AppError> {
        if payload.status.is_none() && payload.priority.is_none() {
            return Err(AppError::BadRequest("Informe o status ou a prioridade.".into()));
        }

        self.repo
            .update_ticket(self.repo.pool(), id, payload.status, payload.priority)
            .await?
            .ok_or(AppError::NotFound("Chamado"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_reply_starts_work_on_open_ticket() {
        assert_eq!(status_after_reply(TicketStatus::Open, true), Some(TicketStatus::InProgress));
        assert_eq!(status_after_reply(TicketStatus::InProgress, true), None);
        assert_eq!(status_after_reply(TicketStatus::Closed, true), None);
    }

    #[test]
    fn owner_reply_reopens_resolved_ticket() {
        assert_eq!(status_after_reply(TicketStatus::Resolved, false), Some(TicketStatus::Open));
        assert_eq!(status_after_reply(TicketStatus::Open, false), None);
        assert_eq!(status_after_reply(TicketStatus::InProgress, false), None);
    }
}
