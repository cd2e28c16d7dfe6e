// src/handlers/tickets.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PermTicketsManage, PermTicketsView, RequirePermission},
    },
    models::ticket::{
        CreateTicketPayload, ReplyTicketPayload, Ticket, TicketDetail, TicketQuery, TicketReply,
        UpdateTicketPayload,
    },
};

// ---
// Área do usuário: só os próprios chamados
// ---

#[utoipa::path(
    post,
    path = "/api/user/tickets",
    tag = "Tickets",
    request_body = CreateTicketPayload,
    responses(
        (status = 201, description = "Chamado aberto", body = Ticket),
        (status = 422, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_ticket(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateTicketPayload>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = app_state.ticket_service.create_ticket(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    get,
    path = "/api/user/tickets",
    tag = "Tickets",
    params(TicketQuery),
    responses((status = 200, description = "Meus chamados", body = Vec<Ticket>)),
    security(("api_jwt" = []))
)]
pub async fn list_my_tickets(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    let tickets = app_state.ticket_service.list_tickets(&user, &query, false).await?;
    Ok(Json(tickets))
}

#[utoipa::path(
    get,
    path = "/api/user/tickets/{ticket_id}",
    tag = "Tickets",
    params(("ticket_id" = Uuid, Path, description = "ID do chamado")),
    responses(
        (status = 200, description = "Chamado com respostas", body = TicketDetail),
        (status = 404, description = "Chamado não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_my_ticket(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<TicketDetail>, AppError> {
    let detail = app_state.ticket_service.get_ticket(&user, ticket_id, false).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    post,
    path = "/api/user/tickets/{ticket_id}/replies",
    tag = "Tickets",
    request_body = ReplyTicketPayload,
    params(("ticket_id" = Uuid, Path, description = "ID do chamado")),
    responses(
        (status = 201, description = "Resposta enviada", body = TicketReply),
        (status = 400, description = "Chamado encerrado"),
        (status = 404, description = "Chamado não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn reply_my_ticket(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<ReplyTicketPayload>,
) -> Result<impl IntoResponse, AppError> {
    let reply = app_state
        .ticket_service
        .reply(&user, ticket_id, payload, false)
        .await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

// ---
// Área administrativa
// ---

#[utoipa::path(
    get,
    path = "/api/admin/tickets",
    tag = "Tickets",
    params(TicketQuery),
    responses((status = 200, description = "Todos os chamados", body = Vec<Ticket>)),
    security(("api_jwt" = []))
)]
pub async fn list_tickets(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequirePermission<PermTicketsView>,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    let tickets = app_state.ticket_service.list_tickets(&user, &query, true).await?;
    Ok(Json(tickets))
}

#[utoipa::path(
    get,
    path = "/api/admin/tickets/{ticket_id}",
    tag = "Tickets",
    params(("ticket_id" = Uuid, Path, description = "ID do chamado")),
    responses(
        (status = 200, description = "Chamado com respostas", body = TicketDetail),
        (status = 404, description = "Chamado não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_ticket(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequirePermission<PermTicketsView>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<TicketDetail>, AppError> {
    let detail = app_state.ticket_service.get_ticket(&user, ticket_id, true).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/admin/tickets/{ticket_id}",
    tag = "Tickets",
    request_body = UpdateTicketPayload,
    params(("ticket_id" = Uuid, Path, description = "ID do chamado")),
    responses(
        (status = 200, description = "Chamado atualizado", body = Ticket),
        (status = 404, description = "Chamado não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_ticket(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermTicketsManage>,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<UpdateTicketPayload>,
) -> Result<Json<Ticket>, AppError> {
    let ticket = app_state.ticket_service.update_ticket(ticket_id, payload).await?;
    Ok(Json(ticket))
}

#[utoipa::path(
    post,
    path = "/api/admin/tickets/{ticket_id}/replies",
    tag = "Tickets",
    request_body = ReplyTicketPayload,
    params(("ticket_id" = Uuid, Path, description = "ID do chamado")),
    responses(
        (status = 201, description = "Resposta do suporte enviada", body = TicketReply),
        (status = 404, description = "Chamado não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn reply_ticket(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequirePermission<PermTicketsManage>,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<ReplyTicketPayload>,
) -> Result<impl IntoResponse, AppError> {
    let reply = app_state
        .ticket_service
        .reply(&user, ticket_id, payload, true)
        .await?;
    Ok((StatusCode::CREATED, Json(reply)))
}
