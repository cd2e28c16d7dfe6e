// src/handlers/leads.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PermLeadsDelete, PermLeadsEdit, PermLeadsView, RequirePermission},
    },
    models::lead::{
        CreateLeadPayload, Lead, LeadDetail, LeadHistory, LeadNotePayload, LeadQuery,
        UpdateLeadPayload,
    },
};

// POST /api/public/leads (formulário de interesse do site)
#[utoipa::path(
    post,
    path = "/api/public/leads",
    tag = "Leads",
    request_body = CreateLeadPayload,
    responses(
        (status = 201, description = "Lead recebido", body = Lead),
        (status = 422, description = "Dados inválidos")
    )
)]
pub async fn submit_lead(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service.submit_lead(payload).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

#[utoipa::path(
    get,
    path = "/api/admin/leads",
    tag = "Leads",
    params(LeadQuery),
    responses((status = 200, description = "Leads por pontuação", body = Vec<Lead>)),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermLeadsView>,
    Query(query): Query<LeadQuery>,
) -> Result<Json<Vec<Lead>>, AppError> {
    Ok(Json(app_state.lead_service.list_leads(&query).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/leads/{lead_id}",
    tag = "Leads",
    params(("lead_id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead com histórico", body = LeadDetail),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermLeadsView>,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<LeadDetail>, AppError> {
    Ok(Json(app_state.lead_service.get_lead(lead_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/leads/{lead_id}",
    tag = "Leads",
    request_body = UpdateLeadPayload,
    params(("lead_id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead atualizado (pontuação recalculada)", body = Lead),
        (status = 404, description = "Lead não encontrado"),
        (status = 422, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequirePermission<PermLeadsEdit>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<UpdateLeadPayload>,
) -> Result<Json<Lead>, AppError> {
    let lead = app_state
        .lead_service
        .update_lead(lead_id, payload, actor.id)
        .await?;
    Ok(Json(lead))
}

#[utoipa::path(
    post,
    path = "/api/admin/leads/{lead_id}/notes",
    tag = "Leads",
    request_body = LeadNotePayload,
    params(("lead_id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 201, description = "Anotação registrada no histórico", body = LeadHistory),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_note(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequirePermission<PermLeadsEdit>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<LeadNotePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let entry = app_state
        .lead_service
        .add_note(lead_id, &payload.note, actor.id)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/leads/{lead_id}",
    tag = "Leads",
    params(("lead_id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 204, description = "Lead excluído"),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_lead(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermLeadsDelete>,
    Path(lead_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.lead_service.delete_lead(lead_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
