// src/handlers/plots.rs

use axum::{
    body::Bytes,
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
    middleware::rbac::{
        PermPlotsCreate, PermPlotsDelete, PermPlotsEdit, PermPlotsImport, PermPlotsView,
        RequirePermission,
    },
    models::{
        import::{ImportReport, SyncSheetRequest},
        plot::{CreatePlotPayload, Plot, PlotQuery, UpdatePlotPayload},
    },
    services::{import_service::rows_from_csv, sync_service::SheetRef},
};

// ---
// Rotas públicas (mapa do site)
// ---

#[utoipa::path(
    get,
    path = "/api/public/plots",
    tag = "Plots",
    params(PlotQuery),
    responses((status = 200, description = "Lotes ativos", body = Vec<Plot>))
)]
pub async fn list_public_plots(
    State(app_state): State<AppState>,
    Query(mut query): Query<PlotQuery>,
) -> Result<Json<Vec<Plot>>, AppError> {
    // Excluídos nunca aparecem no site
    query.include_deleted = false;
    Ok(Json(app_state.plot_service.list_plots(&query).await?))
}

#[utoipa::path(
    get,
    path = "/api/public/plots/{plot_id}",
    tag = "Plots",
    params(("plot_id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Lote", body = Plot),
        (status = 404, description = "Lote não encontrado")
    )
)]
pub async fn get_public_plot(
    State(app_state): State<AppState>,
    Path(plot_id): Path<Uuid>,
) -> Result<Json<Plot>, AppError> {
    Ok(Json(app_state.plot_service.get_plot(plot_id, false).await?))
}

// ---
// Rotas administrativas
// ---

#[utoipa::path(
    get,
    path = "/api/admin/plots",
    tag = "Plots",
    params(PlotQuery),
    responses((status = 200, description = "Lotes", body = Vec<Plot>)),
    security(("api_jwt" = []))
)]
pub async fn list_plots(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPlotsView>,
    Query(query): Query<PlotQuery>,
) -> Result<Json<Vec<Plot>>, AppError> {
    Ok(Json(app_state.plot_service.list_plots(&query).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/plots/{plot_id}",
    tag = "Plots",
    params(("plot_id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Lote (inclusive excluído)", body = Plot),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_plot(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPlotsView>,
    Path(plot_id): Path<Uuid>,
) -> Result<Json<Plot>, AppError> {
    Ok(Json(app_state.plot_service.get_plot(plot_id, true).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/plots",
    tag = "Plots",
    request_body = CreatePlotPayload,
    responses(
        (status = 201, description = "Lote criado", body = Plot),
        (status = 409, description = "Número de lote já existe"),
        (status = 422, description = "Polígono ou campos inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_plot(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPlotsCreate>,
    Json(payload): Json<CreatePlotPayload>,
) -> Result<impl IntoResponse, AppError> {
    let plot = app_state.plot_service.create_plot(payload).await?;
    Ok((StatusCode::CREATED, Json(plot)))
}

#[utoipa::path(
    put,
    path = "/api/admin/plots/{plot_id}",
    tag = "Plots",
    request_body = UpdatePlotPayload,
    params(("plot_id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Lote atualizado", body = Plot),
        (status = 404, description = "Lote não encontrado"),
        (status = 409, description = "Número de lote já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_plot(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPlotsEdit>,
    Path(plot_id): Path<Uuid>,
    Json(payload): Json<UpdatePlotPayload>,
) -> Result<Json<Plot>, AppError> {
    Ok(Json(app_state.plot_service.update_plot(plot_id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/plots/{plot_id}",
    tag = "Plots",
    params(("plot_id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 204, description = "Lote excluído"),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_plot(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPlotsDelete>,
    Path(plot_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.plot_service.delete_plot(plot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/plots/{plot_id}/restore",
    tag = "Plots",
    params(("plot_id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Lote restaurado", body = Plot),
        (status = 404, description = "Lote não encontrado ou não excluído")
    ),
    security(("api_jwt" = []))
)]
pub async fn restore_plot(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPlotsEdit>,
    Path(plot_id): Path<Uuid>,
) -> Result<Json<Plot>, AppError> {
    Ok(Json(app_state.plot_service.restore_plot(plot_id).await?))
}

// POST /api/admin/plots/import (corpo: CSV com cabeçalho na primeira linha)
#[utoipa::path(
    post,
    path = "/api/admin/plots/import",
    tag = "Plots",
    request_body(content = String, content_type = "text/csv", description = "Planilha em CSV"),
    responses(
        (status = 200, description = "Relatório da importação", body = ImportReport),
        (status = 400, description = "CSV ilegível")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_plots(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPlotsImport>,
    body: Bytes,
) -> Result<Json<ImportReport>, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("O arquivo CSV está vazio.".into()));
    }
    let rows = rows_from_csv(&body)?;
    Ok(Json(app_state.import_service.import_rows(rows).await))
}

// POST /api/admin/plots/sync (sincronização sob demanda)
#[utoipa::path(
    post,
    path = "/api/admin/plots/sync",
    tag = "Plots",
    request_body(content = SyncSheetRequest, description = "Planilha e intervalo; vazio usa a configuração do servidor"),
    responses(
        (status = 200, description = "Relatório da sincronização", body = ImportReport),
        (status = 409, description = "Sincronização já em andamento"),
        (status = 502, description = "Planilha externa indisponível")
    ),
    security(("api_jwt" = []))
)]
pub async fn sync_plots(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPlotsImport>,
    payload: Option<Json<SyncSheetRequest>>,
) -> Result<Json<ImportReport>, AppError> {
    let (sheet, range) = match payload {
        Some(Json(request)) => {
            request.validate()?;
            let sheet = request.sheet.as_deref().map(SheetRef::parse).transpose()?;
            (sheet, request.range)
        }
        None => (None, None),
    };

    let report = app_state.sync_job.run_once(sheet, range.as_deref()).await?;
    Ok(Json(report))
}
