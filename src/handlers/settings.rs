// src/handlers/settings.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Value};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermSettingsManage, RequirePermission},
    models::settings::{Setting, UpsertSettingRequest},
};

// GET /api/public/settings
#[utoipa::path(
    get,
    path = "/api/public/settings",
    tag = "Settings",
    responses(
        (status = 200, description = "Configurações públicas, já tipadas", body = Object)
    )
)]
pub async fn public_settings(
    State(app_state): State<AppState>,
) -> Result<Json<Map<String, Value>>, AppError> {
    Ok(Json(app_state.settings_service.public_settings().await?))
}

// GET /api/admin/settings
#[utoipa::path(
    get,
    path = "/api/admin/settings",
    tag = "Settings",
    responses((status = 200, description = "Todas as configurações", body = Vec<Setting>)),
    security(("api_jwt" = []))
)]
pub async fn list_settings(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSettingsManage>,
) -> Result<Json<Vec<Setting>>, AppError> {
    Ok(Json(app_state.settings_service.list_settings().await?))
}

// PUT /api/admin/settings
#[utoipa::path(
    put,
    path = "/api/admin/settings",
    tag = "Settings",
    request_body = UpsertSettingRequest,
    responses(
        (status = 200, description = "Configuração gravada", body = Setting),
        (status = 422, description = "Valor incompatível com o tipo declarado")
    ),
    security(("api_jwt" = []))
)]
pub async fn upsert_setting(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSettingsManage>,
    Json(payload): Json<UpsertSettingRequest>,
) -> Result<Json<Setting>, AppError> {
    Ok(Json(app_state.settings_service.upsert_setting(payload).await?))
}

// DELETE /api/admin/settings/{key}
#[utoipa::path(
    delete,
    path = "/api/admin/settings/{key}",
    tag = "Settings",
    params(("key" = String, Path, description = "Chave da configuração")),
    responses(
        (status = 204, description = "Configuração removida"),
        (status = 404, description = "Configuração não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_setting(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSettingsManage>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    app_state.settings_service.delete_setting(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}
