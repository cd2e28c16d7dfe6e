// src/handlers/media.rs

use axum::{
    extract::{Multipart, Path, State},
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
        rbac::{PermMediaDelete, PermMediaUpload, RequirePermission},
    },
    models::media::Media,
};

// Limite aplicado na rota de upload
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[utoipa::path(
    post,
    path = "/api/admin/media",
    tag = "Media",
    request_body(content = String, content_type = "multipart/form-data", description = "Campo 'file'"),
    responses(
        (status = 201, description = "Arquivo armazenado", body = Media),
        (status = 422, description = "Campo 'file' ausente ou vazio")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_media(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequirePermission<PermMediaUpload>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("arquivo").to_string();
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let media = app_state
            .media_service
            .upload(&user, &original_name, mime_type.as_deref(), &bytes)
            .await?;
        return Ok((StatusCode::CREATED, Json(media)));
    }

    Err(AppError::invalid_field("file", "Envie o arquivo no campo 'file'."))
}

#[utoipa::path(
    get,
    path = "/api/admin/media",
    tag = "Media",
    responses((status = 200, description = "Arquivos enviados", body = Vec<Media>)),
    security(("api_jwt" = []))
)]
pub async fn list_media(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMediaUpload>,
) -> Result<Json<Vec<Media>>, AppError> {
    Ok(Json(app_state.media_service.list_media().await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/media/{media_id}",
    tag = "Media",
    params(("media_id" = Uuid, Path, description = "ID da mídia")),
    responses(
        (status = 204, description = "Arquivo e registro removidos"),
        (status = 404, description = "Mídia não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_media(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMediaDelete>,
    Path(media_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.media_service.delete_media(media_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
