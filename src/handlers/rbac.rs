// src/handlers/rbac.rs

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{PermUsersManage, RequirePermission},
    },
    models::{
        auth::{PermissionPayload, SyncPermissionsPayload, UpdateUserRolePayload, User},
        rbac::PermissionEntry,
    },
};

// GET /api/admin/permissions (Para o frontend saber o que mostrar na tela de permissões)
#[utoipa::path(
    get,
    path = "/api/admin/permissions",
    tag = "Users",
    responses(
        (status = 200, description = "Catálogo de permissões", body = Vec<PermissionEntry>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_permissions(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUsersManage>,
) -> Json<Vec<PermissionEntry>> {
    Json(app_state.rbac_service.list_catalog())
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Users",
    responses(
        (status = 200, description = "Usuários cadastrados", body = Vec<User>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUsersManage>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(app_state.rbac_service.list_users().await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/role",
    tag = "Users",
    request_body = UpdateUserRolePayload,
    responses(
        (status = 200, description = "Papel atualizado", body = User),
        (status = 403, description = "Somente super-admins concedem super-admin"),
        (status = 404, description = "Usuário não encontrado")
    ),
    params(("user_id" = Uuid, Path, description = "ID do usuário")),
    security(("api_jwt" = []))
)]
pub async fn update_user_role(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequirePermission<PermUsersManage>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRolePayload>,
) -> Result<Json<User>, AppError> {
    let user = app_state
        .rbac_service
        .update_role(&actor, user_id, payload.role, payload.is_super_admin)
        .await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/permissions",
    tag = "Users",
    request_body = PermissionPayload,
    responses(
        (status = 200, description = "Permissão concedida", body = User),
        (status = 422, description = "Permissão fora do catálogo")
    ),
    params(("user_id" = Uuid, Path, description = "ID do usuário")),
    security(("api_jwt" = []))
)]
pub async fn grant_permission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUsersManage>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<PermissionPayload>,
) -> Result<Json<User>, AppError> {
    let user = app_state
        .rbac_service
        .grant_permission(user_id, &payload.permission)
        .await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}/permissions/{permission}",
    tag = "Users",
    responses(
        (status = 200, description = "Permissão revogada", body = User),
        (status = 422, description = "Permissão fora do catálogo")
    ),
    params(
        ("user_id" = Uuid, Path, description = "ID do usuário"),
        ("permission" = String, Path, description = "Slug da permissão, ex.: plots.edit")
    ),
    security(("api_jwt" = []))
)]
pub async fn revoke_permission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUsersManage>,
    Path((user_id, permission)): Path<(Uuid, String)>,
) -> Result<Json<User>, AppError> {
    let user = app_state
        .rbac_service
        .revoke_permission(user_id, &permission)
        .await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/permissions",
    tag = "Users",
    request_body = SyncPermissionsPayload,
    responses(
        (status = 200, description = "Conjunto de permissões substituído", body = User),
        (status = 422, description = "Alguma permissão está fora do catálogo")
    ),
    params(("user_id" = Uuid, Path, description = "ID do usuário")),
    security(("api_jwt" = []))
)]
pub async fn sync_permissions(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUsersManage>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SyncPermissionsPayload>,
) -> Result<Json<User>, AppError> {
    let user = app_state
        .rbac_service
        .sync_permissions(user_id, &payload.permissions)
        .await?;
    Ok(Json(user))
}
