// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::{auth::User, rbac::Permission},
    services::rbac_service::has_permission,
};

/// 1. O Trait que liga um tipo marcador a uma permissão do catálogo
pub trait PermissionDef: Send + Sync + 'static {
    const PERMISSION: Permission;
}

/// 2. O Extractor (Guardião). Roda depois do `admin_guard`, que já
/// carregou o usuário nos extensions.
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<User>().ok_or(AppError::InvalidToken)?;

        if !has_permission(user, T::PERMISSION) {
            tracing::warn!(user_id = %user.id, permission = %T::PERMISSION, "permissão ausente");
            return Err(AppError::Forbidden(format!(
                "Você precisa da permissão '{}' para realizar esta ação.",
                T::PERMISSION
            )));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

macro_rules! permission_markers {
    ($($name:ident => $permission:ident),* $(,)?) => {
        $(
            pub struct $name;
            impl PermissionDef for $name {
                const PERMISSION: Permission = Permission::$permission;
            }
        )*
    };
}

permission_markers! {
    PermPlotsView => PlotsView,
    PermPlotsCreate => PlotsCreate,
    PermPlotsEdit => PlotsEdit,
    PermPlotsDelete => PlotsDelete,
    PermPlotsImport => PlotsImport,
    PermLeadsView => LeadsView,
    PermLeadsEdit => LeadsEdit,
    PermLeadsDelete => LeadsDelete,
    PermTicketsView => TicketsView,
    PermTicketsManage => TicketsManage,
    PermMediaUpload => MediaUpload,
    PermMediaDelete => MediaDelete,
    PermSettingsManage => SettingsManage,
    PermUsersManage => UsersManage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::UserRole;
    use axum::http::Request;
    use chrono::Utc;
    use uuid::Uuid;

    fn admin(permissions: &[&str]) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Admin".into(),
            email: "admin@exemplo.com".into(),
            password_hash: String::new(),
            role: UserRole::Admin,
            is_super_admin: false,
            permissions: permissions.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn check<T: PermissionDef>(user: Option<User>) -> Result<(), AppError> {
        let (mut parts, _) = Request::new(()).into_parts();
        if let Some(user) = user {
            parts.extensions.insert(user);
        }
        RequirePermission::<T>::from_request_parts(&mut parts, &()).await.map(|_| ())
    }

    #[tokio::test]
    async fn missing_permission_is_forbidden() {
        let err = check::<PermPlotsDelete>(Some(admin(&["plots.view"]))).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn granted_permission_passes() {
        assert!(check::<PermPlotsView>(Some(admin(&["plots.view"]))).await.is_ok());
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let err = check::<PermPlotsView>(None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }
}
