// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{common::error::AppError, config::AppState, models::auth::User};

async fn authenticate(
    app_state: &AppState,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<User, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::InvalidToken)?;
    app_state.auth_service.validate_token(bearer.token()).await
}

// Exige um token válido e injeta o usuário nos "extensions" da requisição
pub async fn auth_guard(
    State(app_state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&app_state, bearer).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// Papel admin, ou super-admin
fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() || user.is_super_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("Área restrita a administradores.".into()))
    }
}

// Igual ao auth_guard, mas só deixa passar usuários com papel admin
pub async fn admin_guard(
    State(app_state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&app_state, bearer).await?;
    if let Err(e) = require_admin(&user) {
        tracing::warn!(user_id = %user.id, path = %request.uri().path(), "acesso admin negado");
        return Err(e);
    }
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::UserRole;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(role: UserRole, is_super_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Rafael".into(),
            email: "rafael@exemplo.com".into(),
            password_hash: String::new(),
            role,
            is_super_admin,
            permissions: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn plain_user_is_forbidden_on_admin_routes() {
        let err = require_admin(&user(UserRole::User, false)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn admins_and_super_admins_pass() {
        assert!(require_admin(&user(UserRole::Admin, false)).is_ok());
        assert!(require_admin(&user(UserRole::Admin, true)).is_ok());
        assert!(require_admin(&user(UserRole::User, true)).is_ok());
    }
}
