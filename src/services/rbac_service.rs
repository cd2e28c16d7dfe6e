// src/services/rbac_service.rs

use std::collections::BTreeSet;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::{
        auth::{User, UserRole},
        rbac::{Permission, PermissionEntry},
    },
};

/// Avaliador de permissões. Super-admin passa sempre; os demais dependem
/// do conjunto explícito gravado no usuário.
pub fn has_permission(user: &User, permission: Permission) -> bool {
    if user.is_super_admin {
        return true;
    }
    user.permissions.iter().any(|slug| slug == permission.slug())
}

/// Valida slugs contra o catálogo. O primeiro desconhecido vira erro.
pub fn parse_permissions<S: AsRef<str>>(slugs: &[S]) -> Result<BTreeSet<Permission>, AppError> {
    slugs
        .iter()
        .map(|s| {
            s.as_ref()
                .trim()
                .parse::<Permission>()
                .map_err(|e| AppError::UnknownPermission(e.0))
        })
        .collect()
}

/// Normaliza o conjunto gravado: ordena, remove duplicatas e descarta
/// slugs antigos que saíram do catálogo.
fn normalized(current: &[String]) -> BTreeSet<Permission> {
    current.iter().filter_map(|s| s.parse().ok()).collect()
}

fn to_slugs(set: &BTreeSet<Permission>) -> Vec<String> {
    set.iter().map(|p| p.slug().to_string()).collect()
}

pub fn with_permission(current: &[String], permission: Permission) -> Vec<String> {
    let mut set = normalized(current);
    set.insert(permission);
    to_slugs(&set)
}

pub fn without_permission(current: &[String], permission: Permission) -> Vec<String> {
    let mut set = normalized(current);
    set.remove(&permission);
    to_slugs(&set)
}

#[derive(Clone)]
pub struct RbacService {
    user_repo: UserRepository,
}

impl RbacService {
    pub fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    pub fn list_catalog(&self) -> Vec<PermissionEntry> {
        Permission::ALL.into_iter().map(PermissionEntry::from).collect()
    }

    async fn load(&self, user_id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("Usuário"))
    }

    async fn store(&self, user_id: Uuid, slugs: &[String]) -> Result<User, AppError> {
        self.user_repo
            .set_permissions(self.user_repo.pool(), user_id, slugs)
            .await?
            .ok_or(AppError::NotFound("Usuário"))
    }

    // Leitura e escrita na mesma transação, com a linha travada
    async fn modify(
        &self,
        user_id: Uuid,
        change: impl FnOnce(&[String]) -> Vec<String>,
    ) -> Result<User, AppError> {
        let mut tx = self.user_repo.pool().begin().await?;
        let user = self
            .user_repo
            .find_for_update(&mut *tx, user_id)
            .await?
            .ok_or(AppError::NotFound("Usuário"))?;
        let updated = self
            .user_repo
            .set_permissions(&mut *tx, user_id, &change(&user.permissions))
            .await?
            .ok_or(AppError::NotFound("Usuário"))?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn grant_permission(&self, user_id: Uuid, slug: &str) -> Result<User, AppError> {
        let permission = slug
            .trim()
            .parse::<Permission>()
            .map_err(|e| AppError::UnknownPermission(e.0))?;

        let user = self
            .modify(user_id, |current| with_permission(current, permission))
            .await?;
        tracing::info!(%user_id, permission = %permission, "permissão concedida");
        Ok(user)
    }

    pub async fn revoke_permission(&self, user_id: Uuid, slug: &str) -> Result<User, AppError> {
        let permission = slug
            .trim()
            .parse::<Permission>()
            .map_err(|e| AppError::UnknownPermission(e.0))?;

        let user = self
            .modify(user_id, |current| without_permission(current, permission))
            .await?;
        tracing::info!(%user_id, permission = %permission, "permissão revogada");
        Ok(user)
    }

    /// Substitui o conjunto inteiro. Nada é gravado se algum slug for desconhecido.
    pub async fn sync_permissions(&self, user_id: Uuid, slugs: &[String]) -> Result<User, AppError> {
        let set = parse_permissions(slugs)?;
        self.load(user_id).await?;
        self.store(user_id, &to_slugs(&set)).await
    }

    pub async fn update_role(
        &self,
        actor: &User,
        user_id: Uuid,
        role: UserRole,
        is_super_admin: bool,
    ) -> Result<User, AppError> {
        // Só um super-admin cria outro super-admin
        if is_super_admin && !actor.is_super_admin {
            return Err(AppError::Forbidden(
                "Apenas super-admins podem conceder o papel de super-admin.".into(),
            ));
        }
        if is_super_admin && role != UserRole::Admin {
            return Err(AppError::invalid_field(
                "role",
                "Super-admins precisam ter o papel 'admin'.",
            ));
        }

        self.user_repo
            .update_role(self.user_repo.pool(), user_id, role, is_super_admin)
            .await?
            .ok_or(AppError::NotFound("Usuário"))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.user_repo.list_users().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(is_super_admin: bool, permissions: &[&str]) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Teste".into(),
            email: "teste@exemplo.com".into(),
            password_hash: String::new(),
            role: UserRole::Admin,
            is_super_admin,
            permissions: permissions.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_without_permission_is_denied() {
        let u = user(false, &["plots.view"]);
        assert!(!has_permission(&u, Permission::PlotsEdit));
        assert!(has_permission(&u, Permission::PlotsView));
    }

    #[test]
    fn granting_flips_the_result_and_revoking_flips_it_back() {
        let mut u = user(false, &[]);
        assert!(!has_permission(&u, Permission::LeadsEdit));

        u.permissions = with_permission(&u.permissions, Permission::LeadsEdit);
        assert!(has_permission(&u, Permission::LeadsEdit));

        u.permissions = without_permission(&u.permissions, Permission::LeadsEdit);
        assert!(!has_permission(&u, Permission::LeadsEdit));
    }

    #[test]
    fn super_admin_bypasses_every_check() {
        let u = user(true, &[]);
        for p in Permission::ALL {
            assert!(has_permission(&u, p));
        }
    }

    #[test]
    fn grant_is_idempotent_and_sorted() {
        let once = with_permission(&["plots.view".to_string()], Permission::LeadsView);
        let twice = with_permission(&once, Permission::LeadsView);
        assert_eq!(once, twice);
        assert_eq!(once, vec!["plots.view".to_string(), "leads.view".to_string()]);
    }

    #[test]
    fn sync_rejects_unknown_slugs() {
        let err = parse_permissions(&["plots.view", "plots.fly"]).unwrap_err();
        assert!(matches!(err, AppError::UnknownPermission(s) if s == "plots.fly"));
    }

    #[test]
    fn sync_dedups() {
        let set = parse_permissions(&["plots.view", " plots.view ", "media.upload"]).unwrap();
        assert_eq!(set.len(), 2);
    }
}
