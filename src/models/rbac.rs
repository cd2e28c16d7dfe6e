// src/models/rbac.rs

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

/// Catálogo fixo de permissões. Nada fora desta lista pode ser gravado
/// no conjunto de permissões de um usuário.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "plots.view")]
    PlotsView,
    #[serde(rename = "plots.create")]
    PlotsCreate,
    #[serde(rename = "plots.edit")]
    PlotsEdit,
    #[serde(rename = "plots.delete")]
    PlotsDelete,
    #[serde(rename = "plots.import")]
    PlotsImport,
    #[serde(rename = "leads.view")]
    LeadsView,
    #[serde(rename = "leads.edit")]
    LeadsEdit,
    #[serde(rename = "leads.delete")]
    LeadsDelete,
    #[serde(rename = "tickets.view")]
    TicketsView,
    #[serde(rename = "tickets.manage")]
    TicketsManage,
    #[serde(rename = "media.upload")]
    MediaUpload,
    #[serde(rename = "media.delete")]
    MediaDelete,
    #[serde(rename = "settings.manage")]
    SettingsManage,
    #[serde(rename = "users.manage")]
    UsersManage,
}

impl Permission {
    pub const ALL: [Permission; 14] = [
        Permission::PlotsView,
        Permission::PlotsCreate,
        Permission::PlotsEdit,
        Permission::PlotsDelete,
        Permission::PlotsImport,
        Permission::LeadsView,
        Permission::LeadsEdit,
        Permission::LeadsDelete,
        Permission::TicketsView,
        Permission::TicketsManage,
        Permission::MediaUpload,
        Permission::MediaDelete,
        Permission::SettingsManage,
        Permission::UsersManage,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Permission::PlotsView => "plots.view",
            Permission::PlotsCreate => "plots.create",
            Permission::PlotsEdit => "plots.edit",
            Permission::PlotsDelete => "plots.delete",
            Permission::PlotsImport => "plots.import",
            Permission::LeadsView => "leads.view",
            Permission::LeadsEdit => "leads.edit",
            Permission::LeadsDelete => "leads.delete",
            Permission::TicketsView => "tickets.view",
            Permission::TicketsManage => "tickets.manage",
            Permission::MediaUpload => "media.upload",
            Permission::MediaDelete => "media.delete",
            Permission::SettingsManage => "settings.manage",
            Permission::UsersManage => "users.manage",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Permission::PlotsView => "Visualizar lotes (inclusive excluídos)",
            Permission::PlotsCreate => "Cadastrar lotes",
            Permission::PlotsEdit => "Editar e restaurar lotes",
            Permission::PlotsDelete => "Excluir lotes",
            Permission::PlotsImport => "Importar e sincronizar planilhas de lotes",
            Permission::LeadsView => "Visualizar leads e histórico",
            Permission::LeadsEdit => "Atualizar leads, atribuir e anotar",
            Permission::LeadsDelete => "Excluir leads",
            Permission::TicketsView => "Visualizar todos os chamados",
            Permission::TicketsManage => "Responder e alterar chamados",
            Permission::MediaUpload => "Enviar arquivos",
            Permission::MediaDelete => "Excluir arquivos",
            Permission::SettingsManage => "Gerenciar configurações",
            Permission::UsersManage => "Gerenciar usuários e permissões",
        }
    }

    pub fn module(self) -> &'static str {
        match self.slug().split_once('.') {
            Some((module, _)) => module,
            None => self.slug(),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.slug() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

// Entrada do catálogo, para o frontend montar a tela de permissões
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    #[schema(example = "plots.edit")]
    pub slug: &'static str,

    #[schema(example = "Editar e restaurar lotes")]
    pub description: &'static str,

    #[schema(example = "plots")]
    pub module: &'static str,
}

impl From<Permission> for PermissionEntry {
    fn from(p: Permission) -> Self {
        Self {
            slug: p.slug(),
            description: p.description(),
            module: p.module(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_slug_parses_back_to_itself() {
        for p in Permission::ALL {
            assert_eq!(p.slug().parse::<Permission>(), Ok(p));
        }
    }

    #[test]
    fn unknown_slug_is_rejected() {
        assert_eq!(
            "plots.teleport".parse::<Permission>(),
            Err(UnknownPermission("plots.teleport".into()))
        );
    }

    #[test]
    fn serde_uses_slug_form() {
        let json = serde_json::to_string(&Permission::LeadsEdit).unwrap();
        assert_eq!(json, "\"leads.edit\"");
    }
}
