// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::rbac::list_permissions,
        handlers::rbac::list_users,
        handlers::rbac::update_user_role,
        handlers::rbac::grant_permission,
        handlers::rbac::revoke_permission,
        handlers::rbac::sync_permissions,

        // --- Plots ---
        handlers::plots::list_public_plots,
        handlers::plots::get_public_plot,
        handlers::plots::list_plots,
        handlers::plots::get_plot,
        handlers::plots::create_plot,
        handlers::plots::update_plot,
        handlers::plots::delete_plot,
        handlers::plots::restore_plot,
        handlers::plots::import_plots,
        handlers::plots::sync_plots,

        // --- Leads ---
        handlers::leads::submit_lead,
        handlers::leads::list_leads,
        handlers::leads::get_lead,
        handlers::leads::update_lead,
        handlers::leads::add_note,
        handlers::leads::delete_lead,

        // --- Tickets ---
        handlers::tickets::create_ticket,
        handlers::tickets::list_my_tickets,
        handlers::tickets::get_my_ticket,
        handlers::tickets::reply_my_ticket,
        handlers::tickets::list_tickets,
        handlers::tickets::get_ticket,
        handlers::tickets::update_ticket,
        handlers::tickets::reply_ticket,

        // --- Media ---
        handlers::media::upload_media,
        handlers::media::list_media,
        handlers::media::delete_media,

        // --- Settings ---
        handlers::settings::public_settings,
        handlers::settings::list_settings,
        handlers::settings::upsert_setting,
        handlers::settings::delete_setting,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::UpdateUserRolePayload,
            models::auth::PermissionPayload,
            models::auth::SyncPermissionsPayload,

            // --- RBAC ---
            models::rbac::Permission,
            models::rbac::PermissionEntry,

            // --- Plots ---
            models::plot::PlotStatus,
            models::plot::Point,
            models::plot::Plot,
            models::plot::CreatePlotPayload,
            models::plot::UpdatePlotPayload,

            // --- Import ---
            models::import::RowError,
            models::import::ImportReport,
            models::import::SyncSheetRequest,

            // --- Leads ---
            models::lead::LeadStatus,
            models::lead::Lead,
            models::lead::LeadHistory,
            models::lead::LeadDetail,
            models::lead::CreateLeadPayload,
            models::lead::UpdateLeadPayload,
            models::lead::LeadNotePayload,

            // --- Tickets ---
            models::ticket::TicketStatus,
            models::ticket::TicketPriority,
            models::ticket::Ticket,
            models::ticket::TicketReply,
            models::ticket::TicketDetail,
            models::ticket::CreateTicketPayload,
            models::ticket::ReplyTicketPayload,
            models::ticket::UpdateTicketPayload,

            // --- Media ---
            models::media::Media,

            // --- Settings ---
            models::settings::SettingType,
            models::settings::Setting,
            models::settings::UpsertSettingRequest,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Usuários, Papéis e Permissões"),
        (name = "Plots", description = "Lotes, Importação e Sincronização de Planilha"),
        (name = "Leads", description = "Interessados, Pontuação e Histórico"),
        (name = "Tickets", description = "Chamados de Suporte"),
        (name = "Media", description = "Arquivos Enviados"),
        (name = "Settings", description = "Configurações do Site")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_admin_and_public_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/admin/plots/import"));
        assert!(doc.paths.paths.contains_key("/api/public/leads"));
        assert!(doc.paths.paths.contains_key("/api/admin/users/{user_id}/permissions"));
    }
}
