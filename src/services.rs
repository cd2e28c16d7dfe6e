pub mod auth;
pub mod import_service;
pub mod lead_service;
pub mod media_service;
pub mod plot_service;
pub mod rbac_service;
pub mod settings_service;
pub mod sync_service;
pub mod ticket_service;
