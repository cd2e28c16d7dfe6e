pub mod auth;
pub mod import;
pub mod lead;
pub mod media;
pub mod plot;
pub mod rbac;
pub mod settings;
pub mod ticket;
