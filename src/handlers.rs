pub mod auth;
pub mod leads;
pub mod media;
pub mod plots;
pub mod rbac;
pub mod settings;
pub mod tickets;
