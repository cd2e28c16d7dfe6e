pub mod lead_repo;
pub use lead_repo::LeadRepository;
pub mod media_repo;
pub use media_repo::MediaRepository;
pub mod plot_repo;
pub use plot_repo::PlotRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod ticket_repo;
pub use ticket_repo::TicketRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
