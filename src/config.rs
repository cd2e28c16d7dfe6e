// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    db::{
        LeadRepository, MediaRepository, PlotRepository, SettingsRepository, TicketRepository,
        UserRepository,
    },
    services::{
        auth::AuthService,
        import_service::ImportService,
        lead_service::LeadService,
        media_service::{LocalDisk, MediaService},
        plot_service::PlotService,
        rbac_service::RbacService,
        settings_service::SettingsService,
        sync_service::{GoogleSheetsSource, SheetRef, SyncJob},
        ticket_service::TicketService,
    },
};

const DEFAULT_SHEET_RANGE: &str = "A1:Z";
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3600;
const DEFAULT_SHEET_TIMEOUT_SECS: u64 = 30;

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub media_root: PathBuf,
    // Sem planilha configurada, a sincronização agendada fica desligada
    pub sheet: Option<String>,
    pub sheet_range: String,
    pub sheet_api_key: Option<String>,
    pub sync_interval_secs: u64,
    pub sheet_timeout_secs: u64,
    pub cors_origin: Option<String>,
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var(key: &str, default: u64) -> anyhow::Result<u64> {
    match optional_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} deve ser um número inteiro (recebido '{}')", key, raw)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: optional_var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            media_root: optional_var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("storage/media")),
            sheet: optional_var("SHEET_ID"),
            sheet_range: optional_var("SHEET_RANGE").unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
            sheet_api_key: optional_var("SHEET_API_KEY"),
            sync_interval_secs: parsed_var("SHEET_SYNC_INTERVAL_SECS", DEFAULT_SYNC_INTERVAL_SECS)?,
            sheet_timeout_secs: parsed_var("SHEET_TIMEOUT_SECS", DEFAULT_SHEET_TIMEOUT_SECS)?,
            cors_origin: optional_var("CORS_ORIGIN"),
        })
    }

    /// Intervalo da sincronização agendada, se ela estiver ligada.
    pub fn sync_interval(&self) -> Option<Duration> {
        (self.sheet.is_some() && self.sync_interval_secs > 0)
            .then(|| Duration::from_secs(self.sync_interval_secs))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub auth_service: AuthService,
    pub rbac_service: RbacService,
    pub plot_service: PlotService,
    pub lead_service: LeadService,
    pub ticket_service: TicketService,
    pub media_service: MediaService,
    pub settings_service: SettingsService,
    pub import_service: ImportService,
    pub sync_job: SyncJob,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::from_pool(db_pool, config)
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_pool(db_pool: PgPool, config: Config) -> anyhow::Result<Self> {
        let user_repo = UserRepository::new(db_pool.clone());
        let plot_repo = PlotRepository::new(db_pool.clone());

        let import_service = ImportService::new(Arc::new(plot_repo.clone()));

        let default_sheet = config
            .sheet
            .as_deref()
            .map(SheetRef::parse)
            .transpose()
            .context("SHEET_ID inválido")?;
        let source = GoogleSheetsSource::new(config.sheet_api_key.clone(), config.sheet_timeout_secs)?;
        let sync_job = SyncJob::new(
            import_service.clone(),
            Arc::new(source),
            default_sheet,
            config.sheet_range.clone(),
        )
        .with_lock_pool(db_pool.clone());

        Ok(Self {
            auth_service: AuthService::new(user_repo.clone(), config.jwt_secret.clone()),
            rbac_service: RbacService::new(user_repo.clone()),
            plot_service: PlotService::new(plot_repo),
            lead_service: LeadService::new(LeadRepository::new(db_pool.clone()), user_repo),
            ticket_service: TicketService::new(TicketRepository::new(db_pool.clone())),
            media_service: MediaService::new(
                MediaRepository::new(db_pool.clone()),
                LocalDisk::new(config.media_root.clone()),
            ),
            settings_service: SettingsService::new(SettingsRepository::new(db_pool.clone())),
            import_service,
            sync_job,
            config: Arc::new(config),
            db_pool,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sheet: Option<&str>, interval: u64) -> Config {
        Config {
            database_url: "postgres://localhost/plotdesk_test".into(),
            jwt_secret: "segredo".into(),
            bind_addr: "127.0.0.1:0".into(),
            media_root: PathBuf::from("storage/media"),
            sheet: sheet.map(str::to_string),
            sheet_range: DEFAULT_SHEET_RANGE.into(),
            sheet_api_key: None,
            sync_interval_secs: interval,
            sheet_timeout_secs: DEFAULT_SHEET_TIMEOUT_SECS,
            cors_origin: None,
        }
    }

    #[test]
    fn sync_is_disabled_without_sheet_or_interval() {
        assert_eq!(config(None, 60).sync_interval(), None);
        assert_eq!(config(Some("abc"), 0).sync_interval(), None);
        assert_eq!(config(Some("abc"), 60).sync_interval(), Some(Duration::from_secs(60)));
    }
}
