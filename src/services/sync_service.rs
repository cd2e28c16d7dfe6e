// src/services/sync_service.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    common::error::AppError,
    models::import::ImportReport,
    services::import_service::{rows_from_grid, ImportService},
};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// Chave da trava consultiva; garante uma sincronização por cluster
const SYNC_LOCK_KEY: i64 = 0x706c_6f74_7379_6e63;
// Presa à transação, nunca à sessão da conexão do pool
const SYNC_LOCK_SQL: &str = "SELECT pg_try_advisory_xact_lock($1)";

/// Identificador da planilha. Aceita o ID puro ou a URL de edição.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef(String);

impl SheetRef {
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let input = input.trim();
        let id = match input.split_once("/spreadsheets/d/") {
            Some((_, rest)) => rest.split(['/', '?', '#']).next().unwrap_or_default(),
            None => input,
        };

        let valid = !id.is_empty()
            && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(AppError::invalid_field("sheet", "Planilha inválida."));
        }
        Ok(Self(id.to_string()))
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Fonte da grade de células. A primeira linha retornada é o cabeçalho.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch_grid(&self, sheet: &SheetRef, range: &str) -> Result<Vec<Vec<Value>>, AppError>;
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Leitura via API de valores do Google Sheets.
#[derive(Clone)]
pub struct GoogleSheetsSource {
    client: Client,
    api_key: Option<String>,
}

impl GoogleSheetsSource {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Falha ao criar o cliente HTTP: {}", e))?;
        Ok(Self { client, api_key })
    }

    fn values_url(sheet: &SheetRef, range: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(SHEETS_API_BASE).map_err(|e| anyhow::anyhow!(e))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("URL base da API inválida"))?
            .push(sheet.id())
            .push("values")
            .push(range);
        Ok(url)
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsSource {
    async fn fetch_grid(&self, sheet: &SheetRef, range: &str) -> Result<Vec<Vec<Value>>, AppError> {
        let url = Self::values_url(sheet, range)?;
        let mut request = self
            .client
            .get(url)
            .query(&[("valueRenderOption", "UNFORMATTED_VALUE")]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        tracing::debug!(sheet = sheet.id(), range, "buscando planilha");
        let response = request
            .send()
            .await
            .map_err(|e| AppError::SheetUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SheetUnavailable(format!("HTTP {}: {}", status, body)));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| AppError::SheetUnavailable(format!("resposta inválida: {}", e)))?;
        Ok(range.values)
    }
}

/// Sincronização periódica da planilha para a tabela de lotes.
#[derive(Clone)]
pub struct SyncJob {
    import: ImportService,
    source: Arc<dyn SheetSource>,
    default_sheet: Option<SheetRef>,
    default_range: String,
    running: Arc<Mutex<()>>,
    // Sem pool (testes), vale só a trava local
    lock_pool: Option<PgPool>,
}

impl SyncJob {
    pub fn new(
        import: ImportService,
        source: Arc<dyn SheetSource>,
        default_sheet: Option<SheetRef>,
        default_range: String,
    ) -> Self {
        Self {
            import,
            source,
            default_sheet,
            default_range,
            running: Arc::new(Mutex::new(())),
            lock_pool: None,
        }
    }

    pub fn with_lock_pool(mut self, pool: PgPool) -> Self {
        self.lock_pool = Some(pool);
        self
    }

    /// Uma execução completa. Sobreposição devolve `SyncInProgress`.
    pub async fn run_once(
        &self,
        sheet: Option<SheetRef>,
        range: Option<&str>,
    ) -> Result<ImportReport, AppError> {
        let sheet = sheet
            .or_else(|| self.default_sheet.clone())
            .ok_or_else(|| AppError::invalid_field("sheet", "Nenhuma planilha configurada."))?;
        let range = range.unwrap_or(&self.default_range);

        let _guard = self.running.try_lock().map_err(|_| AppError::SyncInProgress)?;

        match &self.lock_pool {
            Some(pool) => {
                // Trava de transação: commit, rollback ou drop do futuro a liberam
                let mut tx = pool.begin().await?;
                let acquired: bool = sqlx::query_scalar(SYNC_LOCK_SQL)
                    .bind(SYNC_LOCK_KEY)
                    .fetch_one(&mut *tx)
                    .await?;
                if !acquired {
                    return Err(AppError::SyncInProgress);
                }

                let result = self.sync(&sheet, range).await;

                if let Err(e) = tx.commit().await {
                    tracing::warn!("Falha ao encerrar a transação da trava de sincronização: {}", e);
                }
                result
            }
            None => self.sync(&sheet, range).await,
        }
    }

    async fn sync(&self, sheet: &SheetRef, range: &str) -> Result<ImportReport, AppError> {
        tracing::info!(sheet = sheet.id(), range, "sincronização iniciada");
        let grid = self.source.fetch_grid(sheet, range).await?;
        Ok(self.import.import_rows(rows_from_grid(grid)).await)
    }

    /// Agenda a execução periódica. O primeiro tick imediato é descartado.
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Sincronização de planilha agendada a cada {} segundos", every.as_secs());
            let mut interval = tokio::time::interval(every);
            interval.tick().await;

            loop {
                interval.tick().await;
                match self.run_once(None, None).await {
                    Ok(report) => tracing::info!(
                        added = report.added,
                        updated = report.updated,
                        failed = report.failed,
                        "sincronização agendada concluída"
                    ),
                    Err(AppError::SyncInProgress) => {
                        tracing::debug!("sincronização anterior ainda em andamento; tick ignorado")
                    }
                    Err(e) => tracing::warn!("sincronização agendada falhou: {}", e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::import_service::tests::MemoryPlotStore;
    use serde_json::json;
    use tokio::sync::Notify;

    struct FakeSource {
        grid: Vec<Vec<Value>>,
    }

    #[async_trait]
    impl SheetSource for FakeSource {
        async fn fetch_grid(&self, _: &SheetRef, _: &str) -> Result<Vec<Vec<Value>>, AppError> {
            Ok(self.grid.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl SheetSource for FailingSource {
        async fn fetch_grid(&self, _: &SheetRef, _: &str) -> Result<Vec<Vec<Value>>, AppError> {
            Err(AppError::SheetUnavailable("timeout".into()))
        }
    }

    // Segura a execução até o teste liberar
    struct BlockingSource {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl SheetSource for BlockingSource {
        async fn fetch_grid(&self, _: &SheetRef, _: &str) -> Result<Vec<Vec<Value>>, AppError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Vec::new())
        }
    }

    fn job(source: Arc<dyn SheetSource>) -> (SyncJob, Arc<MemoryPlotStore>) {
        let store = Arc::new(MemoryPlotStore::default());
        let job = SyncJob::new(
            ImportService::new(store.clone()),
            source,
            Some(SheetRef::parse("abc123").unwrap()),
            "Lotes!A1:Z".into(),
        );
        (job, store)
    }

    #[test]
    fn sheet_ref_accepts_id_or_url() {
        assert_eq!(SheetRef::parse("1AbC-d_9").unwrap().id(), "1AbC-d_9");
        let url = "https://docs.google.com/spreadsheets/d/1AbC-d_9/edit#gid=0";
        assert_eq!(SheetRef::parse(url).unwrap().id(), "1AbC-d_9");
        assert!(SheetRef::parse("").is_err());
        assert!(SheetRef::parse("não é id").is_err());
    }

    #[test]
    fn values_url_encodes_range() {
        let sheet = SheetRef::parse("abc").unwrap();
        let url = GoogleSheetsSource::values_url(&sheet, "Lotes 2026!A1:Z").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/Lotes%202026!A1:Z"
        );
    }

    #[tokio::test]
    async fn run_once_imports_the_grid() {
        let source = Arc::new(FakeSource {
            grid: vec![
                vec![json!("Plot Number"), json!("Area"), json!("Status")],
                vec![json!("A-1"), json!("25x50"), json!("Sold")],
                vec![json!("A-2"), json!(1250), json!("available")],
                vec![json!(""), json!(""), json!("")],
            ],
        });
        let (job, store) = job(source);

        let report = job.run_once(None, None).await.unwrap();
        assert_eq!((report.processed, report.added, report.skipped), (3, 2, 1));
        assert_eq!(store.plots.lock().await.len(), 2);

        let again = job.run_once(None, None).await.unwrap();
        assert_eq!((again.added, again.updated), (0, 2));
        assert_eq!(store.plots.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn source_failure_is_reported() {
        let (job, _) = job(Arc::new(FailingSource));
        let err = job.run_once(None, None).await.unwrap_err();
        assert!(matches!(err, AppError::SheetUnavailable(_)));
    }

    #[tokio::test]
    async fn missing_sheet_is_rejected() {
        let store = Arc::new(MemoryPlotStore::default());
        let job = SyncJob::new(
            ImportService::new(store),
            Arc::new(FakeSource { grid: Vec::new() }),
            None,
            "A1:Z".into(),
        );
        let err = job.run_once(None, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidField { .. }));
    }

    #[tokio::test]
    async fn overlapping_runs_are_refused() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let (job, _) = job(Arc::new(BlockingSource {
            entered: entered.clone(),
            release: release.clone(),
        }));

        let first = {
            let job = job.clone();
            tokio::spawn(async move { job.run_once(None, None).await })
        };
        entered.notified().await;

        let err = job.run_once(None, None).await.unwrap_err();
        assert!(matches!(err, AppError::SyncInProgress));

        release.notify_one();
        assert!(first.await.unwrap().is_ok());
    }

    #[test]
    fn cluster_lock_is_transaction_scoped() {
        assert!(SYNC_LOCK_SQL.contains("pg_try_advisory_xact_lock"));
        assert!(!SYNC_LOCK_SQL.contains("unlock"));
    }

    #[tokio::test]
    async fn cancelled_run_releases_the_guard() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let (job, _) = job(Arc::new(BlockingSource {
            entered: entered.clone(),
            release: release.clone(),
        }));

        let first = {
            let job = job.clone();
            tokio::spawn(async move { job.run_once(None, None).await })
        };
        entered.notified().await;
        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        let job_after = job.clone();
        let second = tokio::spawn(async move { job_after.run_once(None, None).await });
        entered.notified().await;
        release.notify_one();
        assert!(second.await.unwrap().is_ok());
    }
}
