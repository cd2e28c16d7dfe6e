// src/models/import.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::plot::PlotStatus;

/// Lote normalizado a partir de uma linha de planilha.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPlot {
    pub plot_number: String,
    pub sector: Option<String>,
    pub block: Option<String>,
    pub status: PlotStatus,
    pub area: Option<f64>,
    pub price: Option<Decimal>,
    pub features: Map<String, Value>,
}

/// Resultado do processamento de uma linha.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Created,
    Updated,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RowError {
    // Número da linha na planilha (o cabeçalho é a linha 1)
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImportReport {
    pub processed: usize,
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn record(&mut self, row: usize, outcome: ImportOutcome) {
        self.processed += 1;
        match outcome {
            ImportOutcome::Created => self.added += 1,
            ImportOutcome::Updated => self.updated += 1,
            ImportOutcome::Skipped(reason) => {
                tracing::debug!(row, %reason, "linha ignorada");
                self.skipped += 1;
            }
            ImportOutcome::Failed(message) => {
                self.failed += 1;
                self.errors.push(RowError { row, message });
            }
        }
    }
}

// Sincronização sob demanda a partir do painel
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SyncSheetRequest {
    /// ID da planilha ou URL completa. Se ausente, usa a configurada no servidor.
    pub sheet: Option<String>,

    /// Intervalo A1, ex.: "Lotes!A1:Z"
    #[validate(length(min = 1, message = "O intervalo não pode ser vazio."))]
    pub range: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_each_outcome() {
        let mut report = ImportReport::default();
        report.record(2, ImportOutcome::Created);
        report.record(3, ImportOutcome::Updated);
        report.record(4, ImportOutcome::Skipped("linha vazia".into()));
        report.record(5, ImportOutcome::Failed("preço inválido".into()));

        assert_eq!(report.processed, 4);
        assert_eq!((report.added, report.updated, report.skipped, report.failed), (1, 1, 1, 1));
        assert_eq!(
            report.errors,
            vec![RowError { row: 5, message: "preço inválido".into() }]
        );
    }
}
