// src/services/import_service.rs

use std::{collections::HashMap, str::FromStr, sync::Arc};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::{
    common::error::AppError,
    models::{
        import::{CanonicalPlot, ImportOutcome, ImportReport},
        plot::PlotStatus,
    },
};

// ---
// Cabeçalhos aceitos, em ordem de prioridade
// ---
const PLOT_NUMBER_HEADERS: &[&str] = &["plot number", "plot no", "plot_number", "plot name", "name"];
const SECTOR_HEADERS: &[&str] = &["sector", "phase"];
const BLOCK_HEADERS: &[&str] = &["block"];
const AREA_HEADERS: &[&str] = &["area", "size", "dimensions"];
const PRICE_HEADERS: &[&str] = &["price", "amount", "rate"];
const STATUS_HEADERS: &[&str] = &["status"];
const TYPE_HEADERS: &[&str] = &["type", "plot type", "property type"];
const CATEGORY_HEADERS: &[&str] = &["category", "plot category", "class"];

// Uma linha de cabeçalho perdida no meio do arquivo repete estes nomes
const HEADER_SENTINELS: &[&str] = &["name", "plot name", "plot number", "plot no", "plot_number"];

/// Linha de planilha com células de tipo solto, indexadas pelo cabeçalho
/// normalizado (minúsculas, sem espaços nas pontas).
#[derive(Debug, Clone, Default)]
pub struct SheetRow {
    cells: Vec<(String, Value)>,
}

pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

impl SheetRow {
    pub fn new(headers: &[String], values: Vec<Value>) -> Self {
        let cells = headers
            .iter()
            .map(|h| normalize_header(h))
            .zip(values)
            .collect();
        Self { cells }
    }

    fn get(&self, header: &str) -> Option<&Value> {
        self.cells.iter().find(|(h, _)| h == header).map(|(_, v)| v)
    }

    /// Texto da célula; números viram texto, vazio vira None.
    pub fn text(&self, header: &str) -> Option<String> {
        self.get(header).and_then(cell_text)
    }

    /// Primeiro cabeçalho alternativo com valor não vazio.
    pub fn first_text(&self, headers: &[&str]) -> Option<String> {
        headers.iter().find_map(|h| self.text(h))
    }

    pub fn first_cell(&self, headers: &[&str]) -> Option<&Value> {
        headers
            .iter()
            .filter_map(|h| self.get(h))
            .find(|v| cell_text(v).is_some())
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| cell_text(v).is_none())
    }
}

fn cell_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

// =========================================================================
//  PARSERS DE CÉLULA
// =========================================================================

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// "1250", "25x50", "25 * 50", "25×50". Qualquer outra coisa é área desconhecida.
pub fn parse_area_str(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(value) = parse_number(raw) {
        return Some(value);
    }

    let mut parts = raw.split(['x', 'X', '*', '×']);
    let (length, width) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    Some(parse_number(length)? * parse_number(width)?)
}

pub fn parse_area(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite() && *v >= 0.0),
        Value::String(s) => parse_area_str(s),
        _ => None,
    }
}

/// Aceita separador de milhar e símbolo de moeda: "R$ 185,000", "$1,250.50".
pub fn parse_price(cell: &Value) -> Result<Option<Decimal>, String> {
    let price = match cell {
        Value::Null => return Ok(None),
        // Números chegam sem formatação; 1e21 não pode passar pelo filtro de texto
        Value::Number(n) => match n.as_i64() {
            Some(i) => Decimal::from(i),
            None => n
                .as_f64()
                .and_then(|f| Decimal::try_from(f).ok())
                .ok_or_else(|| format!("preço inválido: {}", n))?,
        },
        Value::String(s) => {
            let raw = s.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            let cleaned: String = raw
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            Decimal::from_str(&cleaned).map_err(|_| format!("preço inválido: '{}'", raw))?
        }
        other => return Err(format!("preço inválido: {}", other)),
    };
    if price.is_sign_negative() {
        return Err(format!("preço negativo: {}", cell));
    }
    Ok(Some(price.round_dp(2)))
}

/// Tabela fixa, sem diferenciar maiúsculas. Desconhecido vira "available".
pub fn map_status(raw: &str) -> PlotStatus {
    match raw.trim().to_lowercase().as_str() {
        "available" | "active" => PlotStatus::Available,
        "reserved" => PlotStatus::Reserved,
        "hold" => PlotStatus::Hold,
        "sold" => PlotStatus::Sold,
        _ => PlotStatus::Available,
    }
}

// =========================================================================
//  NORMALIZAÇÃO DA LINHA
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RowDecision {
    Plot(CanonicalPlot),
    Skip(String),
}

fn is_known_header(header: &str) -> bool {
    [
        PLOT_NUMBER_HEADERS,
        SECTOR_HEADERS,
        BLOCK_HEADERS,
        AREA_HEADERS,
        PRICE_HEADERS,
        STATUS_HEADERS,
        TYPE_HEADERS,
        CATEGORY_HEADERS,
    ]
    .iter()
    .any(|group| group.contains(&header))
}

/// Converte uma linha em lote canônico, ou decide ignorá-la.
/// `Err` indica linha com dado inválido (vira erro no relatório).
pub fn normalize_row(row: &SheetRow) -> Result<RowDecision, String> {
    if row.is_blank() {
        return Ok(RowDecision::Skip("linha vazia".into()));
    }

    let Some(plot_number) = row.first_text(PLOT_NUMBER_HEADERS) else {
        return Ok(RowDecision::Skip("número do lote ausente".into()));
    };
    if HEADER_SENTINELS.contains(&plot_number.to_lowercase().as_str()) {
        return Ok(RowDecision::Skip("linha de cabeçalho repetida".into()));
    }

    let area = row.first_cell(AREA_HEADERS).and_then(parse_area);
    let price = match row.first_cell(PRICE_HEADERS) {
        Some(cell) => parse_price(cell)?,
        None => None,
    };
    let status = row
        .first_text(STATUS_HEADERS)
        .map(|s| map_status(&s))
        .unwrap_or(PlotStatus::Available);

    let mut features = Map::new();
    if let Some(kind) = row.first_text(TYPE_HEADERS) {
        features.insert("type".into(), Value::String(kind));
    }
    if let Some(category) = row.first_text(CATEGORY_HEADERS) {
        features.insert("category".into(), Value::String(category));
    }
    if area.is_none() {
        // Guarda o texto original para o admin corrigir depois
        if let Some(raw) = row.first_text(AREA_HEADERS) {
            features.insert("area_raw".into(), Value::String(raw));
        }
    }
    for (header, value) in &row.cells {
        if header.is_empty() || is_known_header(header) {
            continue;
        }
        if cell_text(value).is_some() {
            features.insert(header.clone(), value.clone());
        }
    }

    Ok(RowDecision::Plot(CanonicalPlot {
        plot_number,
        sector: row.first_text(SECTOR_HEADERS),
        block: row.first_text(BLOCK_HEADERS),
        status,
        area,
        price,
        features,
    }))
}

// =========================================================================
//  ENTRADAS: grade da planilha externa e CSV enviado
// =========================================================================

/// A primeira linha é o cabeçalho; as demais viram `SheetRow` com o número
/// da linha original (o cabeçalho é a linha 1).
pub fn rows_from_grid(grid: Vec<Vec<Value>>) -> Vec<(usize, SheetRow)> {
    let mut lines = grid.into_iter();
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header_line
        .iter()
        .map(|v| cell_text(v).unwrap_or_default())
        .collect();

    lines
        .enumerate()
        .map(|(i, values)| (i + 2, SheetRow::new(&headers, values)))
        .collect()
}

pub fn rows_from_csv(bytes: &[u8]) -> Result<Vec<(usize, SheetRow)>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::BadRequest(format!("CSV inválido: {}", e)))?;
        grid.push(
            record
                .iter()
                .map(|field| Value::String(field.to_string()))
                .collect(),
        );
    }
    Ok(rows_from_grid(grid))
}

// =========================================================================
//  SERVIÇO
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Inserted,
    Updated,
}

/// Destino dos lotes importados. Em produção é o `PlotRepository`.
#[async_trait]
pub trait PlotStore: Send + Sync {
    async fn upsert_plot(&self, plot: &CanonicalPlot) -> Result<UpsertKind, AppError>;
}

#[derive(Clone)]
pub struct ImportService {
    store: Arc<dyn PlotStore>,
}

impl ImportService {
    pub fn new(store: Arc<dyn PlotStore>) -> Self {
        Self { store }
    }

    pub async fn process_row(&self, row: &SheetRow) -> ImportOutcome {
        let plot = match normalize_row(row) {
            Ok(RowDecision::Plot(plot)) => plot,
            Ok(RowDecision::Skip(reason)) => return ImportOutcome::Skipped(reason),
            Err(message) => return ImportOutcome::Failed(message),
        };

        match self.store.upsert_plot(&plot).await {
            Ok(UpsertKind::Inserted) => ImportOutcome::Created,
            Ok(UpsertKind::Updated) => ImportOutcome::Updated,
            Err(e) => {
                tracing::warn!(plot_number = %plot.plot_number, "falha ao gravar lote importado: {}", e);
                ImportOutcome::Failed(format!("lote '{}': {}", plot.plot_number, e))
            }
        }
    }

    /// Processa todas as linhas; falha em uma linha não interrompe o lote.
    pub async fn import_rows(&self, rows: Vec<(usize, SheetRow)>) -> ImportReport {
        let mut report = ImportReport::default();
        // Lote repetido na mesma planilha: a última linha prevalece, só registramos em log
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (line, row) in rows {
            let outcome = self.process_row(&row).await;
            if let (ImportOutcome::Created | ImportOutcome::Updated, Some(number)) =
                (&outcome, row.first_text(PLOT_NUMBER_HEADERS))
            {
                if let Some(first) = seen.insert(number.clone(), line) {
                    tracing::debug!(plot_number = %number, first, line, "lote repetido na planilha");
                }
            }
            report.record(line, outcome);
        }

        tracing::info!(
            processed = report.processed,
            added = report.added,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "importação concluída"
        );
        report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Mutex;

    /// Armazenamento em memória com a mesma semântica de UPSERT do banco.
    #[derive(Default)]
    pub(crate) struct MemoryPlotStore {
        pub(crate) plots: Mutex<Vec<CanonicalPlot>>,
    }

    #[async_trait]
    impl PlotStore for MemoryPlotStore {
        async fn upsert_plot(&self, plot: &CanonicalPlot) -> Result<UpsertKind, AppError> {
            let mut plots = self.plots.lock().await;
            match plots.iter_mut().find(|p| p.plot_number == plot.plot_number) {
                Some(existing) => {
                    existing.sector = plot.sector.clone().or(existing.sector.take());
                    existing.block = plot.block.clone().or(existing.block.take());
                    existing.status = plot.status;
                    existing.area = plot.area.or(existing.area);
                    existing.price = plot.price.or(existing.price);
                    existing.features.extend(plot.features.clone());
                    Ok(UpsertKind::Updated)
                }
                None => {
                    plots.push(plot.clone());
                    Ok(UpsertKind::Inserted)
                }
            }
        }
    }

    fn row(pairs: &[(&str, Value)]) -> SheetRow {
        let headers: Vec<String> = pairs.iter().map(|(h, _)| h.to_string()).collect();
        SheetRow::new(&headers, pairs.iter().map(|(_, v)| v.clone()).collect())
    }

    fn plot_of(decision: RowDecision) -> CanonicalPlot {
        match decision {
            RowDecision::Plot(p) => p,
            RowDecision::Skip(reason) => panic!("linha ignorada: {}", reason),
        }
    }

    #[test]
    fn area_accepts_numbers_and_dimensions() {
        assert_eq!(parse_area_str("25x50"), Some(1250.0));
        assert_eq!(parse_area_str("25*50"), Some(1250.0));
        assert_eq!(parse_area_str("25 × 50"), Some(1250.0));
        assert_eq!(parse_area_str("25 X 50"), Some(1250.0));
        assert_eq!(parse_area_str("1250"), Some(1250.0));
        assert_eq!(parse_area_str("1,250"), Some(1250.0));
        assert_eq!(parse_area(&json!(1250)), Some(1250.0));
        assert_eq!(parse_area(&json!(312.5)), Some(312.5));
    }

    #[test]
    fn area_is_unknown_for_garbage() {
        assert_eq!(parse_area_str("grande"), None);
        assert_eq!(parse_area_str("25x"), None);
        assert_eq!(parse_area_str("25x50x2"), None);
        assert_eq!(parse_area_str(""), None);
        assert_eq!(parse_area(&Value::Null), None);
    }

    #[test]
    fn status_mapping_is_case_insensitive_with_default() {
        assert_eq!(map_status("Available"), PlotStatus::Available);
        assert_eq!(map_status("ACTIVE"), PlotStatus::Available);
        assert_eq!(map_status(" reserved "), PlotStatus::Reserved);
        assert_eq!(map_status("Hold"), PlotStatus::Hold);
        assert_eq!(map_status("SOLD"), PlotStatus::Sold);
        assert_eq!(map_status("under negotiation"), PlotStatus::Available);
        assert_eq!(map_status(""), PlotStatus::Available);
    }

    #[test]
    fn price_strips_currency_and_separators() {
        assert_eq!(parse_price(&json!("R$ 185,000")).unwrap(), Some(Decimal::from(185_000)));
        assert_eq!(
            parse_price(&json!("$1,250.50")).unwrap(),
            Some(Decimal::from_str("1250.50").unwrap())
        );
        assert_eq!(parse_price(&json!(99000)).unwrap(), Some(Decimal::from(99_000)));
        assert_eq!(parse_price(&json!("")).unwrap(), None);
        assert!(parse_price(&json!("a combinar")).is_err());
    }

    #[test]
    fn numeric_price_cells_keep_their_magnitude() {
        let huge = parse_price(&json!(1e21)).unwrap().unwrap();
        assert!(huge > Decimal::from(1_000_000_000_000_000_000i64));
        assert_eq!(
            parse_price(&json!(1250.5)).unwrap(),
            Some(Decimal::from_str("1250.50").unwrap())
        );
        assert!(parse_price(&json!(-10)).is_err());
    }

    #[test]
    fn header_like_rows_are_skipped() {
        for sentinel in ["Name", "PLOT NAME", "plot name"] {
            let decision = normalize_row(&row(&[("Plot Name", json!(sentinel))])).unwrap();
            assert!(matches!(decision, RowDecision::Skip(_)), "{sentinel}");
        }
        let decision = normalize_row(&row(&[("Name", json!("")), ("Area", json!("25x50"))])).unwrap();
        assert!(matches!(decision, RowDecision::Skip(_)));
    }

    #[test]
    fn type_and_category_use_first_non_empty_alternate() {
        let plot = plot_of(
            normalize_row(&row(&[
                ("Name", json!("A-1")),
                ("Type", json!("")),
                ("Plot Type", json!("Residential")),
                ("Property Type", json!("Commercial")),
                ("Class", json!("Corner")),
            ]))
            .unwrap(),
        );
        assert_eq!(plot.features["type"], "Residential");
        assert_eq!(plot.features["category"], "Corner");
    }

    #[test]
    fn full_row_normalizes() {
        let plot = plot_of(
            normalize_row(&row(&[
                ("Plot Number", json!("B-07")),
                ("Sector", json!("Norte")),
                ("Block", json!("B")),
                ("Area", json!("30x40")),
                ("Price", json!("120,000")),
                ("Status", json!("Reserved")),
                ("Facing", json!("East")),
            ]))
            .unwrap(),
        );
        assert_eq!(plot.plot_number, "B-07");
        assert_eq!(plot.sector.as_deref(), Some("Norte"));
        assert_eq!(plot.block.as_deref(), Some("B"));
        assert_eq!(plot.area, Some(1200.0));
        assert_eq!(plot.price, Some(Decimal::from(120_000)));
        assert_eq!(plot.status, PlotStatus::Reserved);
        assert_eq!(plot.features["facing"], "East");
    }

    #[test]
    fn numeric_plot_number_cell_is_accepted() {
        let plot = plot_of(normalize_row(&row(&[("Plot No", json!(42))])).unwrap());
        assert_eq!(plot.plot_number, "42");
    }

    #[test]
    fn grid_uses_first_line_as_header_and_keeps_line_numbers() {
        let rows = rows_from_grid(vec![
            vec![json!("Name"), json!("Area")],
            vec![json!("A-1"), json!("10x10")],
            vec![json!("A-2")],
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 2);
        assert_eq!(rows[1].0, 3);
        assert_eq!(rows[1].1.text("name").as_deref(), Some("A-2"));
        assert_eq!(rows[1].1.text("area"), None);
    }

    #[test]
    fn csv_upload_is_parsed() {
        let csv = "Plot Number,Area,Status\nA-1,25x50,sold\nA-2, 1250 ,hold\n";
        let rows = rows_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        let plot = plot_of(normalize_row(&rows[1].1).unwrap());
        assert_eq!(plot.area, Some(1250.0));
        assert_eq!(plot.status, PlotStatus::Hold);
    }

    #[tokio::test]
    async fn reimport_updates_instead_of_duplicating() {
        let store = Arc::new(MemoryPlotStore::default());
        let service = ImportService::new(store.clone());

        let first = service
            .process_row(&row(&[("Name", json!("A-1")), ("Status", json!("available"))]))
            .await;
        assert_eq!(first, ImportOutcome::Created);

        let second = service
            .process_row(&row(&[("Name", json!("A-1")), ("Status", json!("sold"))]))
            .await;
        assert_eq!(second, ImportOutcome::Updated);

        let plots = store.plots.lock().await;
        assert_eq!(plots.len(), 1);
        assert_eq!(plots[0].status, PlotStatus::Sold);
    }

    #[tokio::test]
    async fn bad_rows_are_reported_without_aborting() {
        let store = Arc::new(MemoryPlotStore::default());
        let service = ImportService::new(store.clone());

        let rows = rows_from_grid(vec![
            vec![json!("Name"), json!("Price")],
            vec![json!("A-1"), json!("100")],
            vec![json!("Name"), json!("Price")],
            vec![json!("A-2"), json!("a combinar")],
            vec![json!("A-3"), json!("300")],
            vec![json!("A-1"), json!("150")],
        ]);
        let report = service.import_rows(rows).await;

        assert_eq!(report.processed, 5);
        assert_eq!(report.added, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].row, 4);
        assert_eq!(store.plots.lock().await.len(), 2);
    }
}
