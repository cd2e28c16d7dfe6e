// src/models/plot.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// Mapeia o CREATE TYPE plot_status do banco
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "plot_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlotStatus {
    Available,
    Reserved,
    Hold,
    Sold,
}

/// Ponto do polígono, normalizado em [0, 1] sobre a imagem base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Point {
    #[schema(example = 0.25)]
    pub x: f64,
    #[schema(example = 0.5)]
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plot {
    pub id: Uuid,

    #[schema(example = "A-101")]
    pub plot_number: String,

    #[schema(example = "Setor Norte")]
    pub sector: Option<String>,

    #[schema(example = "B")]
    pub block: Option<String>,

    // Lotes vindos da importação podem ainda não ter polígono desenhado
    #[schema(value_type = Option<Vec<Point>>)]
    pub coordinates: Option<Json<Vec<Point>>>,

    pub status: PlotStatus,

    #[schema(example = 1250.0)]
    pub area: Option<f64>,

    #[schema(example = 185000.0)]
    pub price: Option<Decimal>,

    pub base_image_id: Option<Uuid>,

    // Escala / rotação / deslocamento aplicados à imagem base
    pub image_transform: Option<Value>,

    pub features: Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// ---
// Validação Customizada do polígono
// ---
pub fn validate_coordinates(points: &[Point]) -> Result<(), ValidationError> {
    if points.len() < 3 {
        let mut err = ValidationError::new("min_points");
        err.add_param("min".into(), &3);
        err.message = Some("O polígono precisa de pelo menos 3 pontos.".into());
        return Err(err);
    }

    let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if points.iter().any(|p| !in_range(p.x) || !in_range(p.y)) {
        let mut err = ValidationError::new("range");
        err.message = Some("As coordenadas devem estar normalizadas entre 0 e 1.".into());
        return Err(err);
    }

    Ok(())
}

fn validate_non_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_features(val: &Value) -> Result<(), ValidationError> {
    if !val.is_object() {
        let mut err = ValidationError::new("invalid_type");
        err.message = Some("As características devem ser um objeto JSON.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlotPayload {
    #[validate(length(min = 1, max = 64, message = "O número do lote é obrigatório."))]
    #[schema(example = "A-101")]
    pub plot_number: String,

    pub sector: Option<String>,
    pub block: Option<String>,

    #[validate(custom(function = "validate_coordinates"))]
    pub coordinates: Vec<Point>,

    #[serde(default = "default_status")]
    pub status: PlotStatus,

    #[validate(range(min = 0.0, message = "A área não pode ser negativa."))]
    pub area: Option<f64>,

    #[validate(custom(function = "validate_non_negative"))]
    pub price: Option<Decimal>,

    pub base_image_id: Option<Uuid>,
    pub image_transform: Option<Value>,

    #[serde(default = "empty_object")]
    #[validate(custom(function = "validate_features"))]
    pub features: Value,
}

// Atualização parcial: só o que vier preenchido é alterado
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlotPayload {
    #[validate(length(min = 1, max = 64, message = "O número do lote não pode ser vazio."))]
    pub plot_number: Option<String>,

    pub sector: Option<String>,
    pub block: Option<String>,

    #[validate(custom(function = "validate_coordinates"))]
    pub coordinates: Option<Vec<Point>>,

    pub status: Option<PlotStatus>,

    #[validate(range(min = 0.0, message = "A área não pode ser negativa."))]
    pub area: Option<f64>,

    #[validate(custom(function = "validate_non_negative"))]
    pub price: Option<Decimal>,

    pub base_image_id: Option<Uuid>,
    pub image_transform: Option<Value>,

    #[validate(custom(function = "validate_features"))]
    pub features: Option<Value>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PlotQuery {
    /// Filtra por status
    pub status: Option<PlotStatus>,
    /// Filtra por setor
    pub sector: Option<String>,
    /// Inclui lotes excluídos (somente admin)
    #[serde(default)]
    pub include_deleted: bool,
}

fn default_status() -> PlotStatus {
    PlotStatus::Available
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point { x: 0.1, y: 0.1 },
            Point { x: 0.2, y: 0.1 },
            Point { x: 0.2, y: 0.2 },
            Point { x: 0.1, y: 0.2 },
        ]
    }

    #[test]
    fn polygon_needs_three_points() {
        let mut points = square();
        assert!(validate_coordinates(&points).is_ok());
        points.truncate(2);
        let err = validate_coordinates(&points).unwrap_err();
        assert_eq!(err.code, "min_points");
    }

    #[test]
    fn polygon_points_must_be_normalized() {
        let mut points = square();
        points[2] = Point { x: 1.5, y: 0.2 };
        let err = validate_coordinates(&points).unwrap_err();
        assert_eq!(err.code, "range");
    }

    #[test]
    fn create_payload_defaults() {
        let payload: CreatePlotPayload = serde_json::from_value(serde_json::json!({
            "plotNumber": "A-1",
            "coordinates": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0}, {"x": 1.0, "y": 1.0}]
        }))
        .unwrap();
        assert_eq!(payload.status, PlotStatus::Available);
        assert!(payload.features.is_object());
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn create_payload_rejects_short_polygon() {
        let payload: CreatePlotPayload = serde_json::from_value(serde_json::json!({
            "plotNumber": "A-1",
            "coordinates": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0}]
        }))
        .unwrap();
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("coordinates"));
    }
}
