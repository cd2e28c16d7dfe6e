// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Mapeia o CREATE TYPE setting_type do banco
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "setting_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    String,
    Integer,
    Boolean,
    Json,
}

impl SettingType {
    /// Interpreta o valor bruto (texto) conforme o tipo declarado.
    pub fn parse(self, raw: &str) -> Result<Value, String> {
        match self {
            SettingType::String => Ok(Value::String(raw.to_string())),
            SettingType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{}' não é um número inteiro.", raw)),
            SettingType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(format!("'{}' não é um booleano.", raw)),
            },
            SettingType::Json => {
                serde_json::from_str(raw).map_err(|e| format!("JSON inválido: {}", e))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub id: Uuid,

    #[schema(example = "site.contact_phone")]
    pub key: String,

    // Valor bruto, sempre texto no banco
    #[schema(example = "(11) 99999-8888")]
    pub value: String,

    pub value_type: SettingType,

    // Exposto em /api/public/settings
    pub is_public: bool,

    pub updated_at: DateTime<Utc>,
}

impl Setting {
    pub fn typed_value(&self) -> Value {
        // Linhas antigas com valor inconsistente caem para texto puro
        self.value_type
            .parse(&self.value)
            .unwrap_or_else(|_| Value::String(self.value.clone()))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertSettingRequest {
    #[validate(length(min = 1, max = 120, message = "A chave é obrigatória."))]
    #[schema(example = "site.contact_phone")]
    pub key: String,

    pub value: String,

    #[serde(default = "default_type")]
    pub value_type: SettingType,

    #[serde(default)]
    pub is_public: bool,
}

fn default_type() -> SettingType {
    SettingType::String
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_parsing() {
        assert_eq!(SettingType::Integer.parse(" 42 "), Ok(json!(42)));
        assert_eq!(SettingType::Boolean.parse("ON"), Ok(json!(true)));
        assert_eq!(SettingType::Json.parse(r#"{"a":1}"#), Ok(json!({"a": 1})));
        assert!(SettingType::Integer.parse("4.2").is_err());
        assert!(SettingType::Boolean.parse("talvez").is_err());
    }
}
