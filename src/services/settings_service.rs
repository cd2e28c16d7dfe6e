// src/services/settings_service.rs

use serde_json::{Map, Value};
use validator::Validate;

use crate::{
    common::error::AppError,
    db::SettingsRepository,
    models::settings::{Setting, UpsertSettingRequest},
};

/// Mapa `chave -> valor tipado` exposto no site público.
pub fn public_map(settings: &[Setting]) -> Map<String, Value> {
    settings
        .iter()
        .filter(|s| s.is_public)
        .map(|s| (s.key.clone(), s.typed_value()))
        .collect()
}

#[derive(Clone)]
pub struct SettingsService {
    repo: SettingsRepository,
}

impl SettingsService {
    pub fn new(repo: SettingsRepository) -> Self {
        Self { repo }
    }

    pub async fn list_settings(&self) -> Result<Vec<Setting>, AppError> {
        self.repo.list_settings(false).await
    }

    pub async fn public_settings(&self) -> Result<Map<String, Value>, AppError> {
        let settings = self.repo.list_settings(true).await?;
        Ok(public_map(&settings))
    }

    pub async fn upsert_setting(&self, mut input: UpsertSettingRequest) -> Result<Setting, AppError> {
        input.validate()?;
        input.key = input.key.trim().to_string();

        // O valor precisa ser interpretável pelo tipo declarado
        input
            .value_type
            .parse(&input.value)
            .map_err(|message| AppError::invalid_field("value", message))?;

        let setting = self.repo.upsert_setting(self.repo.pool(), &input).await?;
        tracing::info!(key = %setting.key, "configuração gravada");
        Ok(setting)
    }

    pub async fn delete_setting(&self, key: &str) -> Result<(), AppError> {
        if !self.repo.delete_setting(key).await? {
            return Err(AppError::NotFound("Configuração"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::SettingType;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn setting(key: &str, value: &str, value_type: SettingType, is_public: bool) -> Setting {
        Setting {
            id: Uuid::new_v4(),
            key: key.into(),
            value: value.into(),
            value_type,
            is_public,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn public_map_is_typed_and_hides_private_keys() {
        let map = public_map(&[
            setting("site.phone", "(11) 99999-8888", SettingType::String, true),
            setting("map.max_zoom", "18", SettingType::Integer, true),
            setting("leads.auto_assign", "true", SettingType::Boolean, true),
            setting("sheet.api_key", "segredo", SettingType::String, false),
        ]);

        assert_eq!(map.len(), 3);
        assert_eq!(map["map.max_zoom"], json!(18));
        assert_eq!(map["leads.auto_assign"], json!(true));
        assert!(!map.contains_key("sheet.api_key"));
    }
}
