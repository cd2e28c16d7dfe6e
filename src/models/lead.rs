// src/models/lead.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Mapeia o CREATE TYPE lead_status do banco
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "lead_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Interested,
    Closed,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Interested => "interested",
            LeadStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub plot_id: Option<Uuid>,

    // Administrador responsável pelo atendimento
    pub admin_user_id: Option<Uuid>,

    #[schema(example = "Carlos Lima")]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,

    pub status: LeadStatus,

    // Sempre calculado pelo servidor
    #[schema(example = 65, minimum = 0, maximum = 100)]
    pub score: i32,

    pub metadata: Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Ações gravadas no histórico de um lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadHistoryAction {
    Created,
    StatusChanged,
    Assigned,
    NoteAdded,
}

impl LeadHistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadHistoryAction::Created => "created",
            LeadHistoryAction::StatusChanged => "status_changed",
            LeadHistoryAction::Assigned => "assigned",
            LeadHistoryAction::NoteAdded => "note_added",
        }
    }
}

// Entrada do histórico (somente inserção)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadHistory {
    pub id: Uuid,
    pub lead_id: Uuid,

    // Quem fez a alteração (nulo para envios públicos)
    pub user_id: Option<Uuid>,

    #[schema(example = "status_changed")]
    pub action: String,

    #[schema(example = "Status alterado de new para contacted")]
    pub details: Option<String>,

    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Entrada ainda não persistida, produzida pelo auditor.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeadHistory {
    pub action: LeadHistoryAction,
    pub details: Option<String>,
    pub metadata: Value,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadDetail {
    #[serde(flatten)]
    pub lead: Lead,
    pub history: Vec<LeadHistory>,
}

// Formulário público de interesse
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    pub plot_id: Option<Uuid>,

    #[validate(length(min = 1, max = 120, message = "O nome é obrigatório."))]
    #[schema(example = "Carlos Lima")]
    pub name: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,

    #[validate(length(max = 40, message = "Telefone muito longo."))]
    pub phone: Option<String>,

    #[validate(length(max = 5000, message = "Mensagem muito longa."))]
    pub message: Option<String>,

    #[serde(default)]
    pub metadata: Option<Value>,
}

// Atualização feita pelo admin. `score` não é aceito: é sempre recalculado.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateLeadPayload {
    // Some(None) desvincula o lote / o responsável
    #[serde(default, deserialize_with = "double_option::deserialize")]
    #[schema(value_type = Option<Uuid>)]
    pub plot_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option::deserialize")]
    #[schema(value_type = Option<Uuid>)]
    pub admin_user_id: Option<Option<Uuid>>,

    #[validate(length(min = 1, max = 120, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub message: Option<String>,
    pub status: Option<LeadStatus>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LeadNotePayload {
    #[validate(length(min = 1, max = 5000, message = "A anotação é obrigatória."))]
    pub note: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeadQuery {
    pub status: Option<LeadStatus>,
    pub admin_user_id: Option<Uuid>,
    pub plot_id: Option<Uuid>,
}

// Distingue "campo ausente" de "campo enviado como null"
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_payload_distinguishes_null_from_missing() {
        let payload: UpdateLeadPayload =
            serde_json::from_value(serde_json::json!({ "adminUserId": null })).unwrap();
        assert_eq!(payload.admin_user_id, Some(None));
        assert_eq!(payload.plot_id, None);
    }

    #[test]
    fn update_payload_rejects_client_score() {
        let result: Result<UpdateLeadPayload, _> =
            serde_json::from_value(serde_json::json!({ "score": 100 }));
        assert!(result.is_err());
    }
}
