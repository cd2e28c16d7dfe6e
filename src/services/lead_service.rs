// src/services/lead_service.rs

use serde_json::{json, Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::non_blank, error::AppError},
    db::{LeadRepository, UserRepository},
    models::auth::User,
    models::lead::{
        CreateLeadPayload, Lead, LeadDetail, LeadHistory, LeadHistoryAction, LeadQuery, LeadStatus,
        NewLeadHistory, UpdateLeadPayload,
    },
};

// =========================================================================
//  PONTUAÇÃO
// =========================================================================

const EMAIL_POINTS: i32 = 20;
const MESSAGE_POINTS: i32 = 15;
const PLOT_POINTS: i32 = 25;
const MAX_SCORE: i32 = 100;

/// Valores de um lead no momento de salvar. É sobre eles que a pontuação
/// e o diff do histórico são calculados.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadFields {
    pub plot_id: Option<Uuid>,
    pub admin_user_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub status: LeadStatus,
    pub metadata: Value,
}

impl From<&Lead> for LeadFields {
    fn from(lead: &Lead) -> Self {
        Self {
            plot_id: lead.plot_id,
            admin_user_id: lead.admin_user_id,
            name: lead.name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            message: lead.message.clone(),
            status: lead.status,
            metadata: lead.metadata.clone(),
        }
    }
}

impl LeadFields {
    fn from_submission(payload: CreateLeadPayload) -> Self {
        Self {
            plot_id: payload.plot_id,
            admin_user_id: None,
            name: payload.name.trim().to_string(),
            email: clean(payload.email),
            phone: clean(payload.phone),
            message: clean(payload.message),
            status: LeadStatus::New,
            metadata: payload.metadata.unwrap_or_else(|| Value::Object(Map::new())),
        }
    }

    /// Aplica uma atualização parcial. Strings vazias limpam o campo.
    fn apply(mut self, changes: UpdateLeadPayload) -> Self {
        if let Some(plot_id) = changes.plot_id {
            self.plot_id = plot_id;
        }
        if let Some(admin_user_id) = changes.admin_user_id {
            self.admin_user_id = admin_user_id;
        }
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if changes.email.is_some() {
            self.email = clean(changes.email);
        }
        if changes.phone.is_some() {
            self.phone = clean(changes.phone);
        }
        if changes.message.is_some() {
            self.message = clean(changes.message);
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(metadata) = changes.metadata {
            self.metadata = metadata;
        }
        self
    }
}

// O validator mede a string crua; o nome é conferido já aparado
fn require_name(fields: &LeadFields) -> Result<(), AppError> {
    if fields.name.is_empty() {
        return Err(AppError::invalid_field("name", "O nome não pode ser vazio."));
    }
    Ok(())
}

/// Só administradores podem ser responsáveis por um lead.
fn require_assignable(user: Option<&User>) -> Result<(), AppError> {
    match user {
        Some(user) if user.is_admin() => Ok(()),
        Some(_) => Err(AppError::invalid_field(
            "adminUserId",
            "O responsável precisa ser um administrador.",
        )),
        None => Err(AppError::invalid_field("adminUserId", "Usuário responsável não encontrado.")),
    }
}

fn clean(value: Option<String>) -> Option<String> {
    non_blank(value.as_deref()).map(str::to_string)
}

fn status_bonus(status: LeadStatus) -> i32 {
    match status {
        LeadStatus::New => 10,
        LeadStatus::Contacted => 20,
        LeadStatus::Interested => 30,
        LeadStatus::Closed => 40,
    }
}

/// Pontuação 0..=100, função pura dos campos atuais.
pub fn calculate_score(fields: &LeadFields) -> i32 {
    let mut score = status_bonus(fields.status);
    if non_blank(fields.email.as_deref()).is_some() {
        score += EMAIL_POINTS;
    }
    if non_blank(fields.message.as_deref()).is_some() {
        score += MESSAGE_POINTS;
    }
    if fields.plot_id.is_some() {
        score += PLOT_POINTS;
    }
    score.clamp(0, MAX_SCORE)
}

// =========================================================================
//  AUDITORIA
// =========================================================================

fn uuid_or_null(id: Option<Uuid>) -> Value {
    id.map(|v| Value::String(v.to_string())).unwrap_or(Value::Null)
}

/// Compara o original gravado com os novos valores e produz uma entrada de
/// histórico por campo auditado que mudou (status, responsável).
pub fn audit_changes(original: &Lead, updated: &LeadFields) -> Vec<NewLeadHistory> {
    let mut entries = Vec::new();

    if original.status != updated.status {
        entries.push(NewLeadHistory {
            action: LeadHistoryAction::StatusChanged,
            details: Some(format!(
                "Status alterado de {} para {}",
                original.status.as_str(),
                updated.status.as_str()
            )),
            metadata: json!({
                "field": "status",
                "old": original.status.as_str(),
                "new": updated.status.as_str(),
            }),
        });
    }

    if original.admin_user_id != updated.admin_user_id {
        let details = match updated.admin_user_id {
            Some(id) => format!("Lead atribuído ao usuário {}", id),
            None => "Atribuição removida".to_string(),
        };
        entries.push(NewLeadHistory {
            action: LeadHistoryAction::Assigned,
            details: Some(details),
            metadata: json!({
                "field": "admin_user_id",
                "old": uuid_or_null(original.admin_user_id),
                "new": uuid_or_null(updated.admin_user_id),
            }),
        });
    }

    entries
}

// =========================================================================
//  SERVIÇO
// =========================================================================

#[derive(Clone)]
pub struct LeadService {
    repo: LeadRepository,
    user_repo: UserRepository,
}

impl LeadService {
    pub fn new(repo: LeadRepository, user_repo: UserRepository) -> Self {
        Self { repo, user_repo }
    }

    /// Envio público do formulário de interesse.
    pub async fn submit_lead(&self, payload: CreateLeadPayload) -> Result<Lead, AppError> {
        payload.validate()?;
        let fields = LeadFields::from_submission(payload);
        require_name(&fields)?;
        let score = calculate_score(&fields);

        let mut tx = self.repo.pool().begin().await?;

        let lead = self.repo.create_lead(&mut *tx, &fields, score).await?;

        let entry = NewLeadHistory {
            action: LeadHistoryAction::Created,
            details: Some("Lead recebido pelo formulário público".to_string()),
            metadata: json!({ "score": score }),
        };
        self.repo.append_history(&mut *tx, lead.id, None, &entry).await?;

        tx.commit().await?;

        tracing::info!(lead_id = %lead.id, score, "novo lead recebido");
        Ok(lead)
    }

    pub async fn list_leads(&self, query: &LeadQuery) -> Result<Vec<Lead>, AppError> {
        self.repo.list_leads(self.repo.pool(), query).await
    }

    pub async fn get_lead(&self, id: Uuid) -> Result<LeadDetail, AppError> {
        let lead = self
            .repo
            .find_by_id(self.repo.pool(), id)
            .await?
            .ok_or(AppError::NotFound("Lead"))?;
        let history = self.repo.list_history(self.repo.pool(), id).await?;
        Ok(LeadDetail { lead, history })
    }

    /// Atualiza o lead, recalcula a pontuação e grava o histórico na mesma
    /// transação: se o histórico falhar, a atualização é desfeita.
    pub async fn update_lead(
        &self,
        id: Uuid,
        changes: UpdateLeadPayload,
        actor_id: Uuid,
    ) -> Result<Lead, AppError> {
        changes.validate()?;
        let mut tx = self.repo.pool().begin().await?;

        let original = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Lead"))?;

        let fields = LeadFields::from(&original).apply(changes);
        require_name(&fields)?;
        if let Some(assignee) = fields.admin_user_id.filter(|id| original.admin_user_id != Some(*id)) {
            let user = self.user_repo.find_by_id(assignee).await?;
            require_assignable(user.as_ref())?;
        }
        let score = calculate_score(&fields);

        let updated = self.repo.update_lead(&mut *tx, id, &fields, score).await?;

        for entry in audit_changes(&original, &fields) {
            self.repo
                .append_history(&mut *tx, id, Some(actor_id), &entry)
                .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn add_note(&self, id: Uuid, note: &str, actor_id: Uuid) -> Result<LeadHistory, AppError> {
        self.repo
            .find_by_id(self.repo.pool(), id)
            .await?
            .ok_or(AppError::NotFound("Lead"))?;

        let entry = NewLeadHistory {
            action: LeadHistoryAction::NoteAdded,
            details: Some(note.trim().to_string()),
            metadata: json!({}),
        };
        self.repo
            .append_history(self.repo.pool(), id, Some(actor_id), &entry)
            .await
    }

    pub async fn delete_lead(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.soft_delete(self.repo.pool(), id).await? {
            return Err(AppError::NotFound("Lead"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::UserRole;
    use chrono::Utc;

    fn fields(status: LeadStatus) -> LeadFields {
        LeadFields {
            plot_id: None,
            admin_user_id: None,
            name: "Carlos".into(),
            email: None,
            phone: None,
            message: None,
            status,
            metadata: json!({}),
        }
    }

    fn stored(status: LeadStatus, admin_user_id: Option<Uuid>) -> Lead {
        Lead {
            id: Uuid::new_v4(),
            plot_id: None,
            admin_user_id,
            name: "Carlos".into(),
            email: None,
            phone: None,
            message: None,
            status,
            score: 10,
            metadata: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn score_follows_rule_table() {
        let mut f = fields(LeadStatus::New);
        assert_eq!(calculate_score(&f), 10);

        f.email = Some("c@exemplo.com".into());
        assert_eq!(calculate_score(&f), 30);

        f.message = Some("Tenho interesse".into());
        assert_eq!(calculate_score(&f), 45);

        f.plot_id = Some(Uuid::new_v4());
        assert_eq!(calculate_score(&f), 70);

        f.status = LeadStatus::Closed;
        assert_eq!(calculate_score(&f), 100);
    }

    #[test]
    fn blank_strings_do_not_score() {
        let mut f = fields(LeadStatus::New);
        f.email = Some("   ".into());
        f.message = Some(String::new());
        assert_eq!(calculate_score(&f), 10);
    }

    #[test]
    fn score_is_monotonic_and_bounded() {
        let statuses = [
            LeadStatus::New,
            LeadStatus::Contacted,
            LeadStatus::Interested,
            LeadStatus::Closed,
        ];
        for mask in 0..8u8 {
            for (i, status) in statuses.iter().enumerate() {
                let mut f = fields(*status);
                if mask & 1 != 0 {
                    f.email = Some("a@b.com".into());
                }
                if mask & 2 != 0 {
                    f.message = Some("oi".into());
                }
                if mask & 4 != 0 {
                    f.plot_id = Some(Uuid::nil());
                }
                let base = calculate_score(&f);
                assert!((0..=100).contains(&base));

                // Adicionar qualquer item nunca diminui a pontuação
                let mut more = f.clone();
                more.email = Some("a@b.com".into());
                assert!(calculate_score(&more) >= base);
                let mut more = f.clone();
                more.message = Some("oi".into());
                assert!(calculate_score(&more) >= base);
                let mut more = f.clone();
                more.plot_id = Some(Uuid::nil());
                assert!(calculate_score(&more) >= base);
                if let Some(next) = statuses.get(i + 1) {
                    let mut more = f.clone();
                    more.status = *next;
                    assert!(calculate_score(&more) >= base);
                }
            }
        }
    }

    #[test]
    fn status_change_produces_exactly_one_entry() {
        let original = stored(LeadStatus::New, None);
        let updated = LeadFields::from(&original).apply(UpdateLeadPayload {
            status: Some(LeadStatus::Contacted),
            ..Default::default()
        });

        let entries = audit_changes(&original, &updated);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, LeadHistoryAction::StatusChanged);
        assert_eq!(entries[0].metadata["old"], "new");
        assert_eq!(entries[0].metadata["new"], "contacted");
    }

    #[test]
    fn assignment_and_status_produce_one_entry_each() {
        let admin = Uuid::new_v4();
        let original = stored(LeadStatus::New, None);
        let updated = LeadFields::from(&original).apply(UpdateLeadPayload {
            status: Some(LeadStatus::Interested),
            admin_user_id: Some(Some(admin)),
            ..Default::default()
        });

        let entries = audit_changes(&original, &updated);
        let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![LeadHistoryAction::StatusChanged, LeadHistoryAction::Assigned]
        );
        assert_eq!(entries[1].metadata["old"], Value::Null);
        assert_eq!(entries[1].metadata["new"], admin.to_string());
    }

    #[test]
    fn unchanged_fields_produce_no_entries() {
        let original = stored(LeadStatus::Contacted, Some(Uuid::new_v4()));
        let updated = LeadFields::from(&original).apply(UpdateLeadPayload {
            status: Some(LeadStatus::Contacted),
            phone: Some("11 9999-0000".into()),
            ..Default::default()
        });
        assert!(audit_changes(&original, &updated).is_empty());
    }

    #[test]
    fn unassigning_is_audited() {
        let original = stored(LeadStatus::New, Some(Uuid::new_v4()));
        let updated = LeadFields::from(&original).apply(UpdateLeadPayload {
            admin_user_id: Some(None),
            ..Default::default()
        });
        let entries = audit_changes(&original, &updated);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].metadata["new"], Value::Null);
    }

    #[test]
    fn blank_public_name_is_rejected() {
        let payload: CreateLeadPayload =
            serde_json::from_value(json!({ "name": "   ", "email": "c@exemplo.com" })).unwrap();
        assert!(payload.validate().is_ok());

        let fields = LeadFields::from_submission(payload);
        let err = require_name(&fields).unwrap_err();
        assert!(matches!(err, AppError::InvalidField { .. }));
    }

    fn account(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Beatriz".into(),
            email: "bia@exemplo.com".into(),
            password_hash: String::new(),
            role,
            is_super_admin: false,
            permissions: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn only_admins_can_be_assigned() {
        assert!(require_assignable(Some(&account(UserRole::Admin))).is_ok());

        let err = require_assignable(Some(&account(UserRole::User))).unwrap_err();
        assert!(matches!(err, AppError::InvalidField { .. }));

        assert!(require_assignable(None).is_err());
    }
}
