// src/models/media.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: Uuid,

    #[schema(example = "local")]
    pub disk: String,

    // Caminho relativo à raiz do disco
    #[schema(example = "2026/10/6f1c0c3e-2b7e-4a53-9a57-2f4c1d1f0b7e.png")]
    pub path: String,

    #[schema(example = "mapa-setor-norte.png")]
    pub original_name: String,

    pub mime_type: Option<String>,
    pub size_bytes: i64,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
