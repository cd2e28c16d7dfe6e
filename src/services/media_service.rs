// src/services/media_service.rs

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::MediaRepository,
    models::{auth::User, media::Media},
};

pub const LOCAL_DISK: &str = "local";

/// Caminho relativo `AAAA/MM/<uuid>.<ext>`. A extensão vem do nome original,
/// restrita a caracteres alfanuméricos.
pub fn relative_path(now: DateTime<Utc>, id: Uuid, original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{:04}/{:02}/{}{}", now.year(), now.month(), id, ext)
}

/// Arquivos no disco local, abaixo de uma raiz fixa.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, AppError> {
        // Os caminhos gravados são sempre gerados por `relative_path`
        if relative.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(AppError::BadRequest(format!("Caminho inválido: {}", relative)));
        }
        Ok(self.root.join(relative))
    }

    pub async fn write(&self, relative: &str, bytes: &[u8]) -> Result<(), AppError> {
        let full = self.resolve(relative)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;
        Ok(())
    }

    /// Remove o arquivo; arquivo já ausente não é erro.
    pub async fn remove(&self, relative: &str) -> Result<(), AppError> {
        let full = self.resolve(relative)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %full.display(), "arquivo de mídia já não existia");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Clone)]
pub struct MediaService {
    repo: MediaRepository,
    disk: LocalDisk,
}

impl MediaService {
    pub fn new(repo: MediaRepository, disk: LocalDisk) -> Self {
        Self { repo, disk }
    }

    pub async fn upload(
        &self,
        user: &User,
        original_name: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<Media, AppError> {
        if bytes.is_empty() {
            return Err(AppError::invalid_field("file", "O arquivo está vazio."));
        }

        let path = relative_path(Utc::now(), Uuid::new_v4(), original_name);
        self.disk.write(&path, bytes).await?;

        let created = self
            .repo
            .create_media(
                self.repo.pool(),
                LOCAL_DISK,
                &path,
                original_name,
                mime_type,
                bytes.len() as i64,
                user.id,
            )
            .await;

        match created {
            Ok(media) => {
                tracing::info!(media_id = %media.id, %path, size = bytes.len(), "mídia enviada");
                Ok(media)
            }
            Err(e) => {
                // Sem registro no banco o arquivo ficaria órfão
                if let Err(cleanup) = self.disk.remove(&path).await {
                    tracing::error!("Falha ao remover arquivo órfão {}: {}", path, cleanup);
                }
                Err(e)
            }
        }
    }

    pub async fn list_media(&self) -> Result<Vec<Media>, AppError> {
        self.repo.list_media().await
    }

    pub async fn delete_media(&self, id: Uuid) -> Result<(), AppError> {
        let media = self
            .repo
            .delete_media(id)
            .await?
            .ok_or(AppError::NotFound("Mídia"))?;
        self.disk.remove(&media.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn path_is_partitioned_by_month() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        let id = Uuid::nil();
        assert_eq!(
            relative_path(now, id, "Mapa Norte.PNG"),
            "2026/03/00000000-0000-0000-0000-000000000000.png"
        );
        assert_eq!(
            relative_path(now, id, "sem-extensao"),
            "2026/03/00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            relative_path(now, id, "x.p/h"),
            "2026/03/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn traversal_is_rejected() {
        let disk = LocalDisk::new("/tmp/plotdesk");
        assert!(disk.resolve("../etc/passwd").is_err());
        assert!(disk.resolve("2026//a.png").is_err());
        assert!(disk.resolve("2026/03/a.png").is_ok());
    }

    #[tokio::test]
    async fn write_then_remove_twice() {
        let root = std::env::temp_dir().join(format!("plotdesk-media-{}", Uuid::new_v4()));
        let disk = LocalDisk::new(&root);

        disk.write("2026/03/a.png", b"png").await.unwrap();
        assert_eq!(tokio::fs::read(root.join("2026/03/a.png")).await.unwrap(), b"png");

        disk.remove("2026/03/a.png").await.unwrap();
        disk.remove("2026/03/a.png").await.unwrap();

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
