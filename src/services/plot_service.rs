// src/services/plot_service.rs

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::non_blank, error::AppError},
    db::{plot_repo::PlotRecord, PlotRepository},
    models::plot::{CreatePlotPayload, Plot, PlotQuery, UpdatePlotPayload},
};

impl From<CreatePlotPayload> for PlotRecord {
    fn from(p: CreatePlotPayload) -> Self {
        Self {
            plot_number: p.plot_number.trim().to_string(),
            sector: non_blank(p.sector.as_deref()).map(str::to_string),
            block: non_blank(p.block.as_deref()).map(str::to_string),
            coordinates: Some(p.coordinates),
            status: p.status,
            area: p.area,
            price: p.price,
            base_image_id: p.base_image_id,
            image_transform: p.image_transform,
            features: p.features,
        }
    }
}

impl PlotRecord {
    /// Aplica uma atualização parcial sobre os valores atuais.
    pub fn apply(mut self, changes: UpdatePlotPayload) -> Self {
        if let Some(number) = changes.plot_number {
            self.plot_number = number.trim().to_string();
        }
        if let Some(sector) = changes.sector {
            self.sector = non_blank(Some(&sector)).map(str::to_string);
        }
        if let Some(block) = changes.block {
            self.block = non_blank(Some(&block)).map(str::to_string);
        }
        if let Some(points) = changes.coordinates {
            self.coordinates = Some(points);
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if changes.area.is_some() {
            self.area = changes.area;
        }
        if changes.price.is_some() {
            self.price = changes.price;
        }
        if changes.base_image_id.is_some() {
            self.base_image_id = changes.base_image_id;
        }
        if changes.image_transform.is_some() {
            self.image_transform = changes.image_transform;
        }
        if let Some(features) = changes.features {
            self.features = features;
        }
        self
    }
}

#[derive(Clone)]
pub struct PlotService {
    repo: PlotRepository,
}

impl PlotService {
    pub fn new(repo: PlotRepository) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &PlotRepository {
        &self.repo
    }

    pub async fn list_plots(&self, query: &PlotQuery) -> Result<Vec<Plot>, AppError> {
        self.repo.list_plots(self.repo.pool(), query).await
    }

    pub async fn get_plot(&self, id: Uuid, include_deleted: bool) -> Result<Plot, AppError> {
        self.repo
            .find_by_id(self.repo.pool(), id, include_deleted)
            .await?
            .ok_or(AppError::NotFound("Lote"))
    }

    pub async fn create_plot(&self, payload: CreatePlotPayload) -> Result<Plot, AppError> {
        payload.validate()?;
        let record = PlotRecord::from(payload);
        let plot = self.repo.create_plot(self.repo.pool(), &record).await?;
        tracing::info!(plot_id = %plot.id, plot_number = %plot.plot_number, "lote criado");
        Ok(plot)
    }

    pub async fn update_plot(&self, id: Uuid, changes: UpdatePlotPayload) -> Result<Plot, AppError> {
        changes.validate()?;

        let mut tx = self.repo.pool().begin().await?;
        let current = self
            .repo
            .find_by_id(&mut *tx, id, false)
            .await?
            .ok_or(AppError::NotFound("Lote"))?;

        let record = PlotRecord::from(current).apply(changes);
        let plot = self
            .repo
            .update_plot(&mut *tx, id, &record)
            .await?
            .ok_or(AppError::NotFound("Lote"))?;
        tx.commit().await?;

        Ok(plot)
    }

    pub async fn delete_plot(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.soft_delete(self.repo.pool(), id).await? {
            return Err(AppError::NotFound("Lote"));
        }
        tracing::info!(plot_id = %id, "lote excluído");
        Ok(())
    }

    pub async fn restore_plot(&self, id: Uuid) -> Result<Plot, AppError> {
        self.repo
            .restore(self.repo.pool(), id)
            .await?
            .ok_or(AppError::NotFound("Lote"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plot::{PlotStatus, Point};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn record() -> PlotRecord {
        PlotRecord {
            plot_number: "A-1".into(),
            sector: Some("Norte".into()),
            block: None,
            coordinates: Some(vec![
                Point { x: 0.0, y: 0.0 },
                Point { x: 1.0, y: 0.0 },
                Point { x: 1.0, y: 1.0 },
            ]),
            status: PlotStatus::Available,
            area: Some(300.0),
            price: Some(Decimal::from(90_000)),
            base_image_id: None,
            image_transform: None,
            features: json!({"facing": "east"}),
        }
    }

    #[test]
    fn partial_update_keeps_untouched_fields() {
        let updated = record().apply(UpdatePlotPayload {
            status: Some(PlotStatus::Sold),
            ..Default::default()
        });
        assert_eq!(updated.status, PlotStatus::Sold);
        assert_eq!(updated.plot_number, "A-1");
        assert_eq!(updated.area, Some(300.0));
        assert_eq!(updated.features, json!({"facing": "east"}));
    }

    #[test]
    fn blank_sector_clears_it() {
        let updated = record().apply(UpdatePlotPayload {
            sector: Some("  ".into()),
            plot_number: Some(" A-2 ".into()),
            ..Default::default()
        });
        assert_eq!(updated.sector, None);
        assert_eq!(updated.plot_number, "A-2");
    }
}
