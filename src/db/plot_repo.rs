// src/db/plot_repo.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_constraint_error, error::AppError},
    models::{
        import::CanonicalPlot,
        plot::{Plot, PlotQuery, PlotStatus, Point},
    },
    services::import_service::{PlotStore, UpsertKind},
};

const PLOT_COLUMNS: &str = "id, plot_number, sector, block, coordinates, status, area, price, \
     base_image_id, image_transform, features, created_at, updated_at, deleted_at";

/// Valores completos de um lote, prontos para INSERT/UPDATE.
#[derive(Debug, Clone)]
pub struct PlotRecord {
    pub plot_number: String,
    pub sector: Option<String>,
    pub block: Option<String>,
    pub coordinates: Option<Vec<Point>>,
    pub status: PlotStatus,
    pub area: Option<f64>,
    pub price: Option<Decimal>,
    pub base_image_id: Option<Uuid>,
    pub image_transform: Option<Value>,
    pub features: Value,
}

impl From<Plot> for PlotRecord {
    fn from(p: Plot) -> Self {
        Self {
            plot_number: p.plot_number,
            sector: p.sector,
            block: p.block,
            coordinates: p.coordinates.map(|Json(points)| points),
            status: p.status,
            area: p.area,
            price: p.price,
            base_image_id: p.base_image_id,
            image_transform: p.image_transform,
            features: p.features,
        }
    }
}

fn duplicate_plot_number(plot_number: &str) -> AppError {
    AppError::UniqueConstraintViolation(format!("O lote '{}' já existe.", plot_number))
}

#[derive(Clone)]
pub struct PlotRepository {
    pool: PgPool,
}

impl PlotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn list_plots<'e, E>(&self, executor: E, query: &PlotQuery) -> Result<Vec<Plot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plots = sqlx::query_as::<_, Plot>(&format!(
            r#"
            SELECT {PLOT_COLUMNS}
            FROM plots
            WHERE ($1::plot_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR sector = $2)
              AND ($3 OR deleted_at IS NULL)
            ORDER BY sector NULLS LAST, plot_number ASC
            "#
        ))
        .bind(query.status)
        .bind(query.sector.as_deref())
        .bind(query.include_deleted)
        .fetch_all(executor)
        .await?;

        Ok(plots)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        include_deleted: bool,
    ) -> Result<Option<Plot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plot = sqlx::query_as::<_, Plot>(&format!(
            "SELECT {PLOT_COLUMNS} FROM plots WHERE id = $1 AND ($2 OR deleted_at IS NULL)"
        ))
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(executor)
        .await?;

        Ok(plot)
    }

    pub async fn create_plot<'e, E>(&self, executor: E, record: &PlotRecord) -> Result<Plot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Plot>(&format!(
            r#"
            INSERT INTO plots (
                plot_number, sector, block, coordinates, status, area, price,
                base_image_id, image_transform, features
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PLOT_COLUMNS}
            "#
        ))
        .bind(&record.plot_number)
        .bind(record.sector.as_deref())
        .bind(record.block.as_deref())
        .bind(record.coordinates.as_ref().map(Json))
        .bind(record.status)
        .bind(record.area)
        .bind(record.price)
        .bind(record.base_image_id)
        .bind(record.image_transform.as_ref())
        .bind(&record.features)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_constraint_error(
                e,
                |_| duplicate_plot_number(&record.plot_number),
                |_| AppError::invalid_field("baseImageId", "Imagem base não encontrada."),
            )
        })
    }

    pub async fn update_plot<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        record: &PlotRecord,
    ) -> Result<Option<Plot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Plot>(&format!(
            r#"
            UPDATE plots SET
                plot_number = $2, sector = $3, block = $4, coordinates = $5,
                status = $6, area = $7, price = $8, base_image_id = $9,
                image_transform = $10, features = $11, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {PLOT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&record.plot_number)
        .bind(record.sector.as_deref())
        .bind(record.block.as_deref())
        .bind(record.coordinates.as_ref().map(Json))
        .bind(record.status)
        .bind(record.area)
        .bind(record.price)
        .bind(record.base_image_id)
        .bind(record.image_transform.as_ref())
        .bind(&record.features)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            map_constraint_error(
                e,
                |_| duplicate_plot_number(&record.plot_number),
                |_| AppError::invalid_field("baseImageId", "Imagem base não encontrada."),
            )
        })
    }

    /// Exclusão lógica. Retorna false se o lote não existe ou já foi excluído.
    pub async fn soft_delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE plots SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn restore<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Plot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plot = sqlx::query_as::<_, Plot>(&format!(
            r#"
            UPDATE plots SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NOT NULL
            RETURNING {PLOT_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(plot)
    }

    /// UPSERT por número do lote. Campos ausentes na planilha preservam o
    /// valor atual; `features` é mesclado. Um lote excluído é restaurado.
    pub async fn upsert_imported<'e, E>(
        &self,
        executor: E,
        plot: &CanonicalPlot,
    ) -> Result<UpsertKind, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // `xmax = 0` só é verdadeiro para a linha recém-inserida
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO plots (plot_number, sector, block, status, area, price, features)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (plot_number) DO UPDATE SET
                sector = COALESCE(EXCLUDED.sector, plots.sector),
                block = COALESCE(EXCLUDED.block, plots.block),
                status = EXCLUDED.status,
                area = COALESCE(EXCLUDED.area, plots.area),
                price = COALESCE(EXCLUDED.price, plots.price),
                features = plots.features || EXCLUDED.features,
                deleted_at = NULL,
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&plot.plot_number)
        .bind(plot.sector.as_deref())
        .bind(plot.block.as_deref())
        .bind(plot.status)
        .bind(plot.area)
        .bind(plot.price)
        .bind(Value::Object(plot.features.clone()))
        .fetch_one(executor)
        .await?;

        Ok(if inserted {
            UpsertKind::Inserted
        } else {
            UpsertKind::Updated
        })
    }
}

#[async_trait]
impl PlotStore for PlotRepository {
    async fn upsert_plot(&self, plot: &CanonicalPlot) -> Result<UpsertKind, AppError> {
        self.upsert_imported(&self.pool, plot).await
    }
}
