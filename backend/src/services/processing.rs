//! Post-processing service: cleaning, color separation, final reception

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::lot::{fetch_lot, transition_lot};
use shared::workflow;
use shared::{
    CleaningMethod, CleaningRecord, ColorBuckets, ColorSeparationRecord, FinalGrade,
    FinalReception, Lot, LotEvent,
};

/// Service for the physical processing stages after analysis
#[derive(Clone)]
pub struct ProcessingService {
    db: PgPool,
}

/// Input for the cleaning stage
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningInput {
    pub method: CleaningMethod,
    pub responsible: String,
    pub impurity_weight_kg: Decimal,
    pub duration_minutes: Option<i32>,
    pub impurities_found: Option<String>,
}

/// Input for the color separation stage; bucket weights are hand-entered
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSeparationInput {
    pub responsible: String,
    pub separation_date: Option<NaiveDate>,
    pub overall_quality: String,
    pub buckets: ColorBuckets,
}

/// Input for final reception
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReceptionInput {
    pub responsible: String,
    pub reception_date: Option<NaiveDate>,
    pub final_grade: FinalGrade,
    pub observations: Option<String>,
}

/// Cleaning stage response with the weight accounting summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningResponse {
    pub record: CleaningRecord,
    pub summary: String,
    pub lot: Lot,
}

/// Color separation response; the warning is informational, never blocking
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSeparationResponse {
    pub record: ColorSeparationRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency_warning: Option<String>,
    pub lot: Lot,
}

/// Final reception response; the lot is terminal afterwards
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReceptionResponse {
    pub reception: FinalReception,
    pub lot: Lot,
}

impl ProcessingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Remove impurities from an approved or separated lot. The lot weight is
    /// reduced by the impurity weight and recorded as the final weight.
    pub async fn process_cleaning(
        &self,
        lot_id: Uuid,
        input: CleaningInput,
    ) -> AppResult<CleaningResponse> {
        if input.responsible.trim().is_empty() {
            return Err(AppError::ValidationError(
                "A responsible person is required".to_string(),
            ));
        }

        let lot = fetch_lot(&self.db, lot_id).await?;
        let next_state = lot
            .state
            .apply(LotEvent::CleaningCompleted)
            .map_err(|e| AppError::InvalidState(e.to_string()))?;

        let outcome = workflow::cleaning_outcome(lot.current_weight_kg(), input.impurity_weight_kg)?;

        let mut tx = self.db.begin().await?;
        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO cleaning_records (lot_id, method, responsible, impurity_weight_kg,
                                          weight_before_kg, weight_after_kg, duration_minutes,
                                          impurities_found)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, created_at
            "#,
        )
        .bind(lot_id)
        .bind(input.method.to_string())
        .bind(input.responsible.trim())
        .bind(input.impurity_weight_kg)
        .bind(outcome.weight_before_kg)
        .bind(outcome.final_weight_kg)
        .bind(input.duration_minutes)
        .bind(&input.impurities_found)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE lots SET final_weight_kg = $1, updated_at = now() WHERE id = $2")
            .bind(outcome.final_weight_kg)
            .bind(lot_id)
            .execute(&mut *tx)
            .await?;
        transition_lot(&mut tx, lot_id, lot.state, next_state).await?;
        tx.commit().await?;

        let summary = workflow::cleaning_summary(&outcome);
        tracing::info!(%lot_id, final_weight_kg = %outcome.final_weight_kg, "cleaning completed");

        let record = CleaningRecord {
            id,
            lot_id,
            method: input.method,
            responsible: input.responsible.trim().to_string(),
            impurity_weight_kg: input.impurity_weight_kg,
            weight_before_kg: outcome.weight_before_kg,
            weight_after_kg: outcome.final_weight_kg,
            duration_minutes: input.duration_minutes,
            impurities_found: input.impurities_found,
            created_at,
        };
        let lot = fetch_lot(&self.db, lot_id).await?;
        Ok(CleaningResponse {
            record,
            summary,
            lot,
        })
    }

    /// Classify the cleaned lot by bean color. Bucket weights that disagree
    /// with the lot weight beyond tolerance attach a warning but still save.
    pub async fn process_color_separation(
        &self,
        lot_id: Uuid,
        input: ColorSeparationInput,
    ) -> AppResult<ColorSeparationResponse> {
        if input.responsible.trim().is_empty() {
            return Err(AppError::ValidationError(
                "A responsible person is required".to_string(),
            ));
        }

        let lot = fetch_lot(&self.db, lot_id).await?;
        let next_state = lot
            .state
            .apply(LotEvent::ColorSeparationCompleted)
            .map_err(|e| AppError::InvalidState(e.to_string()))?;

        let warning = workflow::color_consistency_check(&input.buckets, lot.current_weight_kg());
        let separation_date = input.separation_date.unwrap_or_else(|| Utc::now().date_naive());
        let buckets_json = serde_json::to_value(&input.buckets)
            .map_err(|e| AppError::InternalError(e.into()))?;

        let mut tx = self.db.begin().await?;
        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO color_separation_records (lot_id, responsible, separation_date,
                                                  overall_quality, buckets, consistency_warning)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, created_at
            "#,
        )
        .bind(lot_id)
        .bind(input.responsible.trim())
        .bind(separation_date)
        .bind(input.overall_quality.trim())
        .bind(&buckets_json)
        .bind(&warning)
        .fetch_one(&mut *tx)
        .await?;
        transition_lot(&mut tx, lot_id, lot.state, next_state).await?;
        tx.commit().await?;

        if let Some(ref w) = warning {
            tracing::warn!(%lot_id, warning = %w, "color bucket weights inconsistent");
        }
        tracing::info!(%lot_id, "color separation completed");

        let record = ColorSeparationRecord {
            id,
            lot_id,
            responsible: input.responsible.trim().to_string(),
            separation_date,
            overall_quality: input.overall_quality.trim().to_string(),
            buckets: input.buckets,
            consistency_warning: warning.clone(),
            created_at,
        };
        let lot = fetch_lot(&self.db, lot_id).await?;
        Ok(ColorSeparationResponse {
            record,
            consistency_warning: warning,
            lot,
        })
    }

    /// Grade the lot and close its lifecycle. One reception per lot.
    pub async fn final_reception(
        &self,
        lot_id: Uuid,
        input: FinalReceptionInput,
    ) -> AppResult<FinalReceptionResponse> {
        if input.responsible.trim().is_empty() {
            return Err(AppError::ValidationError(
                "A responsible person is required".to_string(),
            ));
        }

        let lot = fetch_lot(&self.db, lot_id).await?;
        let next_state = lot
            .state
            .apply(LotEvent::ReceptionFinalized)
            .map_err(|e| AppError::InvalidState(e.to_string()))?;

        let reception_date = input.reception_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;
        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO final_receptions (lot_id, responsible, reception_date, final_grade,
                                          observations)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at
            "#,
        )
        .bind(lot_id)
        .bind(input.responsible.trim())
        .bind(reception_date)
        .bind(input.final_grade.as_str())
        .bind(&input.observations)
        .fetch_one(&mut *tx)
        .await?;
        transition_lot(&mut tx, lot_id, lot.state, next_state).await?;
        tx.commit().await?;

        tracing::info!(%lot_id, grade = %input.final_grade, "reception finalized");

        let reception = FinalReception {
            id,
            lot_id,
            responsible: input.responsible.trim().to_string(),
            reception_date,
            final_grade: input.final_grade,
            observations: input.observations,
            created_at,
        };
        let lot = fetch_lot(&self.db, lot_id).await?;
        Ok(FinalReceptionResponse { reception, lot })
    }

    /// Processing history for a lot: every cleaning and color record plus the
    /// reception, for stage summary views
    pub async fn processing_history(&self, lot_id: Uuid) -> AppResult<ProcessingHistory> {
        fetch_lot(&self.db, lot_id).await?;

        let cleanings = sqlx::query_as::<_, CleaningRow>(
            r#"
            SELECT id, lot_id, method, responsible, impurity_weight_kg, weight_before_kg,
                   weight_after_kg, duration_minutes, impurities_found, created_at
            FROM cleaning_records WHERE lot_id = $1 ORDER BY created_at
            "#,
        )
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(CleaningRecord::from)
        .collect();

        let color_rows = sqlx::query_as::<_, ColorRow>(
            r#"
            SELECT id, lot_id, responsible, separation_date, overall_quality, buckets,
                   consistency_warning, created_at
            FROM color_separation_records WHERE lot_id = $1 ORDER BY created_at
            "#,
        )
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;
        let mut color_separations = Vec::with_capacity(color_rows.len());
        for row in color_rows {
            color_separations.push(row.try_into()?);
        }

        let reception = sqlx::query_as::<_, ReceptionRow>(
            r#"
            SELECT id, lot_id, responsible, reception_date, final_grade, observations, created_at
            FROM final_receptions WHERE lot_id = $1
            "#,
        )
        .bind(lot_id)
        .fetch_optional(&self.db)
        .await?
        .map(FinalReception::try_from)
        .transpose()?;

        Ok(ProcessingHistory {
            cleanings,
            color_separations,
            reception,
        })
    }
}

/// All processing records for one lot
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingHistory {
    pub cleanings: Vec<CleaningRecord>,
    pub color_separations: Vec<ColorSeparationRecord>,
    pub reception: Option<FinalReception>,
}

#[derive(Debug, sqlx::FromRow)]
struct CleaningRow {
    id: Uuid,
    lot_id: Uuid,
    method: String,
    responsible: String,
    impurity_weight_kg: Decimal,
    weight_before_kg: Decimal,
    weight_after_kg: Decimal,
    duration_minutes: Option<i32>,
    impurities_found: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CleaningRow> for CleaningRecord {
    fn from(row: CleaningRow) -> Self {
        let method = match row.method.as_str() {
            "Manual" => CleaningMethod::Manual,
            "Mechanical" => CleaningMethod::Mechanical,
            "Densimetric" => CleaningMethod::Densimetric,
            other => CleaningMethod::Custom(other.to_string()),
        };
        CleaningRecord {
            id: row.id,
            lot_id: row.lot_id,
            method,
            responsible: row.responsible,
            impurity_weight_kg: row.impurity_weight_kg,
            weight_before_kg: row.weight_before_kg,
            weight_after_kg: row.weight_after_kg,
            duration_minutes: row.duration_minutes,
            impurities_found: row.impurities_found,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ColorRow {
    id: Uuid,
    lot_id: Uuid,
    responsible: String,
    separation_date: NaiveDate,
    overall_quality: String,
    buckets: serde_json::Value,
    consistency_warning: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ColorRow> for ColorSeparationRecord {
    type Error = AppError;

    fn try_from(row: ColorRow) -> Result<Self, Self::Error> {
        let buckets: ColorBuckets = serde_json::from_value(row.buckets)
            .map_err(|e| AppError::InternalError(e.into()))?;
        Ok(ColorSeparationRecord {
            id: row.id,
            lot_id: row.lot_id,
            responsible: row.responsible,
            separation_date: row.separation_date,
            overall_quality: row.overall_quality,
            buckets,
            consistency_warning: row.consistency_warning,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReceptionRow {
    id: Uuid,
    lot_id: Uuid,
    responsible: String,
    reception_date: NaiveDate,
    final_grade: String,
    observations: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReceptionRow> for FinalReception {
    type Error = AppError;

    fn try_from(row: ReceptionRow) -> Result<Self, Self::Error> {
        let final_grade = FinalGrade::from_str(row.final_grade.trim()).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "unknown final grade in database: {}",
                row.final_grade
            ))
        })?;
        Ok(FinalReception {
            id: row.id,
            lot_id: row.lot_id,
            responsible: row.responsible,
            reception_date: row.reception_date,
            final_grade,
            observations: row.observations,
            created_at: row.created_at,
        })
    }
}
