//! Sampling service: selection rounds and lab result recording
//!
//! All branching decisions live in `shared::workflow`; this service loads the
//! rows, calls the engine, and persists the outcome in one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::lot::{fetch_entry_views, fetch_lot, transition_lot};
use shared::workflow;
use shared::{EntryView, Sample, SampleOutcome, SampleState, SeparationPlan};

/// Service for sample selection and lab results
#[derive(Clone)]
pub struct SampleService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct SampleRow {
    id: Uuid,
    lot_id: Uuid,
    owner_entry_id: Uuid,
    sample_number: String,
    round: i32,
    state: String,
    taken_at: DateTime<Utc>,
    analysis_result: Option<String>,
    observations: Option<String>,
}

impl TryFrom<SampleRow> for Sample {
    type Error = AppError;

    fn try_from(row: SampleRow) -> Result<Self, Self::Error> {
        let state = SampleState::from_str(&row.state).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "unknown sample state in database: {}",
                row.state
            ))
        })?;
        Ok(Sample {
            id: row.id,
            sample_number: row.sample_number,
            lot_id: row.lot_id,
            owner_entry_id: row.owner_entry_id,
            round: row.round,
            state,
            taken_at: row.taken_at,
            analysis_result: row.analysis_result,
            observations: row.observations,
        })
    }
}

const SAMPLE_COLUMNS: &str = "id, lot_id, owner_entry_id, sample_number, round, state, taken_at, analysis_result, observations";

/// Input for selecting samples on a pending lot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectSamplesInput {
    pub owner_entry_ids: Vec<Uuid>,
    pub taken_at: Option<DateTime<Utc>>,
}

/// Input for recording one lab result
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResultInput {
    pub outcome: SampleOutcome,
    pub analysis_result: Option<String>,
    pub observations: Option<String>,
}

/// Input for opening a re-verification round
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondSamplingInput {
    pub contaminated_sample_ids: Vec<Uuid>,
    pub taken_at: Option<DateTime<Utc>>,
}

/// Response after recording a lab result; the separation fields appear only
/// when contamination was found
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResultResponse {
    pub message: String,
    pub sample: Sample,
    pub requires_second_sampling: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contaminated_samples: Option<Vec<Sample>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separation_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners_to_separate: Option<Vec<EntryView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separation_plan: Option<SeparationPlan>,
}

impl SampleService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Select up to five owner entries of a pending lot for physical sampling
    pub async fn select_samples(
        &self,
        lot_id: Uuid,
        input: SelectSamplesInput,
    ) -> AppResult<Vec<Sample>> {
        let lot = fetch_lot(&self.db, lot_id).await?;
        let entries = fetch_entry_views(&self.db, lot_id).await?;
        let taken_at = input.taken_at.unwrap_or_else(Utc::now);

        let (samples, event) =
            workflow::select_samples(&lot, &entries, &input.owner_entry_ids, taken_at)?;
        let next_state = lot
            .state
            .apply(event)
            .map_err(|e| AppError::InvalidState(e.to_string()))?;

        let mut tx = self.db.begin().await?;
        for sample in &samples {
            insert_sample(&mut tx, sample).await?;
        }
        transition_lot(&mut tx, lot_id, lot.state, next_state).await?;
        tx.commit().await?;

        tracing::info!(%lot_id, count = samples.len(), "samples selected");
        Ok(samples)
    }

    /// Record a pass/fail lab result for one sample.
    ///
    /// The write is guarded in the database as well: a sample row only takes a
    /// result while still pending, so a duplicate submission racing this one
    /// loses cleanly.
    pub async fn record_result(
        &self,
        sample_id: Uuid,
        input: RecordResultInput,
    ) -> AppResult<SampleResultResponse> {
        let lot_id = sqlx::query_scalar::<_, Uuid>("SELECT lot_id FROM samples WHERE id = $1")
            .bind(sample_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Sample".to_string()))?;

        let lot = fetch_lot(&self.db, lot_id).await?;
        let entries = fetch_entry_views(&self.db, lot_id).await?;
        let samples = fetch_samples(&self.db, lot_id).await?;

        let outcome = workflow::evaluate_sample_result(
            &lot,
            &entries,
            &samples,
            sample_id,
            input.outcome,
            input.analysis_result,
            input.observations,
        )?;

        let mut tx = self.db.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE samples
            SET state = $1, analysis_result = $2, observations = $3
            WHERE id = $4 AND state = 'pending'
            "#,
        )
        .bind(outcome.sample.state.as_str())
        .bind(&outcome.sample.analysis_result)
        .bind(&outcome.sample.observations)
        .bind(sample_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() != 1 {
            return Err(AppError::InvalidState(format!(
                "sample {} already has a recorded result",
                outcome.sample.sample_number
            )));
        }

        if let Some(event) = outcome.lot_event {
            let next_state = lot
                .state
                .apply(event)
                .map_err(|e| AppError::InvalidState(e.to_string()))?;
            transition_lot(&mut tx, lot_id, lot.state, next_state).await?;
        }
        tx.commit().await?;

        tracing::info!(
            %lot_id,
            sample = %outcome.sample.sample_number,
            result = %outcome.sample.state,
            "lab result recorded"
        );

        let message = if outcome.separation_required {
            if outcome.sample.state == SampleState::Contaminated {
                format!(
                    "Contamination recorded for sample {}; re-verification is available before separation",
                    outcome.sample.sample_number
                )
            } else {
                format!(
                    "Sample {} approved; earlier contamination still requires separation",
                    outcome.sample.sample_number
                )
            }
        } else if outcome.lot_event == Some(shared::LotEvent::AllSamplesApproved) {
            "All samples approved; the lot can proceed to cleaning".to_string()
        } else {
            format!("Result recorded for sample {}", outcome.sample.sample_number)
        };

        let contaminated = outcome.separation_required;
        Ok(SampleResultResponse {
            message,
            sample: outcome.sample,
            requires_second_sampling: outcome.requires_second_sampling,
            contaminated_samples: contaminated.then_some(outcome.contaminated_samples),
            separation_required: contaminated.then_some(outcome.separation_required),
            owners_to_separate: contaminated.then_some(outcome.owners_to_separate),
            separation_plan: outcome.plan,
        })
    }

    /// Open a re-verification round for previously contaminated samples
    pub async fn create_second_sampling(
        &self,
        lot_id: Uuid,
        input: SecondSamplingInput,
    ) -> AppResult<Vec<Sample>> {
        let lot = fetch_lot(&self.db, lot_id).await?;
        let samples = fetch_samples(&self.db, lot_id).await?;
        let taken_at = input.taken_at.unwrap_or_else(Utc::now);

        let (new_samples, event) = workflow::second_sampling_round(
            &lot,
            &samples,
            &input.contaminated_sample_ids,
            taken_at,
        )?;
        let next_state = lot
            .state
            .apply(event)
            .map_err(|e| AppError::InvalidState(e.to_string()))?;

        let mut tx = self.db.begin().await?;
        for sample in &new_samples {
            insert_sample(&mut tx, sample).await?;
        }
        transition_lot(&mut tx, lot_id, lot.state, next_state).await?;
        tx.commit().await?;

        tracing::info!(%lot_id, round = new_samples[0].round, "re-verification round opened");
        Ok(new_samples)
    }
}

async fn insert_sample(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    sample: &Sample,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO samples (id, lot_id, owner_entry_id, sample_number, round, state, taken_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(sample.id)
    .bind(sample.lot_id)
    .bind(sample.owner_entry_id)
    .bind(&sample.sample_number)
    .bind(sample.round)
    .bind(sample.state.as_str())
    .bind(sample.taken_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Load every sample of a lot across all rounds, in round and number order
pub(crate) async fn fetch_samples(db: &PgPool, lot_id: Uuid) -> AppResult<Vec<Sample>> {
    let rows = sqlx::query_as::<_, SampleRow>(&format!(
        "SELECT {} FROM samples WHERE lot_id = $1 ORDER BY round, sample_number",
        SAMPLE_COLUMNS
    ))
    .bind(lot_id)
    .fetch_all(db)
    .await?;

    rows.into_iter().map(Sample::try_from).collect()
}
