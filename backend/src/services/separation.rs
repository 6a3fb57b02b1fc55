//! Separation service: reports, salvage plan application, and rejection
//!
//! Plans and reports are derived on demand from entry and sample state; the
//! lot state column is the only thing these operations write.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::lot::{fetch_entry_views, fetch_lot, transition_lot};
use crate::services::sample::fetch_samples;
use shared::workflow;
use shared::{
    EntryView, Lot, LotEvent, Recommendation, ReportTotals, SeparationPlan, SeparationReport,
};

/// Service for separation planning and lot rejection
#[derive(Clone)]
pub struct SeparationService {
    db: PgPool,
}

/// Input for rejecting a lot outright
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectLotInput {
    pub reason: String,
}

/// Report payload: the lot embedded alongside its derived owner partition
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeparationReportResponse {
    pub lot: Lot,
    pub totals: ReportTotals,
    pub recommendation: Recommendation,
    pub approved_owners: Vec<EntryView>,
    pub contaminated_owners: Vec<EntryView>,
    pub pending_owners: Vec<EntryView>,
}

impl SeparationReportResponse {
    fn new(lot: Lot, report: SeparationReport) -> Self {
        Self {
            lot,
            totals: report.totals,
            recommendation: report.recommendation,
            approved_owners: report.approved_owners,
            contaminated_owners: report.contaminated_owners,
            pending_owners: report.pending_owners,
        }
    }
}

impl SeparationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Build the owner partition report for a lot, any state
    pub async fn separation_report(&self, lot_id: Uuid) -> AppResult<SeparationReportResponse> {
        let lot = fetch_lot(&self.db, lot_id).await?;
        let entries = fetch_entry_views(&self.db, lot_id).await?;
        let samples = fetch_samples(&self.db, lot_id).await?;
        let report = workflow::build_separation_report(&lot, &entries, &samples);
        Ok(SeparationReportResponse::new(lot, report))
    }

    /// Commit to the salvage plan instead of re-verifying. The plan itself is
    /// recomputed from current sample state, never trusted from the client.
    pub async fn apply_separation(&self, lot_id: Uuid) -> AppResult<(Lot, SeparationPlan)> {
        let lot = fetch_lot(&self.db, lot_id).await?;
        let entries = fetch_entry_views(&self.db, lot_id).await?;
        let samples = fetch_samples(&self.db, lot_id).await?;

        let contaminated: Vec<_> = entries
            .iter()
            .filter(|e| {
                workflow::latest_sample_state(e.entry_id, &samples)
                    == Some(shared::SampleState::Contaminated)
            })
            .cloned()
            .collect();
        if contaminated.is_empty() {
            return Err(AppError::InvalidState(
                "no contaminated deliveries to separate".to_string(),
            ));
        }

        let next_state = lot
            .state
            .apply(LotEvent::SeparationPlanApplied)
            .map_err(|e| AppError::InvalidState(e.to_string()))?;
        let plan = workflow::compute_plan(&lot, &contaminated);

        let mut tx = self.db.begin().await?;
        transition_lot(&mut tx, lot_id, lot.state, next_state).await?;
        tx.commit().await?;

        tracing::info!(
            %lot_id,
            contaminated_quintals = %plan.contaminated_quintals,
            clean_quintals = %plan.clean_quintals,
            "separation plan applied"
        );

        let lot = fetch_lot(&self.db, lot_id).await?;
        Ok((lot, plan))
    }

    /// Confirm the physical split was executed at the plant
    pub async fn complete_separation(&self, lot_id: Uuid) -> AppResult<Lot> {
        let lot = fetch_lot(&self.db, lot_id).await?;
        let next_state = lot
            .state
            .apply(LotEvent::SeparationCompleted)
            .map_err(|e| AppError::InvalidState(e.to_string()))?;

        let mut tx = self.db.begin().await?;
        transition_lot(&mut tx, lot_id, lot.state, next_state).await?;
        tx.commit().await?;

        tracing::info!(%lot_id, "physical separation completed");
        fetch_lot(&self.db, lot_id).await
    }

    /// Reject a lot outright; an administrative decision, only available
    /// while analysis or separation is still open
    pub async fn reject_lot(&self, lot_id: Uuid, input: RejectLotInput) -> AppResult<Lot> {
        if input.reason.trim().is_empty() {
            return Err(AppError::ValidationError(
                "A rejection reason is required".to_string(),
            ));
        }

        let lot = fetch_lot(&self.db, lot_id).await?;
        let next_state = lot
            .state
            .apply(LotEvent::LotRejected)
            .map_err(|e| AppError::InvalidState(e.to_string()))?;

        let mut tx = self.db.begin().await?;
        transition_lot(&mut tx, lot_id, lot.state, next_state).await?;
        sqlx::query(
            r#"
            UPDATE lots
            SET observations = COALESCE(observations || E'\n', '') || $1, updated_at = now()
            WHERE id = $2
            "#,
        )
        .bind(format!("Rejected: {}", input.reason.trim()))
        .bind(lot_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::warn!(%lot_id, reason = %input.reason.trim(), "lot rejected");
        fetch_lot(&self.db, lot_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shared::LotState;

    fn lot() -> Lot {
        let declared = Decimal::from(100);
        Lot {
            id: Uuid::new_v4(),
            code: "LOTE-2026-0007".to_string(),
            organization_id: Uuid::new_v4(),
            harvest_date: chrono::NaiveDate::from_ymd_opt(2026, 6, 2).unwrap(),
            delivery_date: Utc::now(),
            declared_quintals: declared,
            initial_weight_kg: shared::quintals_to_kg(declared),
            final_weight_kg: None,
            state: LotState::InProcess,
            weight_observations: None,
            observations: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn report_response_embeds_the_lot() {
        let lot = lot();
        let report = workflow::build_separation_report(&lot, &[], &[]);
        let response = SeparationReportResponse::new(lot.clone(), report);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["lot"]["id"], serde_json::json!(lot.id));
        for key in [
            "totals",
            "recommendation",
            "approvedOwners",
            "contaminatedOwners",
            "pendingOwners",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(json["totals"]["totalLot"], serde_json::json!(lot.declared_quintals));
    }
}
