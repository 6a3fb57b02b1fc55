//! Lot workflow engine
//!
//! Pure functions over lot, entry, and sample state. Services load the rows,
//! call in here for every branching decision, and persist the outcome in a
//! single transaction; nothing in this module performs I/O.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{FieldViolation, WorkflowError, WorkflowResult};
use crate::models::{
    ColorBuckets, EntryView, Lot, LotEvent, Recommendation, RecommendationType, Sample,
    SampleOutcome, SampleState, SeparationPlan, SeparationReport, ReportTotals,
    MAX_SAMPLES_PER_ROUND,
};
use crate::models::sample_number;

/// Bucket weights entered by hand may drift from the lot weight; beyond this
/// tolerance the color separation stage attaches a warning
pub const COLOR_WEIGHT_TOLERANCE_KG: &str = "1.0";

// ============================================================================
// Sample selection
// ============================================================================

/// Pick a bounded subset of a lot's owner entries for physical sampling.
///
/// Selection order is significant: sample numbers M1..Mk follow it, and the
/// number is the only correlation between a sample and its owner.
pub fn select_samples(
    lot: &Lot,
    entries: &[EntryView],
    selected_entry_ids: &[Uuid],
    taken_at: DateTime<Utc>,
) -> WorkflowResult<(Vec<Sample>, LotEvent)> {
    lot.state
        .apply(LotEvent::SamplesSelected)
        .map_err(|e| WorkflowError::InvalidState(e.to_string()))?;

    let mut violations = Vec::new();
    if selected_entry_ids.is_empty() {
        violations.push(FieldViolation::new(
            "ownerEntryIds",
            "At least one owner entry must be selected for sampling",
            "Debe seleccionar al menos un propietario para el muestreo",
        ));
    }
    if selected_entry_ids.len() > MAX_SAMPLES_PER_ROUND {
        violations.push(FieldViolation::new(
            "ownerEntryIds",
            "At most 5 owner entries may be sampled per round",
            "Se pueden muestrear como máximo 5 propietarios por ronda",
        ));
    }
    for (i, id) in selected_entry_ids.iter().enumerate() {
        if selected_entry_ids[..i].contains(id) {
            violations.push(FieldViolation::new(
                "ownerEntryIds",
                &format!("Owner entry {} selected more than once", id),
                &format!("El propietario {} fue seleccionado más de una vez", id),
            ));
        }
        if !entries.iter().any(|e| e.entry_id == *id) {
            violations.push(FieldViolation::new(
                "ownerEntryIds",
                &format!("Owner entry {} does not belong to this lot", id),
                &format!("El propietario {} no pertenece a este lote", id),
            ));
        }
    }
    if !violations.is_empty() {
        return Err(WorkflowError::Validation(violations));
    }

    let samples = selected_entry_ids
        .iter()
        .enumerate()
        .map(|(i, entry_id)| Sample {
            id: Uuid::new_v4(),
            sample_number: sample_number(i + 1),
            lot_id: lot.id,
            owner_entry_id: *entry_id,
            round: 1,
            state: SampleState::Pending,
            taken_at,
            analysis_result: None,
            observations: None,
        })
        .collect();

    Ok((samples, LotEvent::SamplesSelected))
}

// ============================================================================
// Lab result processing
// ============================================================================

/// Outcome of recording one lab result
#[derive(Debug, Clone)]
pub struct ResultOutcome {
    /// The sample with its result applied
    pub sample: Sample,
    /// Lot transition triggered by this result, if any
    pub lot_event: Option<LotEvent>,
    /// True whenever any sample in the current round is contaminated;
    /// contamination is never immediately terminal for the owners involved
    pub requires_second_sampling: bool,
    /// Every contaminated sample of the lot, all rounds, after this result
    pub contaminated_samples: Vec<Sample>,
    pub separation_required: bool,
    /// Entries whose latest sample state is contaminated
    pub owners_to_separate: Vec<EntryView>,
    pub plan: Option<SeparationPlan>,
}

/// Record a pass/fail lab result for one sample.
///
/// A sample's result is write-once per round; repeating the call is rejected
/// even with the same outcome.
pub fn evaluate_sample_result(
    lot: &Lot,
    entries: &[EntryView],
    samples: &[Sample],
    sample_id: Uuid,
    outcome: SampleOutcome,
    analysis_result: Option<String>,
    observations: Option<String>,
) -> WorkflowResult<ResultOutcome> {
    let target = samples
        .iter()
        .find(|s| s.id == sample_id)
        .ok_or_else(|| WorkflowError::NotFound("Sample".to_string()))?;

    if target.state != SampleState::Pending {
        return Err(WorkflowError::InvalidState(format!(
            "sample {} already has a recorded result ({})",
            target.sample_number, target.state
        )));
    }

    let mut updated = target.clone();
    updated.state = outcome.into();
    updated.analysis_result = analysis_result;
    updated.observations = observations;

    // View of the lot's samples with this result applied
    let applied: Vec<Sample> = samples
        .iter()
        .map(|s| if s.id == sample_id { updated.clone() } else { s.clone() })
        .collect();

    let current_round = applied.iter().map(|s| s.round).max().unwrap_or(1);
    let round_contaminated = applied
        .iter()
        .any(|s| s.round == current_round && s.state == SampleState::Contaminated);
    let round_pending = applied
        .iter()
        .any(|s| s.round == current_round && s.state == SampleState::Pending);

    let owners_to_separate = contaminated_entries(entries, &applied);
    let contaminated_quintals: Decimal = owners_to_separate
        .iter()
        .map(|e| e.quintals_delivered)
        .sum();
    let separation_required = contaminated_quintals > Decimal::ZERO;

    let contaminated_samples: Vec<Sample> = applied
        .iter()
        .filter(|s| s.state == SampleState::Contaminated)
        .cloned()
        .collect();

    let lot_event = if round_contaminated {
        // Always offer re-verification before any final decision
        if separation_required && lot.state.apply(LotEvent::ContaminationConfirmed).is_ok() {
            Some(LotEvent::ContaminationConfirmed)
        } else {
            None
        }
    } else if round_pending {
        None
    } else if owners_to_separate.is_empty() {
        lot.state
            .apply(LotEvent::AllSamplesApproved)
            .ok()
            .map(|_| LotEvent::AllSamplesApproved)
    } else {
        // The round cleared, but entries it did not cover still carry a
        // contaminated result from an earlier round; the lot goes back to
        // awaiting a separation decision for those owners.
        lot.state
            .apply(LotEvent::ContaminationConfirmed)
            .ok()
            .map(|_| LotEvent::ContaminationConfirmed)
    };

    let plan = if separation_required {
        Some(compute_plan(lot, &owners_to_separate))
    } else {
        None
    };

    Ok(ResultOutcome {
        sample: updated,
        lot_event,
        requires_second_sampling: round_contaminated,
        contaminated_samples,
        separation_required,
        owners_to_separate,
        plan,
    })
}

/// Create a fresh sampling round restricted to previously contaminated
/// entries. Earlier rounds stay untouched as historical record.
pub fn second_sampling_round(
    lot: &Lot,
    samples: &[Sample],
    contaminated_sample_ids: &[Uuid],
    taken_at: DateTime<Utc>,
) -> WorkflowResult<(Vec<Sample>, LotEvent)> {
    if contaminated_sample_ids.is_empty() {
        return Err(WorkflowError::InvalidState(
            "second sampling requires at least one contaminated sample".to_string(),
        ));
    }

    lot.state
        .apply(LotEvent::SecondSamplingCreated)
        .map_err(|e| WorkflowError::InvalidState(e.to_string()))?;

    let mut entry_ids = Vec::with_capacity(contaminated_sample_ids.len());
    for id in contaminated_sample_ids {
        let sample = samples
            .iter()
            .find(|s| s.id == *id)
            .ok_or_else(|| WorkflowError::NotFound("Sample".to_string()))?;
        if sample.state != SampleState::Contaminated {
            return Err(WorkflowError::InvalidState(format!(
                "sample {} is not contaminated and cannot be re-verified",
                sample.sample_number
            )));
        }
        if entry_ids.contains(&sample.owner_entry_id) {
            return Err(WorkflowError::field(
                "contaminatedSampleIds",
                "Duplicate sample for the same owner entry",
                "Muestra duplicada para el mismo propietario",
            ));
        }
        entry_ids.push(sample.owner_entry_id);
    }

    let next_round = samples.iter().map(|s| s.round).max().unwrap_or(1) + 1;
    let new_samples = entry_ids
        .iter()
        .enumerate()
        .map(|(i, entry_id)| Sample {
            id: Uuid::new_v4(),
            sample_number: sample_number(i + 1),
            lot_id: lot.id,
            owner_entry_id: *entry_id,
            round: next_round,
            state: SampleState::Pending,
            taken_at,
            analysis_result: None,
            observations: None,
        })
        .collect();

    Ok((new_samples, LotEvent::SecondSamplingCreated))
}

/// Latest sample state for an entry across rounds; `None` when the entry has
/// never been sampled
pub fn latest_sample_state(entry_id: Uuid, samples: &[Sample]) -> Option<SampleState> {
    samples
        .iter()
        .filter(|s| s.owner_entry_id == entry_id)
        .max_by_key(|s| s.round)
        .map(|s| s.state)
}

fn contaminated_entries(entries: &[EntryView], samples: &[Sample]) -> Vec<EntryView> {
    entries
        .iter()
        .filter(|e| latest_sample_state(e.entry_id, samples) == Some(SampleState::Contaminated))
        .cloned()
        .collect()
}

// ============================================================================
// Separation planning
// ============================================================================

/// Clamp both percentages to [0, 100] and, when floating drift pushes their
/// sum past 100, rescale the pair so it sums to exactly 100
pub fn normalize_percentages(
    pct_contaminated: Decimal,
    pct_clean: Decimal,
) -> (Decimal, Decimal) {
    let hundred = Decimal::from(100);
    let clamp = |p: Decimal| p.max(Decimal::ZERO).min(hundred);
    let pc = clamp(pct_contaminated);
    let pl = clamp(pct_clean);
    let sum = pc + pl;
    if sum > hundred {
        let factor = hundred / sum;
        (pc * factor, pl * factor)
    } else {
        (pc, pl)
    }
}

/// Compute the clean/contaminated split for a lot. Pure function of its
/// inputs; rounding to one decimal happens only at display time.
pub fn compute_plan(lot: &Lot, contaminated_owners: &[EntryView]) -> SeparationPlan {
    let contaminated_quintals: Decimal = contaminated_owners
        .iter()
        .map(|e| e.quintals_delivered)
        .sum();
    let clean_quintals = (lot.declared_quintals - contaminated_quintals).max(Decimal::ZERO);

    let hundred = Decimal::from(100);
    let (pct_contaminated, mut pct_clean) = if lot.declared_quintals.is_zero() {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        normalize_percentages(
            contaminated_quintals / lot.declared_quintals * hundred,
            clean_quintals / lot.declared_quintals * hundred,
        )
    };
    // An exact quintal partition pins the percentages to an exact 100 split
    if !lot.declared_quintals.is_zero()
        && contaminated_quintals + clean_quintals == lot.declared_quintals
    {
        pct_clean = hundred - pct_contaminated;
    }

    SeparationPlan {
        lot_id: lot.id,
        contaminated_quintals,
        clean_quintals,
        contaminated_owners: contaminated_owners.to_vec(),
        pct_contaminated,
        pct_clean,
    }
}

/// Partition all owner entries of a lot into approved, contaminated, and
/// pending-analysis buckets by each entry's latest sample state. The bucket
/// quintals sum exactly to the lot's declared quintals.
///
/// Sampling covers a bounded subset of entries, so entries never sampled
/// inherit the lot-level outcome once analysis has concluded clean; while
/// analysis is open they stay pending.
pub fn build_separation_report(
    lot: &Lot,
    entries: &[EntryView],
    samples: &[Sample],
) -> SeparationReport {
    let analysis_concluded_clean = matches!(
        lot.state,
        crate::models::LotState::Approved
            | crate::models::LotState::Clean
            | crate::models::LotState::Finalized
    );

    let mut approved = Vec::new();
    let mut contaminated = Vec::new();
    let mut pending = Vec::new();

    for entry in entries {
        match latest_sample_state(entry.entry_id, samples) {
            Some(SampleState::Approved) => approved.push(entry.clone()),
            Some(SampleState::Contaminated) => contaminated.push(entry.clone()),
            Some(SampleState::Pending) => pending.push(entry.clone()),
            None if analysis_concluded_clean => approved.push(entry.clone()),
            None => pending.push(entry.clone()),
        }
    }

    let sum = |bucket: &[EntryView]| -> Decimal {
        bucket.iter().map(|e| e.quintals_delivered).sum()
    };
    let totals = ReportTotals {
        approved_quintals: sum(&approved),
        contaminated_quintals: sum(&contaminated),
        pending_quintals: sum(&pending),
        total_lot: lot.declared_quintals,
    };

    let recommendation = recommend(&totals, lot.declared_quintals);

    SeparationReport {
        lot_id: lot.id,
        totals,
        recommendation,
        approved_owners: approved,
        contaminated_owners: contaminated,
        pending_owners: pending,
    }
}

fn recommend(totals: &ReportTotals, declared: Decimal) -> Recommendation {
    let (kind, message) = if totals.pending_quintals > Decimal::ZERO {
        (
            RecommendationType::AwaitingAnalysis,
            "Some deliveries are still awaiting lab analysis".to_string(),
        )
    } else if totals.contaminated_quintals.is_zero() {
        (
            RecommendationType::FullApproval,
            "All deliveries approved; the full lot can proceed to cleaning".to_string(),
        )
    } else if totals.contaminated_quintals >= declared {
        (
            RecommendationType::FullRejection,
            "Every delivery is contaminated; the lot cannot be salvaged".to_string(),
        )
    } else {
        (
            RecommendationType::PartialSeparation,
            format!(
                "Separate {} contaminated quintals to salvage {} clean quintals",
                totals.contaminated_quintals, totals.approved_quintals
            ),
        )
    };
    Recommendation { kind, message }
}

// ============================================================================
// Post-processing stage math
// ============================================================================

/// Weight accounting produced by the cleaning stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleaningOutcome {
    pub weight_before_kg: Decimal,
    pub final_weight_kg: Decimal,
    pub impurity_pct: Decimal,
}

/// Compute the post-cleaning weight. The impurity weight may not exceed the
/// current lot weight.
pub fn cleaning_outcome(
    current_weight_kg: Decimal,
    impurity_weight_kg: Decimal,
) -> WorkflowResult<CleaningOutcome> {
    let mut violations = Vec::new();
    if impurity_weight_kg < Decimal::ZERO {
        violations.push(FieldViolation::new(
            "impurityWeightKg",
            "Impurity weight cannot be negative",
            "El peso de impurezas no puede ser negativo",
        ));
    }
    if current_weight_kg - impurity_weight_kg < Decimal::ZERO {
        violations.push(FieldViolation::new(
            "impurityWeightKg",
            "Impurity weight exceeds the current lot weight",
            "El peso de impurezas excede el peso actual del lote",
        ));
    }
    if !violations.is_empty() {
        return Err(WorkflowError::Validation(violations));
    }

    let final_weight_kg = current_weight_kg - impurity_weight_kg;
    let impurity_pct = if current_weight_kg.is_zero() {
        Decimal::ZERO
    } else {
        impurity_weight_kg / current_weight_kg * Decimal::from(100)
    };

    Ok(CleaningOutcome {
        weight_before_kg: current_weight_kg,
        final_weight_kg,
        impurity_pct,
    })
}

/// Flag a warning when the hand-entered bucket weights disagree with the lot
/// weight by more than the tolerance
pub fn color_consistency_check(buckets: &ColorBuckets, final_weight_kg: Decimal) -> Option<String> {
    let tolerance: Decimal = COLOR_WEIGHT_TOLERANCE_KG.parse().unwrap_or(Decimal::ONE);
    let diff = (buckets.total_weight_kg() - final_weight_kg).abs();
    if diff > tolerance {
        Some(format!(
            "Color bucket weights ({} kg) differ from the lot weight ({} kg) by {} kg",
            buckets.total_weight_kg(),
            final_weight_kg,
            diff
        ))
    } else {
        None
    }
}

/// Human-readable cleaning summary, a read-only projection of stored fields
pub fn cleaning_summary(outcome: &CleaningOutcome) -> String {
    format!(
        "Weight before: {} kg, after: {} kg, impurities removed: {} kg ({}%)",
        outcome.weight_before_kg,
        outcome.final_weight_kg,
        outcome.weight_before_kg - outcome.final_weight_kg,
        outcome.impurity_pct.round_dp(1)
    )
}
