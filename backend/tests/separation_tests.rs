//! Separation planning and reporting tests
//!
//! Property-based and unit tests for:
//! - Percentage normalization bounds
//! - Plan quintal accounting
//! - Report partition summing exactly to the lot total
//! - Full workflow scenarios (clean lot, contamination with re-verification)

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::workflow::{
    build_separation_report, compute_plan, evaluate_sample_result, normalize_percentages,
    second_sampling_round, select_samples,
};
use shared::{EntryView, Lot, LotState, RecommendationType, Sample, SampleOutcome};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn entry(quintals: Decimal) -> EntryView {
    EntryView {
        entry_id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        full_name: "Carmen Yupanqui".to_string(),
        national_id: "0926687856".to_string(),
        quintals_delivered: quintals,
    }
}

fn lot(declared: Decimal, state: LotState) -> Lot {
    Lot {
        id: Uuid::new_v4(),
        code: "LOTE-2026-0087".to_string(),
        organization_id: Uuid::new_v4(),
        harvest_date: chrono::NaiveDate::from_ymd_opt(2026, 7, 3).unwrap(),
        delivery_date: Utc::now(),
        declared_quintals: declared,
        initial_weight_kg: shared::quintals_to_kg(declared),
        final_weight_kg: None,
        state,
        weight_observations: None,
        observations: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Normalized percentages are each within [0, 100] and never sum past 100
    #[test]
    fn property_normalized_percentages_bounded(
        pc_raw in -50i64..250,
        pl_raw in -50i64..250,
    ) {
        let (pc, pl) = normalize_percentages(Decimal::from(pc_raw), Decimal::from(pl_raw));
        let hundred = Decimal::from(100);
        let eps = dec("0.000001");

        prop_assert!(pc >= Decimal::ZERO && pc <= hundred);
        prop_assert!(pl >= Decimal::ZERO && pl <= hundred);
        prop_assert!(pc + pl <= hundred + eps);
    }

    /// When the contaminated quintals partition the lot exactly, the plan's
    /// percentages sum to exactly 100 and the quintals account for the total
    #[test]
    fn property_exact_partition_sums_to_hundred(
        contaminated in 1u32..99,
        total in 100u32..1000,
    ) {
        let declared = Decimal::from(total);
        let l = lot(declared, LotState::SeparationPending);
        let owners = vec![entry(Decimal::from(contaminated))];

        let plan = compute_plan(&l, &owners);

        prop_assert_eq!(
            plan.contaminated_quintals + plan.clean_quintals,
            declared
        );
        prop_assert_eq!(plan.pct_contaminated + plan.pct_clean, Decimal::from(100));
    }

    /// Report buckets always sum exactly to the lot total when the entries do
    #[test]
    fn property_report_buckets_sum_to_total(
        split in 1u32..99,
        total in 100u32..500,
    ) {
        let declared = Decimal::from(total);
        let l = lot(declared, LotState::InProcess);
        let entries = vec![
            entry(Decimal::from(split)),
            entry(Decimal::from(total - split)),
        ];

        let report = build_separation_report(&l, &entries, &[]);
        let t = &report.totals;

        prop_assert_eq!(
            t.approved_quintals + t.contaminated_quintals + t.pending_quintals,
            t.total_lot
        );
    }
}

// ============================================================================
// Unit Tests: plan
// ============================================================================

#[test]
fn test_plan_quintals_and_display_percentages() {
    let l = lot(dec("100"), LotState::SeparationPending);
    let owners = vec![entry(dec("33.333"))];

    let plan = compute_plan(&l, &owners);

    assert_eq!(plan.contaminated_quintals, dec("33.333"));
    assert_eq!(plan.clean_quintals, dec("66.667"));
    let (pc, pl) = plan.display_percentages();
    assert_eq!(pc, dec("33.3"));
    assert_eq!(pl, dec("66.7"));
}

#[test]
fn test_plan_clamps_over_delivered_contamination() {
    // Entries exceeding the declared total never yield negative clean quintals
    let l = lot(dec("50"), LotState::SeparationPending);
    let owners = vec![entry(dec("60"))];

    let plan = compute_plan(&l, &owners);

    assert_eq!(plan.clean_quintals, Decimal::ZERO);
    assert!(plan.pct_contaminated <= Decimal::from(100));
}

// ============================================================================
// Unit Tests: report recommendations
// ============================================================================

#[test]
fn test_report_awaiting_analysis_while_unsampled() {
    let l = lot(dec("100"), LotState::Pending);
    let entries = vec![entry(dec("100"))];
    let report = build_separation_report(&l, &entries, &[]);
    assert_eq!(
        report.recommendation.kind,
        RecommendationType::AwaitingAnalysis
    );
    assert_eq!(report.pending_owners.len(), 1);
}

#[test]
fn test_report_recommendations_follow_partition() {
    let l = lot(dec("100"), LotState::Pending);
    let entries = vec![entry(dec("60")), entry(dec("40"))];
    let selected: Vec<Uuid> = entries.iter().map(|e| e.entry_id).collect();
    let (samples, _) = select_samples(&l, &entries, &selected, Utc::now()).unwrap();
    let l = relabel(&l, LotState::InProcess);

    // All approved -> full approval
    let all_approved = record_all(&l, &entries, samples.clone(), SampleOutcome::Approved);
    let report = build_separation_report(&l, &entries, &all_approved);
    assert_eq!(report.recommendation.kind, RecommendationType::FullApproval);

    // All contaminated -> full rejection
    let all_bad = record_all(&l, &entries, samples.clone(), SampleOutcome::Contaminated);
    let report = build_separation_report(&l, &entries, &all_bad);
    assert_eq!(report.recommendation.kind, RecommendationType::FullRejection);

    // Mixed -> partial separation
    let mut mixed = samples;
    let r = evaluate_sample_result(
        &l,
        &entries,
        &mixed,
        mixed[0].id,
        SampleOutcome::Approved,
        None,
        None,
    )
    .unwrap();
    mixed[0] = r.sample;
    let r = evaluate_sample_result(
        &l,
        &entries,
        &mixed,
        mixed[1].id,
        SampleOutcome::Contaminated,
        None,
        None,
    )
    .unwrap();
    mixed[1] = r.sample;
    let report = build_separation_report(&l, &entries, &mixed);
    assert_eq!(
        report.recommendation.kind,
        RecommendationType::PartialSeparation
    );
    assert_eq!(report.totals.approved_quintals, dec("60"));
    assert_eq!(report.totals.contaminated_quintals, dec("40"));
}

#[test]
fn test_plan_for_single_contaminated_owner_of_three() {
    // 100 qq lot split 40/35/25; the 40 qq owner is contaminated
    let l = lot(dec("100"), LotState::SeparationPending);
    let owners = vec![entry(dec("40"))];

    let plan = compute_plan(&l, &owners);

    assert_eq!(plan.contaminated_quintals, dec("40"));
    assert_eq!(plan.clean_quintals, dec("60"));
    assert_eq!(plan.pct_contaminated + plan.pct_clean, Decimal::from(100));
    let (pc, pl) = plan.display_percentages();
    assert_eq!(pc, dec("40.0"));
    assert_eq!(pl, dec("60.0"));
}

// ============================================================================
// Workflow scenarios
// ============================================================================

/// Clean lot end to end: selection, all approvals, lot approved
#[test]
fn test_scenario_clean_lot_reaches_approved() {
    let l = lot(dec("100"), LotState::Pending);
    let entries = vec![entry(dec("50")), entry(dec("30")), entry(dec("20"))];
    let selected: Vec<Uuid> = entries.iter().map(|e| e.entry_id).collect();

    let (mut samples, event) = select_samples(&l, &entries, &selected, Utc::now()).unwrap();
    let mut state = l.state.apply(event).unwrap();
    assert_eq!(state, LotState::InProcess);

    let l = relabel(&l, state);
    for i in 0..samples.len() {
        let r = evaluate_sample_result(
            &l,
            &entries,
            &samples,
            samples[i].id,
            SampleOutcome::Approved,
            None,
            None,
        )
        .unwrap();
        samples[i] = r.sample;
        if let Some(e) = r.lot_event {
            state = state.apply(e).unwrap();
        }
    }
    assert_eq!(state, LotState::Approved);
}

/// Partial contamination and its re-verification, on a 100 qq lot delivered
/// 40/35/25 with the first two owners sampled
#[test]
fn test_scenario_partial_contamination_then_cleared() {
    let l = lot(dec("100"), LotState::Pending);
    let entries = vec![entry(dec("40")), entry(dec("35")), entry(dec("25"))];
    let selected = vec![entries[0].entry_id, entries[1].entry_id];

    let (mut samples, event) = select_samples(&l, &entries, &selected, Utc::now()).unwrap();
    let mut state = l.state.apply(event).unwrap();

    // Owner 1 contaminated
    let l1 = relabel(&l, state);
    let r = evaluate_sample_result(
        &l1,
        &entries,
        &samples,
        samples[0].id,
        SampleOutcome::Contaminated,
        Some("Mold detected".to_string()),
        None,
    )
    .unwrap();
    samples[0] = r.sample;
    assert!(r.requires_second_sampling);
    assert!(r.separation_required);
    assert_eq!(r.owners_to_separate.len(), 1);
    assert_eq!(r.owners_to_separate[0].entry_id, entries[0].entry_id);
    let plan = r.plan.unwrap();
    assert_eq!(plan.contaminated_quintals, dec("40"));
    assert_eq!(plan.clean_quintals, dec("60"));
    let (pc, pl) = plan.display_percentages();
    assert_eq!(pc, dec("40.0"));
    assert_eq!(pl, dec("60.0"));
    state = state.apply(r.lot_event.unwrap()).unwrap();
    assert_eq!(state, LotState::SeparationPending);

    // Owner 2 approved; contamination in the round still stands
    let l2 = relabel(&l, state);
    let r = evaluate_sample_result(
        &l2,
        &entries,
        &samples,
        samples[1].id,
        SampleOutcome::Approved,
        None,
        None,
    )
    .unwrap();
    samples[1] = r.sample;
    assert!(r.requires_second_sampling);
    assert_eq!(r.lot_event, None);

    // Re-verification for owner 1 only; the second round passes
    let (round_two, event) =
        second_sampling_round(&l2, &samples, &[samples[0].id], Utc::now()).unwrap();
    state = state.apply(event).unwrap();
    samples.extend(round_two);
    let l3 = relabel(&l, state);
    let last = samples.len() - 1;
    let r = evaluate_sample_result(
        &l3,
        &entries,
        &samples,
        samples[last].id,
        SampleOutcome::Approved,
        None,
        None,
    )
    .unwrap();
    samples[last] = r.sample;
    state = state.apply(r.lot_event.unwrap()).unwrap();
    assert_eq!(state, LotState::Approved);

    // With analysis concluded clean, the never-sampled owner counts approved
    let report = build_separation_report(&relabel(&l, state), &entries, &samples);
    assert_eq!(report.totals.approved_quintals, dec("100"));
    assert_eq!(report.totals.contaminated_quintals, Decimal::ZERO);
    assert_eq!(report.totals.pending_quintals, Decimal::ZERO);
    assert_eq!(report.recommendation.kind, RecommendationType::FullApproval);
}

/// Contaminated owner cleared on re-verification: the lot loops back through
/// analysis and ends approved with no one left to separate
#[test]
fn test_scenario_reverification_clears_contamination() {
    let l = lot(dec("100"), LotState::Pending);
    let entries = vec![entry(dec("70")), entry(dec("30"))];
    let selected: Vec<Uuid> = entries.iter().map(|e| e.entry_id).collect();

    let (mut samples, event) = select_samples(&l, &entries, &selected, Utc::now()).unwrap();
    let mut state = l.state.apply(event).unwrap();

    // Round 1: M1 approved, M2 contaminated
    let l1 = relabel(&l, state);
    let r = evaluate_sample_result(
        &l1,
        &entries,
        &samples,
        samples[0].id,
        SampleOutcome::Approved,
        None,
        None,
    )
    .unwrap();
    samples[0] = r.sample;
    let r = evaluate_sample_result(
        &l1,
        &entries,
        &samples,
        samples[1].id,
        SampleOutcome::Contaminated,
        None,
        None,
    )
    .unwrap();
    samples[1] = r.sample;
    assert!(r.requires_second_sampling);
    state = state.apply(r.lot_event.unwrap()).unwrap();
    assert_eq!(state, LotState::SeparationPending);
    let plan = r.plan.unwrap();
    assert_eq!(plan.contaminated_quintals, dec("30"));

    // Round 2 for the contaminated owner only
    let l2 = relabel(&l, state);
    let (round_two, event) =
        second_sampling_round(&l2, &samples, &[samples[1].id], Utc::now()).unwrap();
    state = state.apply(event).unwrap();
    assert_eq!(state, LotState::InProcess);
    samples.extend(round_two);

    // The re-verified sample passes; the round-2 view wins for its owner
    let l3 = relabel(&l, state);
    let last = samples.len() - 1;
    let r = evaluate_sample_result(
        &l3,
        &entries,
        &samples,
        samples[last].id,
        SampleOutcome::Approved,
        None,
        None,
    )
    .unwrap();
    samples[last] = r.sample;

    assert!(r.owners_to_separate.is_empty());
    assert!(!r.separation_required);
    state = state.apply(r.lot_event.unwrap()).unwrap();
    assert_eq!(state, LotState::Approved);
}

fn record_all(
    l: &Lot,
    entries: &[EntryView],
    mut samples: Vec<Sample>,
    outcome: SampleOutcome,
) -> Vec<Sample> {
    for i in 0..samples.len() {
        let r = evaluate_sample_result(l, entries, &samples, samples[i].id, outcome, None, None)
            .unwrap();
        samples[i] = r.sample;
    }
    samples
}

fn relabel(template: &Lot, state: LotState) -> Lot {
    let mut l = template.clone();
    l.state = state;
    l
}
