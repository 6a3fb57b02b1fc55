//! Sampling workflow tests
//!
//! Property-based and unit tests for:
//! - Selection bounds (1 to 5 entries per round)
//! - Sample numbering M1..M5 in selection order
//! - Write-once lab results
//! - Re-verification rounds

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::workflow::{evaluate_sample_result, second_sampling_round, select_samples};
use shared::{
    EntryView, Lot, LotEvent, LotState, SampleOutcome, SampleState, WorkflowError,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn entry(quintals: &str) -> EntryView {
    EntryView {
        entry_id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        full_name: "Rosa Tituaña".to_string(),
        national_id: "1710034065".to_string(),
        quintals_delivered: dec(quintals),
    }
}

fn lot(declared: &str, state: LotState) -> Lot {
    Lot {
        id: Uuid::new_v4(),
        code: "LOTE-2026-0021".to_string(),
        organization_id: Uuid::new_v4(),
        harvest_date: chrono::NaiveDate::from_ymd_opt(2026, 5, 20).unwrap(),
        delivery_date: Utc::now(),
        declared_quintals: dec(declared),
        initial_weight_kg: shared::quintals_to_kg(dec(declared)),
        final_weight_kg: None,
        state,
        weight_observations: None,
        observations: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn entries(n: usize) -> Vec<EntryView> {
    (0..n).map(|_| entry("10")).collect()
}

// ============================================================================
// Property Tests: selection bounds
// ============================================================================

proptest! {
    /// Any selection of 1 to 5 entries on a pending lot succeeds, and sample
    /// numbers follow selection order
    #[test]
    fn property_selection_within_bounds_succeeds(count in 1usize..=5) {
        let l = lot("100", LotState::Pending);
        let es = entries(5);
        let selected: Vec<Uuid> = es.iter().take(count).map(|e| e.entry_id).collect();

        let (samples, event) = select_samples(&l, &es, &selected, Utc::now()).unwrap();

        prop_assert_eq!(event, LotEvent::SamplesSelected);
        prop_assert_eq!(samples.len(), count);
        for (i, sample) in samples.iter().enumerate() {
            prop_assert_eq!(&sample.sample_number, &format!("M{}", i + 1));
            prop_assert_eq!(sample.owner_entry_id, selected[i]);
            prop_assert_eq!(sample.round, 1);
            prop_assert_eq!(sample.state, SampleState::Pending);
        }
    }
}

// ============================================================================
// Unit Tests: selection
// ============================================================================

#[test]
fn test_empty_selection_rejected() {
    let l = lot("100", LotState::Pending);
    let es = entries(3);
    let err = select_samples(&l, &es, &[], Utc::now()).unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

#[test]
fn test_selection_above_five_rejected() {
    let l = lot("100", LotState::Pending);
    let es = entries(6);
    let selected: Vec<Uuid> = es.iter().map(|e| e.entry_id).collect();
    let err = select_samples(&l, &es, &selected, Utc::now()).unwrap_err();
    match err {
        WorkflowError::Validation(violations) => {
            assert!(violations.iter().any(|v| v.field == "ownerEntryIds"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_duplicate_entry_rejected() {
    let l = lot("100", LotState::Pending);
    let es = entries(2);
    let selected = vec![es[0].entry_id, es[0].entry_id];
    assert!(select_samples(&l, &es, &selected, Utc::now()).is_err());
}

#[test]
fn test_foreign_entry_rejected() {
    let l = lot("100", LotState::Pending);
    let es = entries(2);
    let selected = vec![es[0].entry_id, Uuid::new_v4()];
    assert!(select_samples(&l, &es, &selected, Utc::now()).is_err());
}

#[test]
fn test_selection_requires_pending_lot() {
    for state in [LotState::InProcess, LotState::Approved, LotState::Finalized] {
        let l = lot("100", state);
        let es = entries(1);
        let err = select_samples(&l, &es, &[es[0].entry_id], Utc::now()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState(_)));
    }
}

// ============================================================================
// Unit Tests: lab results
// ============================================================================

#[test]
fn test_result_is_write_once() {
    let l = lot("100", LotState::Pending);
    let es = entries(2);
    let selected: Vec<Uuid> = es.iter().map(|e| e.entry_id).collect();
    let (mut samples, _) = select_samples(&l, &es, &selected, Utc::now()).unwrap();

    let l = lot_in(&l, LotState::InProcess);
    let outcome = evaluate_sample_result(
        &l,
        &es,
        &samples,
        samples[0].id,
        SampleOutcome::Approved,
        None,
        None,
    )
    .unwrap();
    samples[0] = outcome.sample;

    // Repeating the call is rejected even with the same outcome
    let err = evaluate_sample_result(
        &l,
        &es,
        &samples,
        samples[0].id,
        SampleOutcome::Approved,
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));
}

#[test]
fn test_last_approval_closes_the_round() {
    let l = lot("100", LotState::Pending);
    let es = entries(2);
    let selected: Vec<Uuid> = es.iter().map(|e| e.entry_id).collect();
    let (mut samples, _) = select_samples(&l, &es, &selected, Utc::now()).unwrap();
    let l = lot_in(&l, LotState::InProcess);

    let first = evaluate_sample_result(
        &l,
        &es,
        &samples,
        samples[0].id,
        SampleOutcome::Approved,
        Some("Clean cup".to_string()),
        None,
    )
    .unwrap();
    assert_eq!(first.lot_event, None);
    assert!(!first.requires_second_sampling);
    samples[0] = first.sample;

    let second = evaluate_sample_result(
        &l,
        &es,
        &samples,
        samples[1].id,
        SampleOutcome::Approved,
        None,
        None,
    )
    .unwrap();
    assert_eq!(second.lot_event, Some(LotEvent::AllSamplesApproved));
    assert!(second.owners_to_separate.is_empty());
}

#[test]
fn test_contamination_flags_second_sampling() {
    let l = lot("100", LotState::Pending);
    let es = entries(2);
    let selected: Vec<Uuid> = es.iter().map(|e| e.entry_id).collect();
    let (samples, _) = select_samples(&l, &es, &selected, Utc::now()).unwrap();
    let l = lot_in(&l, LotState::InProcess);

    let outcome = evaluate_sample_result(
        &l,
        &es,
        &samples,
        samples[0].id,
        SampleOutcome::Contaminated,
        Some("Ochratoxin traces".to_string()),
        None,
    )
    .unwrap();

    assert!(outcome.requires_second_sampling);
    assert!(outcome.separation_required);
    assert_eq!(outcome.lot_event, Some(LotEvent::ContaminationConfirmed));
    assert_eq!(outcome.owners_to_separate.len(), 1);
    assert_eq!(outcome.owners_to_separate[0].entry_id, es[0].entry_id);
    assert!(outcome.plan.is_some());
}

// ============================================================================
// Unit Tests: re-verification rounds
// ============================================================================

#[test]
fn test_second_round_numbering_restarts() {
    let l = lot("100", LotState::Pending);
    let es = entries(3);
    let selected: Vec<Uuid> = es.iter().map(|e| e.entry_id).collect();
    let (mut samples, _) = select_samples(&l, &es, &selected, Utc::now()).unwrap();

    // Contaminate M2 and M3, approve M1
    let l2 = lot_in(&l, LotState::InProcess);
    for (i, outcome) in [
        SampleOutcome::Approved,
        SampleOutcome::Contaminated,
        SampleOutcome::Contaminated,
    ]
    .into_iter()
    .enumerate()
    {
        let r =
            evaluate_sample_result(&l2, &es, &samples, samples[i].id, outcome, None, None).unwrap();
        samples[i] = r.sample;
    }

    let l3 = lot_in(&l, LotState::SeparationPending);
    let contaminated: Vec<Uuid> = samples
        .iter()
        .filter(|s| s.state == SampleState::Contaminated)
        .map(|s| s.id)
        .collect();
    let (round_two, event) =
        second_sampling_round(&l3, &samples, &contaminated, Utc::now()).unwrap();

    assert_eq!(event, LotEvent::SecondSamplingCreated);
    assert_eq!(round_two.len(), 2);
    for (i, sample) in round_two.iter().enumerate() {
        assert_eq!(sample.round, 2);
        assert_eq!(sample.sample_number, format!("M{}", i + 1));
        assert_eq!(sample.state, SampleState::Pending);
    }
}

#[test]
fn test_second_round_requires_contaminated_samples() {
    let l = lot("100", LotState::SeparationPending);
    let err = second_sampling_round(&l, &[], &[], Utc::now()).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));
}

#[test]
fn test_second_round_rejects_approved_sample() {
    let l = lot("100", LotState::Pending);
    let es = entries(1);
    let (mut samples, _) = select_samples(&l, &es, &[es[0].entry_id], Utc::now()).unwrap();
    samples[0].state = SampleState::Approved;

    let l = lot_in(&l, LotState::SeparationPending);
    let err = second_sampling_round(&l, &samples, &[samples[0].id], Utc::now()).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));
}

#[test]
fn test_partial_reverification_keeps_separation_reachable() {
    let l = lot("100", LotState::Pending);
    let es = entries(3);
    let selected: Vec<Uuid> = es.iter().map(|e| e.entry_id).collect();
    let (mut samples, _) = select_samples(&l, &es, &selected, Utc::now()).unwrap();

    // Round 1: owners 1 and 2 contaminated, owner 3 approved
    let l2 = lot_in(&l, LotState::InProcess);
    for (i, outcome) in [
        SampleOutcome::Contaminated,
        SampleOutcome::Contaminated,
        SampleOutcome::Approved,
    ]
    .into_iter()
    .enumerate()
    {
        let r =
            evaluate_sample_result(&l2, &es, &samples, samples[i].id, outcome, None, None).unwrap();
        samples[i] = r.sample;
    }

    // The operator re-verifies only the first contaminated owner
    let l3 = lot_in(&l, LotState::SeparationPending);
    let (round_two, _) =
        second_sampling_round(&l3, &samples, &[samples[0].id], Utc::now()).unwrap();
    samples.extend(round_two);

    // The round-2 sample clears, but owner 2 keeps its round-1 contamination,
    // so the lot must return to awaiting a separation decision
    let l4 = lot_in(&l, LotState::InProcess);
    let last = samples.len() - 1;
    let r = evaluate_sample_result(
        &l4,
        &es,
        &samples,
        samples[last].id,
        SampleOutcome::Approved,
        None,
        None,
    )
    .unwrap();

    assert!(r.separation_required);
    assert_eq!(r.owners_to_separate.len(), 1);
    assert_eq!(r.owners_to_separate[0].entry_id, es[1].entry_id);
    assert_eq!(r.lot_event, Some(LotEvent::ContaminationConfirmed));

    // From there both salvage and another re-verification round stay open
    let state = l4.state.apply(LotEvent::ContaminationConfirmed).unwrap();
    assert_eq!(state, LotState::SeparationPending);
    assert!(state.apply(LotEvent::SeparationPlanApplied).is_ok());
    assert!(state.apply(LotEvent::SecondSamplingCreated).is_ok());
}

fn lot_in(template: &Lot, state: LotState) -> Lot {
    let mut l = template.clone();
    l.state = state;
    l
}
