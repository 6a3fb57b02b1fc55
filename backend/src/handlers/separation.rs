//! Separation HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::separation::{RejectLotInput, SeparationService};
use crate::AppState;

/// Owner partition report for a lot
pub async fn get_separation_report(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = SeparationService::new(state.db.clone());

    match service.separation_report(lot_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Commit to the salvage plan instead of re-verifying
pub async fn apply_separation(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = SeparationService::new(state.db.clone());

    match service.apply_separation(lot_id).await {
        Ok((lot, plan)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "lot": lot, "separationPlan": plan })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Confirm the physical split was executed
pub async fn complete_separation(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = SeparationService::new(state.db.clone());

    match service.complete_separation(lot_id).await {
        Ok(lot) => (StatusCode::OK, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Reject a lot outright
pub async fn reject_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<RejectLotInput>,
) -> impl IntoResponse {
    let service = SeparationService::new(state.db.clone());

    match service.reject_lot(lot_id, input).await {
        Ok(lot) => (StatusCode::OK, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}
