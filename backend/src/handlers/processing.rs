//! Post-processing HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::processing::{
    CleaningInput, ColorSeparationInput, FinalReceptionInput, ProcessingService,
};
use crate::AppState;

/// Remove impurities from an approved or separated lot
pub async fn process_cleaning(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<CleaningInput>,
) -> impl IntoResponse {
    let service = ProcessingService::new(state.db.clone());

    match service.process_cleaning(lot_id, input).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Classify the cleaned lot by bean color
pub async fn process_color_separation(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<ColorSeparationInput>,
) -> impl IntoResponse {
    let service = ProcessingService::new(state.db.clone());

    match service.process_color_separation(lot_id, input).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Grade the lot and close its lifecycle
pub async fn final_reception(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<FinalReceptionInput>,
) -> impl IntoResponse {
    let service = ProcessingService::new(state.db.clone());

    match service.final_reception(lot_id, input).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Processing history for a lot
pub async fn get_processing_history(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = ProcessingService::new(state.db.clone());

    match service.processing_history(lot_id).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(e) => e.into_response(),
    }
}
