//! Sampling HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::sample::{
    RecordResultInput, SampleService, SecondSamplingInput, SelectSamplesInput,
};
use crate::AppState;

/// Select up to five owner entries of a pending lot for sampling
pub async fn select_samples(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<SelectSamplesInput>,
) -> impl IntoResponse {
    let service = SampleService::new(state.db.clone());

    match service.select_samples(lot_id, input).await {
        Ok(samples) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "samples": samples })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Record a pass/fail lab result for one sample
pub async fn record_sample_result(
    State(state): State<AppState>,
    Path(sample_id): Path<Uuid>,
    Json(input): Json<RecordResultInput>,
) -> impl IntoResponse {
    let service = SampleService::new(state.db.clone());

    match service.record_result(sample_id, input).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Open a re-verification round for contaminated samples
pub async fn create_second_sampling(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<SecondSamplingInput>,
) -> impl IntoResponse {
    let service = SampleService::new(state.db.clone());

    match service.create_second_sampling(lot_id, input).await {
        Ok(samples) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "samples": samples })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
