//! Lot management HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::lot::{CreateLotInput, LotFilter, LotService, UpdateLotInput};
use crate::AppState;

/// Register a lot together with its owner entries
pub async fn create_lot_with_owners(
    State(state): State<AppState>,
    Json(input): Json<CreateLotInput>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    match service.create_lot(input).await {
        Ok(lot) => (StatusCode::CREATED, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List lots, optionally filtered by state and organization
pub async fn list_lots(
    State(state): State<AppState>,
    Query(filter): Query<LotFilter>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    match service.list_lots(filter).await {
        Ok(lots) => (StatusCode::OK, Json(serde_json::json!({ "lots": lots }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get one lot with its owner entries and sampling history
pub async fn get_lot(State(state): State<AppState>, Path(lot_id): Path<Uuid>) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    match service.get_lot(lot_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Edit a lot
pub async fn update_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<UpdateLotInput>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    match service.edit_lot(lot_id, input).await {
        Ok(lot) => (StatusCode::OK, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Full owner record behind an entry
pub async fn get_entry_owner(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = LotService::new(state.db.clone());

    match service.get_entry_owner(entry_id).await {
        Ok(owner) => (StatusCode::OK, Json(owner)).into_response(),
        Err(e) => e.into_response(),
    }
}
