//! Owner ledger HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::services::owner::OwnerService;
use crate::AppState;

/// Exact owner lookup by national id
pub async fn find_owner_by_national_id(
    State(state): State<AppState>,
    Path(national_id): Path<String>,
) -> impl IntoResponse {
    let service = OwnerService::new(state.db.clone());

    match service.find_by_national_id(&national_id).await {
        Ok(owner) => (StatusCode::OK, Json(owner)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List every master owner record
pub async fn list_owner_masters(State(state): State<AppState>) -> impl IntoResponse {
    let service = OwnerService::new(state.db.clone());

    match service.list_masters().await {
        Ok(owners) => (StatusCode::OK, Json(serde_json::json!({ "owners": owners })))
            .into_response(),
        Err(e) => e.into_response(),
    }
}
