//! Organization registry HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::services::organization::{CreateOrganizationInput, OrganizationService};
use crate::AppState;

/// Register a new organization
pub async fn create_organization(
    State(state): State<AppState>,
    Json(input): Json<CreateOrganizationInput>,
) -> impl IntoResponse {
    let service = OrganizationService::new(state.db.clone());

    match service.create_organization(input).await {
        Ok(org) => (StatusCode::CREATED, Json(org)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List all organizations
pub async fn list_organizations(State(state): State<AppState>) -> impl IntoResponse {
    let service = OrganizationService::new(state.db.clone());

    match service.list_organizations().await {
        Ok(orgs) => (
            StatusCode::OK,
            Json(serde_json::json!({ "organizations": orgs })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get one organization
pub async fn get_organization(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = OrganizationService::new(state.db.clone());

    match service.get_organization(org_id).await {
        Ok(org) => (StatusCode::OK, Json(org)).into_response(),
        Err(e) => e.into_response(),
    }
}
