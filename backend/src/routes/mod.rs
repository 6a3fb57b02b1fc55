//! Route definitions for the Cooperative Coffee QC Platform

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Organization registry
        .nest("/organizations", organization_routes())
        // Owner ledger
        .nest("/owners", owner_routes())
        // Lot lifecycle
        .nest("/lots", lot_routes())
        // Lab results
        .nest("/samples", sample_routes())
}

/// Organization registry routes
fn organization_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_organizations).post(handlers::create_organization),
        )
        .route("/:org_id", get(handlers::get_organization))
}

/// Owner ledger routes
fn owner_routes() -> Router<AppState> {
    Router::new()
        .route("/find-by-id/:national_id", get(handlers::find_owner_by_national_id))
        .route("/masters", get(handlers::list_owner_masters))
        .route("/entry/:entry_id", get(handlers::get_entry_owner))
}

/// Lot lifecycle routes
fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lots))
        .route("/create-with-owners", post(handlers::create_lot_with_owners))
        .route("/:lot_id", get(handlers::get_lot).put(handlers::update_lot))
        .route("/:lot_id/select-samples", post(handlers::select_samples))
        .route("/:lot_id/second-sampling", post(handlers::create_second_sampling))
        .route("/:lot_id/separation-report", get(handlers::get_separation_report))
        .route("/:lot_id/apply-separation", post(handlers::apply_separation))
        .route("/:lot_id/complete-separation", post(handlers::complete_separation))
        .route("/:lot_id/reject", post(handlers::reject_lot))
        .route("/:lot_id/process-cleaning", post(handlers::process_cleaning))
        .route(
            "/:lot_id/process-color-separation",
            post(handlers::process_color_separation),
        )
        .route("/:lot_id/final-reception", post(handlers::final_reception))
        .route("/:lot_id/processing-history", get(handlers::get_processing_history))
}

/// Lab result routes
fn sample_routes() -> Router<AppState> {
    Router::new().route("/:sample_id/result", post(handlers::record_sample_result))
}
