//! Route definitions for the allocation server

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/sowing-requests", sowing_request_routes())
}

/// Allocation and issuance for a single sowing request
fn sowing_request_routes() -> Router<AppState> {
    Router::new()
        .route("/:request_id/allocation", get(handlers::get_auto_allocation))
        .route(
            "/:request_id/allocation/validate",
            post(handlers::validate_allocation),
        )
        .route(
            "/:request_id/allocation/adjust",
            post(handlers::adjust_allocation),
        )
        .route("/:request_id/issue", post(handlers::issue_stock))
}
