//! Liveness endpoint with the allocation settings in force

use axum::{extract::State, Json};
use serde::Serialize;
use shared::AllocationPolicy;

use crate::{config::Config, AppState};

/// Liveness plus the inventory endpoint and policy auto-fill runs with.
/// The API token is never echoed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub inventory_api: String,
    pub allocation_policy: AllocationPolicy,
}

impl ServiceStatus {
    fn from_config(config: &Config) -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            environment: config.environment.clone(),
            inventory_api: config.inventory_api.base_url.trim_end_matches('/').to_string(),
            allocation_policy: config.allocation,
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(ServiceStatus::from_config(&state.config))
}
