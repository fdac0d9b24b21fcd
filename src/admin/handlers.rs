use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::load_balancer::ServiceSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub entry_healthy: bool,
}

/// Body of a status report.
#[derive(Debug, Deserialize)]
pub struct StatusReport {
    pub healthy: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        entry_healthy: state.manager.entry().is_healthy(),
    })
}

pub async fn get_services(State(state): State<AdminState>) -> Json<Vec<ServiceSnapshot>> {
    Json(state.manager.snapshot())
}

pub async fn put_server_status(
    State(state): State<AdminState>,
    Path((service, server)): Path<(String, String)>,
    Json(report): Json<StatusReport>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .manager
        .set_server_status(&service, &server, report.healthy)
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}
