//! Cluster status handlers.

use crate::http::error::ApiError;
use crate::http::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;

/// Status routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status/servers", get(get_servers))
        .route("/status/partitionrange", get(get_partition_range))
        .with_state(state)
}

async fn get_servers(State(state): State<Arc<AppState>>) -> String {
    let mut out = String::new();
    for member in state.membership.members() {
        let _ = writeln!(out, "Member: {member}");
    }
    out
}

#[derive(Debug, Serialize)]
struct PartitionRange {
    bottom: u64,
    top: u64,
}

async fn get_partition_range(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PartitionRange>, ApiError> {
    let slice = state.ring()?.slice();
    Ok(Json(PartitionRange { bottom: slice.lo, top: slice.hi }))
}
