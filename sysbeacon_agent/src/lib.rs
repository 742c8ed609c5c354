//! Live host-metrics broadcaster: samples CPU, memory, disk, network and pm2
//! state once per second and pushes each snapshot to every WebSocket client
//! connected on `GET /metrics`.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod pm2;
pub mod provider;
pub mod registry;
pub mod snapshot;
pub mod state;
pub mod types;
pub mod ws;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(ws::metrics_ws))
        .with_state(state)
}
