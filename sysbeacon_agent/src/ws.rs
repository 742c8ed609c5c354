//! WebSocket upgrade and subscriber registration.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::stream::StreamExt;
use serde_json::json;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::error::AgentError;
use crate::lifecycle::spawn_watcher;
use crate::state::AppState;

pub async fn metrics_ws(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let peer = peer.map(|ConnectInfo(addr)| addr);
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return upgrade_failed(rejection.body_text(), peer),
    };
    ws.on_failed_upgrade(move |e: axum::Error| {
        let err = AgentError::UpgradeFailed {
            reason: e.to_string(),
        };
        warn!(?peer, "{err}");
    })
    .on_upgrade(move |socket| register(socket, state, peer))
}

fn upgrade_failed(reason: String, peer: Option<SocketAddr>) -> Response {
    let err = AgentError::UpgradeFailed {
        reason: reason.clone(),
    };
    warn!(?peer, "{err}");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": reason,
            "message": "Could not open websocket connection",
        })),
    )
        .into_response()
}

async fn register(socket: WebSocket, state: AppState, peer: Option<SocketAddr>) {
    let (sink, stream) = socket.split();
    let subscriber = state.registry.add(sink, peer).await;
    info!(id = subscriber.id(), ?peer, "subscriber connected");
    spawn_watcher(
        &state.tasks,
        state.registry.clone(),
        subscriber,
        stream,
        state.shutdown.child_token(),
    );
}
