//! Shared agent state handed to the axum handlers.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::registry::ConnectionRegistry;

/// Write half of an upgraded WebSocket, as stored in the registry.
pub type WsSink = SplitSink<WebSocket, Message>;
pub type SharedRegistry = Arc<ConnectionRegistry<WsSink>>;

#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,

    // Watchers live on `tasks` and stop when `shutdown` is cancelled.
    pub tasks: TaskTracker,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }
}
