//! Per-subscriber watcher. Subscribers never send anything meaningful, so the
//! read half is only drained to notice when the peer goes away.

use axum::extract::ws::Message;
use futures_util::{Sink, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::registry::{ConnectionRegistry, Subscriber};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Close frame or end of stream.
    ClientClosed,
    ReadError(String),
    /// A broadcast write to this subscriber failed.
    Evicted,
    Shutdown,
}

/// Drains `stream` until the subscriber goes away, then unregisters and closes
/// it. Returns exactly once, with the reason the watch ended.
pub async fn watch_subscriber<S, R, E>(
    registry: Arc<ConnectionRegistry<S>>,
    subscriber: Arc<Subscriber<S>>,
    mut stream: R,
    shutdown: CancellationToken,
) -> CloseReason
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let reason = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break CloseReason::Shutdown,
            _ = subscriber.evicted() => break CloseReason::Evicted,
            next = stream.next() => match next {
                None | Some(Ok(Message::Close(_))) => break CloseReason::ClientClosed,
                Some(Err(e)) => break CloseReason::ReadError(e.to_string()),
                Some(Ok(_)) => {}
            },
        }
    };

    // May already be gone if a failed broadcast write got there first.
    registry.remove(subscriber.id()).await;
    drop(stream);
    subscriber.close().await;

    if let CloseReason::ReadError(e) = &reason {
        debug!(id = subscriber.id(), "subscriber read failed: {e}");
    }
    info!(id = subscriber.id(), peer = ?subscriber.peer(), ?reason, "subscriber disconnected");
    reason
}

/// Spawns [`watch_subscriber`] on `tasks`. The tracker owns the task; main waits
/// for it to drain on shutdown, so the returned handle may be dropped.
pub fn spawn_watcher<S, R, E>(
    tasks: &TaskTracker,
    registry: Arc<ConnectionRegistry<S>>,
    subscriber: Arc<Subscriber<S>>,
    stream: R,
    shutdown: CancellationToken,
) -> JoinHandle<CloseReason>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    tasks.spawn(watch_subscriber(registry, subscriber, stream, shutdown))
}
