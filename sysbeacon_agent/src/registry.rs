//! Connection registry: the set of live subscribers the broadcaster fans out to.

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use std::collections::HashMap;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::error::AgentError;

pub type SubscriberId = u64;

const CLOSE_TIMEOUT: Duration = Duration::from_millis(250);

/// Write half of one subscriber's duplex channel.
pub struct Subscriber<S> {
    id: SubscriberId,
    peer: Option<SocketAddr>,
    sink: Mutex<S>,
    evicted: CancellationToken,
}

impl<S> Subscriber<S> {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Tells this subscriber's watcher to stop. The watcher drops the read
    /// half, which releases the socket even when the peer never answers.
    pub fn evict(&self) {
        self.evicted.cancel();
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted.is_cancelled()
    }

    /// Resolves once [`evict`](Self::evict) has been called.
    pub async fn evicted(&self) {
        self.evicted.cancelled().await
    }
}

impl<S> Subscriber<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    /// Sends one frame. Waiting for the sink and writing to it share the
    /// `deadline`; running past it counts as a failed delivery.
    pub async fn deliver(&self, msg: Message, deadline: Duration) -> Result<(), AgentError> {
        let send = async {
            let mut sink = self.sink.lock().await;
            sink.send(msg).await
        };
        match timeout(deadline, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AgentError::DeliveryFailed {
                id: self.id,
                reason: e.to_string(),
            }),
            Err(_) => Err(AgentError::DeliveryFailed {
                id: self.id,
                reason: format!("write timed out after {deadline:?}"),
            }),
        }
    }

    /// Best-effort close; a stalled peer is abandoned after a short wait.
    pub async fn close(&self) {
        let close = async {
            let mut sink = self.sink.lock().await;
            let _ = sink.close().await;
        };
        let _ = timeout(CLOSE_TIMEOUT, close).await;
    }
}

pub struct ConnectionRegistry<S> {
    next_id: AtomicU64,
    members: RwLock<HashMap<SubscriberId, Arc<Subscriber<S>>>>,
}

impl<S> ConnectionRegistry<S> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            members: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add(&self, sink: S, peer: Option<SocketAddr>) -> Arc<Subscriber<S>> {
        let subscriber = Arc::new(Subscriber {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            peer,
            sink: Mutex::new(sink),
            evicted: CancellationToken::new(),
        });
        self.members
            .write()
            .await
            .insert(subscriber.id, subscriber.clone());
        subscriber
    }

    /// Unregisters `id`. Removing an unknown or already removed id is a no-op.
    pub async fn remove(&self, id: SubscriberId) -> Option<Arc<Subscriber<S>>> {
        self.members.write().await.remove(&id)
    }

    /// Consistent copy of the current members for one broadcast pass.
    /// Handles stay valid after removal; their sinks just start failing.
    pub async fn members(&self) -> Vec<Arc<Subscriber<S>>> {
        self.members.read().await.values().cloned().collect()
    }

    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.members.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }
}

impl<S> Default for ConnectionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
