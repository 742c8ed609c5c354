//! Background broadcaster: once per tick builds a snapshot and pushes it to
//! every registered subscriber, pruning the ones that fail.

use axum::extract::ws::Message;
use futures_util::future::join_all;
use futures_util::Sink;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::AgentError;
use crate::registry::ConnectionRegistry;
use crate::snapshot::SnapshotBuilder;

pub const BROADCAST_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum CycleOutcome {
    /// Nobody was listening, so nothing was sampled.
    Idle,
    /// Sampling failed; no subscriber received anything this tick.
    SampleFailed(AgentError),
    Broadcast { delivered: usize, pruned: usize },
}

pub struct Broadcaster<S> {
    registry: Arc<ConnectionRegistry<S>>,
    // also guards the network counter state inside the builder
    builder: Mutex<SnapshotBuilder>,
    write_timeout: Duration,
}

impl<S> Broadcaster<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    pub fn new(
        registry: Arc<ConnectionRegistry<S>>,
        builder: SnapshotBuilder,
        write_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            builder: Mutex::new(builder),
            write_timeout,
        }
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        if self.registry.is_empty().await {
            return CycleOutcome::Idle;
        }

        let snapshot = {
            let mut builder = self.builder.lock().await;
            match builder.build().await {
                Ok(s) => s,
                Err(e) => {
                    warn!("skipping broadcast: {e}");
                    return CycleOutcome::SampleFailed(e);
                }
            }
        };

        let payload = match serde_json::to_string(&snapshot) {
            Ok(js) => js,
            Err(e) => {
                let err = AgentError::from(e);
                warn!("skipping broadcast: {err}");
                return CycleOutcome::SampleFailed(err);
            }
        };

        let members = self.registry.members().await;
        let deadline = self.write_timeout;
        let results = join_all(members.iter().map(|sub| {
            let msg = Message::Text(payload.clone());
            async move { (sub, sub.deliver(msg, deadline).await) }
        }))
        .await;

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (sub, res) in results {
            match res {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(peer = ?sub.peer(), "{e}; dropping subscriber");
                    self.registry.remove(sub.id()).await;
                    sub.evict();
                    failed.push(sub);
                }
            }
        }
        let pruned = failed.len();
        join_all(failed.into_iter().map(|sub| async move { sub.close().await })).await;

        CycleOutcome::Broadcast { delivered, pruned }
    }
}

/// Runs the broadcast loop until `shutdown` is cancelled. Ticks are strictly
/// sequential: a slow cycle delays the next tick instead of overlapping it.
pub fn spawn_broadcaster<S>(
    broadcaster: Arc<Broadcaster<S>>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match broadcaster.run_cycle().await {
                CycleOutcome::Idle => trace!("no subscribers, sampling skipped"),
                CycleOutcome::SampleFailed(_) => {}
                CycleOutcome::Broadcast { delivered, pruned } => {
                    debug!(delivered, pruned, "snapshot broadcast")
                }
            }
        }
        debug!("broadcaster stopped");
    })
}
