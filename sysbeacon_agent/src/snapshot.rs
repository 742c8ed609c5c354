//! Snapshot assembly: queries the providers once per tick, truncates CPU
//! readings and turns cumulative interface counters into per-tick deltas.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AgentError, Stage};
use crate::provider::{InterfaceCounters, MetricsProvider, ProcessManager};
use crate::types::{NetworkInfo, Snapshot};

/// Decimal digits kept on per-core CPU percentages.
pub const CPU_PRECISION: i32 = 2;

/// Truncates toward zero at `precision` decimal digits (33.456 -> 33.45).
///
/// A value that is already at that precision comes back unchanged even when
/// its binary form sits just below the decimal one (99.99 stays 99.99).
pub fn truncate_to_decimals(value: f32, precision: i32) -> f32 {
    let mul = 10f64.powi(precision);
    let scaled = f64::from(value) * mul;
    let nearest = scaled.round();
    let tolerance = nearest.abs().max(1.0) * f64::from(f32::EPSILON);
    let whole = if (scaled - nearest).abs() <= tolerance {
        nearest
    } else {
        scaled.trunc()
    };
    (whole / mul) as f32
}

/// Last cumulative (sent, recv) seen per interface.
#[derive(Debug, Default)]
pub struct NetworkCounterState {
    last: HashMap<String, (u64, u64)>,
}

impl NetworkCounterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `current` as the new baseline and returns the deltas against the
    /// previous one, sorted by interface name.
    ///
    /// An interface seen for the first time reports its full cumulative count.
    /// A counter that went backwards (reset or wrap) reports 0.
    pub fn advance(&mut self, current: Vec<InterfaceCounters>) -> Vec<NetworkInfo> {
        let mut deltas: Vec<NetworkInfo> = current
            .into_iter()
            .map(|c| {
                let prev = self
                    .last
                    .insert(c.name.clone(), (c.bytes_sent, c.bytes_recv));
                let (bytes_sent, bytes_recv) = match prev {
                    Some((sent, recv)) => (
                        c.bytes_sent.saturating_sub(sent),
                        c.bytes_recv.saturating_sub(recv),
                    ),
                    None => (c.bytes_sent, c.bytes_recv),
                };
                NetworkInfo {
                    name: c.name,
                    bytes_sent,
                    bytes_recv,
                }
            })
            .collect();
        deltas.sort_by(|a, b| a.name.cmp(&b.name));
        deltas
    }

    pub fn baseline(&self, name: &str) -> Option<(u64, u64)> {
        self.last.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

pub struct SnapshotBuilder {
    provider: Box<dyn MetricsProvider>,
    processes: Option<Arc<dyn ProcessManager>>,
    disk_path: PathBuf,
    counters: NetworkCounterState,
}

impl SnapshotBuilder {
    pub fn new(provider: Box<dyn MetricsProvider>, disk_path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            processes: None,
            disk_path: disk_path.into(),
            counters: NetworkCounterState::new(),
        }
    }

    pub fn with_process_manager(mut self, processes: Arc<dyn ProcessManager>) -> Self {
        self.processes = Some(processes);
        self
    }

    pub fn counters(&self) -> &NetworkCounterState {
        &self.counters
    }

    /// Samples every source in order. CPU, memory, disk and network are
    /// mandatory and short-circuit on failure, so the counter state is only
    /// touched once the network query itself succeeded. The process list is
    /// optional and dropped on error.
    pub async fn build(&mut self) -> Result<Snapshot, AgentError> {
        let cpu = self
            .provider
            .cpu_percentages()
            .map_err(|e| AgentError::unavailable(Stage::Cpu, e))?
            .into_iter()
            .map(|v| truncate_to_decimals(v, CPU_PRECISION))
            .collect();

        let memory = self
            .provider
            .memory_stats()
            .map_err(|e| AgentError::unavailable(Stage::Memory, e))?;

        let disk = self
            .provider
            .disk_usage(&self.disk_path)
            .map_err(|e| AgentError::unavailable(Stage::Disk, e))?;

        let counters = self
            .provider
            .network_counters()
            .map_err(|e| AgentError::unavailable(Stage::Network, e))?;
        let network = self.counters.advance(counters);

        let pm2 = match &self.processes {
            Some(pm) => match pm.list_managed_processes().await {
                Ok(list) => Some(list),
                Err(e) => {
                    let err = AgentError::ProcessManagerUnavailable {
                        reason: format!("{e:#}"),
                    };
                    debug!("{err}; omitting process list");
                    None
                }
            },
            None => None,
        };

        Ok(Snapshot {
            cpu,
            memory,
            disk,
            network,
            pm2,
        })
    }
}
