//! Seams to the collaborators that actually talk to the OS and to pm2.
//!
//! `host::SysinfoProvider` and `pm2::Pm2` are the production implementations;
//! tests swap in scripted fakes.

use async_trait::async_trait;
use std::path::Path;

use crate::types::{DiskInfo, MemoryInfo, Pm2Process};

/// Cumulative byte counters of one network interface since boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Host metrics source. Every query is fallible and all of them are mandatory
/// for a snapshot.
pub trait MetricsProvider: Send {
    /// Per-core utilization in percent, in core order.
    fn cpu_percentages(&mut self) -> anyhow::Result<Vec<f32>>;
    fn memory_stats(&mut self) -> anyhow::Result<MemoryInfo>;
    fn disk_usage(&mut self, path: &Path) -> anyhow::Result<DiskInfo>;
    fn network_counters(&mut self) -> anyhow::Result<Vec<InterfaceCounters>>;
}

/// Best-effort source of managed-process records.
#[async_trait]
pub trait ProcessManager: Send + Sync {
    async fn list_managed_processes(&self) -> anyhow::Result<Vec<Pm2Process>>;
}
