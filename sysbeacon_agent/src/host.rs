//! Metrics collection using sysinfo.

use anyhow::{anyhow, bail};
use std::path::Path;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};
use tracing::debug;

use crate::provider::{InterfaceCounters, MetricsProvider};
use crate::types::{DiskInfo, MemoryInfo};

/// Persistent sysinfo handles. CPU usage is computed by sysinfo against the
/// previous refresh, so the first reading after startup is 0 for every core.
pub struct SysinfoProvider {
    sys: System,
    disks: Disks,
    networks: Networks,
}

impl SysinfoProvider {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::everything());
        let sys = System::new_with_specifics(refresh_kind);
        debug!(cores = sys.cpus().len(), "sysinfo handles initialised");
        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for SysinfoProvider {
    fn cpu_percentages(&mut self) -> anyhow::Result<Vec<f32>> {
        self.sys.refresh_cpu_usage();
        let cpus = self.sys.cpus();
        if cpus.is_empty() {
            bail!("no cpus reported by the host");
        }
        Ok(cpus.iter().map(|c| c.cpu_usage()).collect())
    }

    fn memory_stats(&mut self) -> anyhow::Result<MemoryInfo> {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            bail!("host reported zero total memory");
        }
        Ok(MemoryInfo {
            total,
            free: self.sys.free_memory(),
            used: self.sys.used_memory(),
        })
    }

    fn disk_usage(&mut self, path: &Path) -> anyhow::Result<DiskInfo> {
        self.disks.refresh(true);
        // Deepest mount point containing `path` is the volume it lives on.
        let disk = self
            .disks
            .list()
            .iter()
            .filter(|d| path.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .ok_or_else(|| anyhow!("no mounted volume contains {}", path.display()))?;
        let total = disk.total_space();
        let free = disk.available_space();
        Ok(DiskInfo {
            total,
            free,
            used: total.saturating_sub(free),
        })
    }

    fn network_counters(&mut self) -> anyhow::Result<Vec<InterfaceCounters>> {
        self.networks.refresh(true);
        Ok(self
            .networks
            .iter()
            .map(|(name, data)| InterfaceCounters {
                name: name.to_string(),
                bytes_sent: data.total_transmitted(),
                bytes_recv: data.total_received(),
            })
            .collect())
    }
}
