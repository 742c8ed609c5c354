//! Scripted stand-ins for the host and pm2 collaborators.
#![allow(dead_code)]

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use axum::extract::ws::Message;
use futures::channel::mpsc;
use std::path::Path;
use std::sync::{Arc, Mutex};

use sysbeacon_agent::provider::{InterfaceCounters, MetricsProvider, ProcessManager};
use sysbeacon_agent::types::{DiskInfo, MemoryInfo, Monit, Pm2Env, Pm2Process};

/// Sink type used for subscribers in tests.
pub type TestSink = mpsc::Sender<Message>;

#[derive(Debug, Clone)]
pub struct FakeHost {
    pub cpu: Vec<f32>,
    pub memory: MemoryInfo,
    pub disk: DiskInfo,
    pub interfaces: Vec<InterfaceCounters>,
    pub fail_cpu: bool,
    pub fail_memory: bool,
    pub fail_disk: bool,
    pub fail_network: bool,
    pub cpu_queries: usize,
    pub network_queries: usize,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            cpu: vec![12.5, 33.456],
            memory: MemoryInfo {
                total: 16_000,
                free: 6_000,
                used: 10_000,
            },
            disk: DiskInfo {
                total: 500_000,
                free: 200_000,
                used: 300_000,
            },
            interfaces: vec![iface("eth0", 1_000, 2_000)],
            fail_cpu: false,
            fail_memory: false,
            fail_disk: false,
            fail_network: false,
            cpu_queries: 0,
            network_queries: 0,
        }
    }
}

pub fn iface(name: &str, sent: u64, recv: u64) -> InterfaceCounters {
    InterfaceCounters {
        name: name.to_string(),
        bytes_sent: sent,
        bytes_recv: recv,
    }
}

/// Provider whose answers the test can change between cycles through the
/// shared handle.
#[derive(Clone, Default)]
pub struct FakeProvider(pub Arc<Mutex<FakeHost>>);

impl FakeProvider {
    pub fn new() -> (Self, Arc<Mutex<FakeHost>>) {
        let host = Arc::new(Mutex::new(FakeHost::default()));
        (Self(host.clone()), host)
    }
}

impl MetricsProvider for FakeProvider {
    fn cpu_percentages(&mut self) -> anyhow::Result<Vec<f32>> {
        let mut host = self.0.lock().unwrap();
        host.cpu_queries += 1;
        if host.fail_cpu {
            bail!("cpu counters unreadable");
        }
        Ok(host.cpu.clone())
    }

    fn memory_stats(&mut self) -> anyhow::Result<MemoryInfo> {
        let host = self.0.lock().unwrap();
        if host.fail_memory {
            bail!("meminfo unreadable");
        }
        Ok(host.memory)
    }

    fn disk_usage(&mut self, path: &Path) -> anyhow::Result<DiskInfo> {
        let host = self.0.lock().unwrap();
        if host.fail_disk {
            return Err(anyhow!("statfs {} failed", path.display()));
        }
        Ok(host.disk)
    }

    fn network_counters(&mut self) -> anyhow::Result<Vec<InterfaceCounters>> {
        let mut host = self.0.lock().unwrap();
        host.network_queries += 1;
        if host.fail_network {
            bail!("net counters unreadable");
        }
        Ok(host.interfaces.clone())
    }
}

pub struct FakePm2 {
    pub result: Result<Vec<Pm2Process>, String>,
}

impl FakePm2 {
    pub fn ok(procs: Vec<Pm2Process>) -> Arc<Self> {
        Arc::new(Self { result: Ok(procs) })
    }

    pub fn failing(msg: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(msg.to_string()),
        })
    }
}

#[async_trait]
impl ProcessManager for FakePm2 {
    async fn list_managed_processes(&self) -> anyhow::Result<Vec<Pm2Process>> {
        self.result.clone().map_err(|e| anyhow!(e))
    }
}

pub fn pm2_proc(name: &str, pid: u32, pm_id: u32, status: &str) -> Pm2Process {
    Pm2Process {
        name: name.to_string(),
        pid,
        pm_id,
        monit: Monit {
            memory: 1024,
            cpu: 1.0,
        },
        pm2_env: Pm2Env {
            status: status.to_string(),
        },
    }
}
