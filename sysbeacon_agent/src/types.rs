//! Data types sent to subscribers over WebSocket.
//! Field names here are the wire format; renaming one breaks clients.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryInfo {
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

/// Usage of the volume mounted at the configured disk path.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskInfo {
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub name: String,
    // bytes since the previous snapshot, not cumulative totals
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Monit {
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub cpu: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Pm2Env {
    #[serde(default)]
    pub status: String,
}

/// One process managed by pm2, as reported by `pm2 jlist`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Pm2Process {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pid: u32,
    #[serde(default)]
    pub pm_id: u32,
    #[serde(default)]
    pub monit: Monit,
    #[serde(default)]
    pub pm2_env: Pm2Env,
}

/// One broadcast cycle's worth of host metrics.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Snapshot {
    pub cpu: Vec<f32>,
    pub memory: MemoryInfo,
    pub disk: DiskInfo,
    pub network: Vec<NetworkInfo>,
    // omitted entirely when the process manager could not be queried
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm2: Option<Vec<Pm2Process>>,
}
