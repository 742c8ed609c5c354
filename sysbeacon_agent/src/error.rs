//! Error types for the agent.

use std::fmt;
use thiserror::Error;

use crate::registry::SubscriberId;

/// Which metrics query failed while building a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Cpu => "cpu",
            Stage::Memory => "memory",
            Stage::Disk => "disk",
            Stage::Network => "network",
        })
    }
}

#[derive(Error, Debug)]
pub enum AgentError {
    /// A mandatory metrics query failed; the current tick is skipped.
    #[error("metrics unavailable ({stage}): {reason}")]
    MetricsUnavailable { stage: Stage, reason: String },

    /// The process manager could not be queried; the snapshot omits `pm2`.
    #[error("process manager unavailable: {reason}")]
    ProcessManagerUnavailable { reason: String },

    #[error("delivery to subscriber {id} failed: {reason}")]
    DeliveryFailed { id: SubscriberId, reason: String },

    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The only error a client ever sees.
    #[error("websocket upgrade failed: {reason}")]
    UpgradeFailed { reason: String },
}

impl AgentError {
    pub(crate) fn unavailable(stage: Stage, err: anyhow::Error) -> Self {
        AgentError::MetricsUnavailable {
            stage,
            reason: format!("{err:#}"),
        }
    }
}
