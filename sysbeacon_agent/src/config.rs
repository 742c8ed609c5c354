//! Command line and environment configuration.

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "sysbeacon_agent",
    version,
    about = "Pushes live host metrics to every client connected on /metrics"
)]
pub struct AgentConfig {
    /// Port to listen on
    #[arg(short, long, env = "SYSBEACON_PORT", default_value_t = 8082)]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "SYSBEACON_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Any path on the volume whose usage is reported
    #[arg(long, env = "SYSBEACON_DISK_PATH", default_value = "/")]
    pub disk_path: PathBuf,

    /// pm2 executable used for the process list
    #[arg(long, env = "SYSBEACON_PM2_BIN", default_value = "pm2")]
    pub pm2_bin: String,

    /// Give up on `pm2 jlist` after this many milliseconds
    #[arg(long, env = "SYSBEACON_PM2_TIMEOUT_MS", default_value_t = 500)]
    pub pm2_timeout_ms: u64,

    /// Never query pm2; snapshots carry no process list
    #[arg(long, env = "SYSBEACON_NO_PM2")]
    pub no_pm2: bool,

    /// Drop a subscriber whose frame is not written within this many milliseconds
    #[arg(long, env = "SYSBEACON_WRITE_TIMEOUT_MS", default_value_t = 1000)]
    pub write_timeout_ms: u64,
}

impl AgentConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((self.bind, self.port))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn pm2_timeout(&self) -> Duration {
        Duration::from_millis(self.pm2_timeout_ms)
    }
}
