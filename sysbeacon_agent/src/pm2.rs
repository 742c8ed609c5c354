//! pm2 integration: shells out to `pm2 jlist` and parses its JSON.

use anyhow::{bail, Context};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::provider::ProcessManager;
use crate::types::Pm2Process;

pub struct Pm2 {
    program: String,
    timeout: Duration,
}

impl Pm2 {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ProcessManager for Pm2 {
    async fn list_managed_processes(&self) -> anyhow::Result<Vec<Pm2Process>> {
        let run = Command::new(&self.program)
            .arg("jlist")
            .kill_on_drop(true)
            .output();
        let output = timeout(self.timeout, run)
            .await
            .with_context(|| format!("`{} jlist` timed out after {:?}", self.program, self.timeout))?
            .with_context(|| format!("failed to run `{} jlist`", self.program))?;
        if !output.status.success() {
            bail!("`{} jlist` exited with {}", self.program, output.status);
        }
        parse_jlist(&output.stdout)
    }
}

pub fn parse_jlist(raw: &[u8]) -> anyhow::Result<Vec<Pm2Process>> {
    serde_json::from_slice(raw).context("pm2 jlist output is not a process list")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_jlist_and_ignores_extra_fields() {
        let raw = br#"[
            {"name":"api","pid":4242,"pm_id":0,"monit":{"memory":52428800,"cpu":3},
             "pm2_env":{"status":"online","restart_time":2,"exec_mode":"fork_mode"}},
            {"name":"worker","pid":0,"pm_id":1,"monit":{"memory":0,"cpu":0},
             "pm2_env":{"status":"stopped"}}
        ]"#;
        let procs = parse_jlist(raw).unwrap();
        assert_eq!(procs.len(), 2);
        assert_eq!(procs[0].name, "api");
        assert_eq!(procs[0].pid, 4242);
        assert_eq!(procs[0].monit.memory, 52_428_800);
        assert_eq!(procs[0].monit.cpu, 3.0);
        assert_eq!(procs[1].pm2_env.status, "stopped");
    }

    #[test]
    fn rejects_non_list_output() {
        assert!(parse_jlist(b"[PM2] Spawning PM2 daemon").is_err());
        assert!(parse_jlist(br#"{"name":"api"}"#).is_err());
    }

    #[test]
    fn empty_list_is_fine() {
        assert!(parse_jlist(b"[]").unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_binary_is_an_error() {
        let pm2 = Pm2::new("sysbeacon-no-such-pm2-binary", Duration::from_secs(1));
        assert!(pm2.list_managed_processes().await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_exit_status_is_an_error() {
        // `false jlist` exits 1 without output
        let pm2 = Pm2::new("false", Duration::from_secs(1));
        let err = pm2.list_managed_processes().await.unwrap_err();
        assert!(err.to_string().contains("exited with"), "{err:#}");
    }
}
