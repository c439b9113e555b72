//! Juju hook tools (`config-get`, `relation-get`, `status-set`, ...).
//!
//! Juju puts these executables on `PATH` for the duration of a hook.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::Model;
use crate::config::RawConfig;
use crate::error::{CharmError, Result};
use crate::relation::{RelationBag, RelationSnapshot};
use crate::status::ReconcileOutcome;

const TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Model backed by the Juju hook tools.
pub struct HookTools {
    /// Directory holding the tools; `None` resolves them through `PATH`.
    tools_dir: Option<PathBuf>,
    timeout: Duration,
}

impl HookTools {
    pub fn new(tools_dir: Option<PathBuf>) -> Self {
        Self {
            tools_dir,
            timeout: TOOL_TIMEOUT,
        }
    }

    fn program(&self, tool: &str) -> PathBuf {
        match &self.tools_dir {
            Some(dir) => dir.join(tool),
            None => PathBuf::from(tool),
        }
    }

    /// Run a tool and return its trimmed stdout.
    async fn run(&self, tool: &str, args: &[&str]) -> Result<String> {
        debug!(tool, args = ?args, "Running hook tool");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(self.program(tool))
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| CharmError::HookTool {
            tool: tool.to_string(),
            message: format!("timed out after {:?}", self.timeout),
        })?
        .map_err(|e| CharmError::HookTool {
            tool: tool.to_string(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CharmError::HookTool {
                tool: tool.to_string(),
                message: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run_json<T: serde::de::DeserializeOwned + Default>(
        &self,
        tool: &str,
        args: &[&str],
    ) -> Result<T> {
        let stdout = self.run(tool, args).await?;
        // Some tools print nothing at all instead of `null`.
        if stdout.is_empty() || stdout == "null" {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&stdout)?)
    }

    async fn opened_ports(&self) -> Result<BTreeSet<String>> {
        let ports: Vec<String> = self.run_json("opened-ports", &["--format=json"]).await?;
        Ok(ports.into_iter().collect())
    }
}

#[async_trait]
impl Model for HookTools {
    async fn config(&self) -> Result<RawConfig> {
        self.run_json("config-get", &["--format=json"]).await
    }

    async fn relation_ids(&self, relation: &str) -> Result<Vec<String>> {
        self.run_json("relation-ids", &[relation, "--format=json"])
            .await
    }

    async fn relation_snapshot(&self, relation: &str) -> Result<RelationSnapshot> {
        let mut snapshot = RelationSnapshot::new();

        for id in self.relation_ids(relation).await? {
            let app: String = self
                .run_json("relation-list", &["-r", &id, "--app", "--format=json"])
                .await?;

            // Remote application not known yet, nothing published.
            if app.is_empty() {
                snapshot.push(id, RelationBag::new());
                continue;
            }

            let bag: RelationBag = self
                .run_json(
                    "relation-get",
                    &["-r", &id, "--app", "--format=json", "-", &app],
                )
                .await?;
            debug!(relation = %id, app = %app, keys = bag.len(), "Read relation data");
            snapshot.push(id, bag);
        }

        Ok(snapshot)
    }

    async fn set_app_relation_data(
        &self,
        relation_id: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let pair = format!("{key}={value}");
        self.run("relation-set", &["-r", relation_id, "--app", &pair])
            .await?;
        Ok(())
    }

    async fn is_leader(&self) -> Result<bool> {
        self.run_json("is-leader", &["--format=json"]).await
    }

    async fn set_ports(&self, ports: &[u16]) -> Result<()> {
        let desired: BTreeSet<String> = ports.iter().map(|p| format!("{p}/tcp")).collect();
        let opened = self.opened_ports().await?;

        for stale in opened.difference(&desired) {
            info!(port = %stale, "Closing port");
            self.run("close-port", &[stale.as_str()]).await?;
        }
        for port in desired.difference(&opened) {
            info!(port = %port, "Opening port");
            self.run("open-port", &[port.as_str()]).await?;
        }
        Ok(())
    }

    async fn set_status(&self, outcome: &ReconcileOutcome) -> Result<()> {
        self.run("status-set", &[outcome.name(), outcome.message()])
            .await?;
        Ok(())
    }

    async fn set_workload_version(&self, version: &str) -> Result<()> {
        self.run("application-version-set", &[version]).await?;
        Ok(())
    }
}
