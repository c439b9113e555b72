//! Clients for the systems the charm talks to:
//! - Pebble: the workload's process supervisor (layers, plan, restarts)
//! - Juju hook tools: config, relation data, ports, status
//! - the Nessie workload itself, for its version string

pub mod hook_tools;
pub mod pebble;
pub mod workload;

pub use hook_tools::HookTools;
pub use pebble::PebbleClient;
pub use workload::HttpVersionProbe;

use async_trait::async_trait;

use crate::config::RawConfig;
use crate::error::Result;
use crate::layer::{Layer, Plan};
use crate::relation::RelationSnapshot;
use crate::status::ReconcileOutcome;

/// Process supervisor running inside the workload container.
#[async_trait]
pub trait Supervisor: Send + Sync {
    /// Whether the supervisor API answers at all.
    async fn can_connect(&self) -> bool;

    /// Currently active plan.
    async fn get_plan(&self) -> Result<Plan>;

    /// Add (or with `combine`, merge into) the layer with the given label.
    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<()>;

    /// Restart the named services and wait for the change to finish.
    async fn restart(&self, services: &[String]) -> Result<()>;

    /// Start every enabled service that is not running.
    async fn replan(&self) -> Result<()>;
}

/// The orchestrator's view of this unit.
#[async_trait]
pub trait Model: Send + Sync {
    async fn config(&self) -> Result<RawConfig>;

    async fn relation_ids(&self, relation: &str) -> Result<Vec<String>>;

    /// Remote application data for every relation on the endpoint.
    async fn relation_snapshot(&self, relation: &str) -> Result<RelationSnapshot>;

    /// Write a key into this application's databag on a relation (leader only).
    async fn set_app_relation_data(&self, relation_id: &str, key: &str, value: &str)
    -> Result<()>;

    async fn is_leader(&self) -> Result<bool>;

    /// Make `ports` the exact set of opened TCP ports.
    async fn set_ports(&self, ports: &[u16]) -> Result<()>;

    async fn set_status(&self, outcome: &ReconcileOutcome) -> Result<()>;

    async fn set_workload_version(&self, version: &str) -> Result<()>;
}

/// Queries the running workload for its version.
#[async_trait]
pub trait VersionProbe: Send + Sync {
    async fn version(&self, port: u16) -> Result<String>;
}
