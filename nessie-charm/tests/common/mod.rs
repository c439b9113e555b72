//! In-memory stand-ins for Pebble, the Juju hook tools and the workload.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use nessie_charm::clients::{Model, Supervisor, VersionProbe};
use nessie_charm::config::RawConfig;
use nessie_charm::error::{CharmError, Result};
use nessie_charm::layer::{Layer, Plan};
use nessie_charm::relation::{RelationBag, RelationSnapshot};
use nessie_charm::ReconcileOutcome;

pub fn bag(pairs: &[(&str, &str)]) -> RelationBag {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn postgres_bag() -> RelationBag {
    bag(&[
        ("endpoints", "10.0.0.5:5432"),
        ("username", "u"),
        ("password", "p"),
    ])
}

pub fn config(port: u16, log_level: &str) -> RawConfig {
    RawConfig {
        webui_port: Some(serde_json::json!(port)),
        log_level: Some(log_level.to_string()),
    }
}

/// Call on which a reachable [`FakeSupervisor`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    GetPlan,
    AddLayer,
    /// Only the first restart fails.
    FirstRestart,
}

/// Pebble with a plan held in memory.
#[derive(Default)]
pub struct FakeSupervisor {
    pub reachable: bool,
    pub fault: Mutex<Option<Fault>>,
    pub plan: Mutex<Plan>,
    pub layers_added: Mutex<Vec<(String, Layer)>>,
    pub restarts: Mutex<Vec<Vec<String>>>,
    pub replans: Mutex<u32>,
}

impl FakeSupervisor {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Reachable, but `fault` fails.
    pub fn failing(fault: Fault) -> Self {
        Self {
            reachable: true,
            fault: Mutex::new(Some(fault)),
            ..Default::default()
        }
    }

    fn fails(&self, fault: Fault) -> bool {
        *self.fault.lock().unwrap() == Some(fault)
    }

    pub fn install_count(&self) -> usize {
        self.layers_added.lock().unwrap().len()
    }

    pub fn restart_count(&self) -> usize {
        self.restarts.lock().unwrap().len()
    }

    pub fn replan_count(&self) -> u32 {
        *self.replans.lock().unwrap()
    }

    pub fn last_layer(&self) -> Option<Layer> {
        self.layers_added
            .lock()
            .unwrap()
            .last()
            .map(|(_, layer)| layer.clone())
    }
}

#[async_trait]
impl Supervisor for FakeSupervisor {
    async fn can_connect(&self) -> bool {
        self.reachable
    }

    async fn get_plan(&self) -> Result<Plan> {
        if !self.reachable {
            return Err(CharmError::SupervisorUnreachable("fake".to_string()));
        }
        if self.fails(Fault::GetPlan) {
            return Err(CharmError::SupervisorUnreachable(
                "connection reset by peer".to_string(),
            ));
        }
        Ok(self.plan.lock().unwrap().clone())
    }

    async fn add_layer(&self, label: &str, layer: &Layer, _combine: bool) -> Result<()> {
        if !self.reachable {
            return Err(CharmError::SupervisorUnreachable("fake".to_string()));
        }
        if self.fails(Fault::AddLayer) {
            return Err(CharmError::Pebble {
                status: 400,
                message: "cannot parse layer".to_string(),
            });
        }
        let mut plan = self.plan.lock().unwrap();
        for (name, service) in &layer.services {
            plan.services.insert(name.clone(), service.clone());
        }
        self.layers_added
            .lock()
            .unwrap()
            .push((label.to_string(), layer.clone()));
        Ok(())
    }

    async fn restart(&self, services: &[String]) -> Result<()> {
        let mut fault = self.fault.lock().unwrap();
        if *fault == Some(Fault::FirstRestart) {
            *fault = None;
            return Err(CharmError::Pebble {
                status: 200,
                message: "change timed out".to_string(),
            });
        }
        drop(fault);
        self.restarts.lock().unwrap().push(services.to_vec());
        Ok(())
    }

    async fn replan(&self) -> Result<()> {
        *self.replans.lock().unwrap() += 1;
        Ok(())
    }
}

/// Juju model with config, relations and recorded side effects.
pub struct FakeModel {
    pub config: Mutex<RawConfig>,
    pub relations: Mutex<RelationSnapshot>,
    pub leader: bool,
    pub opened_ports: Mutex<Vec<u16>>,
    pub statuses: Mutex<Vec<ReconcileOutcome>>,
    pub versions: Mutex<Vec<String>>,
    pub app_data: Mutex<Vec<(String, String, String)>>,
}

impl FakeModel {
    pub fn new(config: RawConfig) -> Self {
        Self {
            config: Mutex::new(config),
            relations: Mutex::new(RelationSnapshot::new()),
            leader: true,
            opened_ports: Mutex::new(Vec::new()),
            statuses: Mutex::new(Vec::new()),
            versions: Mutex::new(Vec::new()),
            app_data: Mutex::new(Vec::new()),
        }
    }

    pub fn with_relation(self, id: &str, bag: RelationBag) -> Self {
        self.relations.lock().unwrap().push(id, bag);
        self
    }

    pub fn set_relations(&self, snapshot: RelationSnapshot) {
        *self.relations.lock().unwrap() = snapshot;
    }

    pub fn set_config(&self, config: RawConfig) {
        *self.config.lock().unwrap() = config;
    }

    pub fn last_status(&self) -> Option<ReconcileOutcome> {
        self.statuses.lock().unwrap().last().cloned()
    }

    pub fn ports(&self) -> Vec<u16> {
        self.opened_ports.lock().unwrap().clone()
    }
}

#[async_trait]
impl Model for FakeModel {
    async fn config(&self) -> Result<RawConfig> {
        Ok(self.config.lock().unwrap().clone())
    }

    async fn relation_ids(&self, _relation: &str) -> Result<Vec<String>> {
        Ok(self
            .relations
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.to_string())
            .collect())
    }

    async fn relation_snapshot(&self, _relation: &str) -> Result<RelationSnapshot> {
        Ok(self.relations.lock().unwrap().clone())
    }

    async fn set_app_relation_data(
        &self,
        relation_id: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.app_data.lock().unwrap().push((
            relation_id.to_string(),
            key.to_string(),
            value.to_string(),
        ));
        Ok(())
    }

    async fn is_leader(&self) -> Result<bool> {
        Ok(self.leader)
    }

    async fn set_ports(&self, ports: &[u16]) -> Result<()> {
        *self.opened_ports.lock().unwrap() = ports.to_vec();
        Ok(())
    }

    async fn set_status(&self, outcome: &ReconcileOutcome) -> Result<()> {
        self.statuses.lock().unwrap().push(outcome.clone());
        Ok(())
    }

    async fn set_workload_version(&self, version: &str) -> Result<()> {
        self.versions.lock().unwrap().push(version.to_string());
        Ok(())
    }
}

/// Version probe with a canned answer; `None` fails.
pub struct FakeProbe(pub Option<String>);

#[async_trait]
impl VersionProbe for FakeProbe {
    async fn version(&self, _port: u16) -> Result<String> {
        self.0
            .clone()
            .ok_or_else(|| CharmError::VersionProbe("connection refused".to_string()))
    }
}
