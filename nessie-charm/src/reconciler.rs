//! Reconciler - converges the Pebble layer with config and the database relation.
//!
//! Each hook runs one pass:
//! config -> port -> supervisor check -> connection parameters -> layer
//! -> compare with plan -> install + restart if changed, replan otherwise -> status.
//! Any failing step ends the pass with the status it maps to.

use tracing::{debug, error, info, warn};

use crate::clients::{Model, Supervisor, VersionProbe};
use crate::config::{CharmConfig, CharmSettings};
use crate::error::{CharmError, Result};
use crate::event::HookEvent;
use crate::layer::{self, Layer};
use crate::relation::{self, DatabaseState};
use crate::status::ReconcileOutcome;

pub const WAITING_FOR_PEBBLE: &str = "waiting for Pebble API";
pub const WAITING_FOR_DATABASE: &str = "waiting for database relation";

fn blocked_from(e: CharmError) -> ReconcileOutcome {
    match e {
        CharmError::InvalidConfig(msg) => ReconcileOutcome::blocked(msg),
        other => ReconcileOutcome::blocked(other.to_string()),
    }
}

/// Handles hook events for the Nessie workload.
pub struct Reconciler {
    settings: CharmSettings,
}

impl Reconciler {
    pub fn new(settings: CharmSettings) -> Self {
        Self { settings }
    }

    /// Handle one event. `None` means the event is not ours and status is left alone.
    pub async fn handle(
        &self,
        event: &HookEvent,
        model: &dyn Model,
        supervisor: &dyn Supervisor,
        probe: &dyn VersionProbe,
    ) -> Option<ReconcileOutcome> {
        info!(event = %event, "Handling hook");

        match event {
            HookEvent::Ignored(name) => {
                debug!(hook = %name, "Nothing to do");
                None
            }
            HookEvent::DatabaseBroken => {
                info!("Database relation removed, leaving the plan untouched");
                Some(ReconcileOutcome::waiting(WAITING_FOR_DATABASE))
            }
            HookEvent::DatabaseRequested => {
                self.request_database(model).await;
                Some(self.converge(model, supervisor, probe).await)
            }
            HookEvent::WorkloadReady
            | HookEvent::ConfigChanged
            | HookEvent::DatabaseChanged
            | HookEvent::Refresh => Some(self.converge(model, supervisor, probe).await),
        }
    }

    /// Handle one event and report the outcome as the unit status.
    pub async fn dispatch(
        &self,
        event: &HookEvent,
        model: &dyn Model,
        supervisor: &dyn Supervisor,
        probe: &dyn VersionProbe,
    ) -> Result<Option<ReconcileOutcome>> {
        let outcome = self.handle(event, model, supervisor, probe).await;
        if let Some(outcome) = &outcome {
            info!(status = %outcome, "Reporting status");
            model.set_status(outcome).await?;
        }
        Ok(outcome)
    }

    /// Ask the provider for our database by publishing its name (leader only).
    async fn request_database(&self, model: &dyn Model) {
        match model.is_leader().await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Not leader, skipping database request");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to query leadership");
                return;
            }
        }

        let ids = match model.relation_ids(&self.settings.database_relation).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to list database relations");
                return;
            }
        };

        for id in ids {
            match model
                .set_app_relation_data(&id, "database", &self.settings.database_name)
                .await
            {
                Ok(()) => info!(
                    relation = %id,
                    database = %self.settings.database_name,
                    "Requested database"
                ),
                Err(e) => warn!(relation = %id, error = %e, "Failed to request database"),
            }
        }
    }

    /// One full convergence pass.
    async fn converge(
        &self,
        model: &dyn Model,
        supervisor: &dyn Supervisor,
        probe: &dyn VersionProbe,
    ) -> ReconcileOutcome {
        let raw = match model.config().await {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "Failed to read config");
                return ReconcileOutcome::waiting(format!("failed to read config: {e}"));
            }
        };

        // The port is applied before anything else can fail.
        let port = match CharmConfig::parse_port(&raw) {
            Ok(port) => port,
            Err(e) => return blocked_from(e),
        };
        if let Err(e) = model.set_ports(&[port]).await {
            error!(port, error = %e, "Failed to open port");
            return ReconcileOutcome::waiting(format!("failed to open port {port}: {e}"));
        }

        let config = match CharmConfig::from_raw(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Invalid configuration");
                return blocked_from(e);
            }
        };

        if !supervisor.can_connect().await {
            info!(container = %self.settings.container, "Pebble not ready, deferring");
            return ReconcileOutcome::waiting(WAITING_FOR_PEBBLE);
        }

        let snapshot = match model
            .relation_snapshot(&self.settings.database_relation)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Failed to read database relation");
                return ReconcileOutcome::waiting(WAITING_FOR_DATABASE);
            }
        };

        let database =
            relation::derive_connection_parameters(&snapshot, &self.settings.database_name);
        if let DatabaseState::NotReady(reason) = &database {
            info!(reason = %reason, "Database not ready");
            return ReconcileOutcome::waiting(WAITING_FOR_DATABASE);
        }

        let desired = match layer::build_descriptor(&database, &self.settings, &config) {
            Ok(desired) => desired,
            Err(e) => {
                warn!(error = %e, "Cannot build layer");
                return ReconcileOutcome::waiting(WAITING_FOR_DATABASE);
            }
        };

        let changed = match self.install(model, supervisor, &desired).await {
            Ok(changed) => changed,
            Err(e @ CharmError::SupervisorUnreachable(_)) => {
                warn!(error = %e, "Lost Pebble connection");
                return ReconcileOutcome::waiting(WAITING_FOR_PEBBLE);
            }
            Err(e) => {
                error!(error = %e, "Failed to apply layer");
                return ReconcileOutcome::waiting(format!("failed to apply layer: {e}"));
            }
        };

        if changed {
            let version = self.workload_version(probe, config.webui_port).await;
            if let Err(e) = model.set_workload_version(&version).await {
                warn!(error = %e, "Failed to set workload version");
            }
        } else {
            // The plan can match while the process still runs an older config,
            // e.g. after a restart that failed once the layer was added.
            // Replan restarts such services and is a no-op otherwise.
            match supervisor.replan().await {
                Ok(()) => {}
                Err(e @ CharmError::SupervisorUnreachable(_)) => {
                    warn!(error = %e, "Lost Pebble connection");
                    return ReconcileOutcome::waiting(WAITING_FOR_PEBBLE);
                }
                Err(e) => {
                    error!(error = %e, "Replan failed");
                    return ReconcileOutcome::waiting(format!("failed to start workload: {e}"));
                }
            }
        }

        info!(changed, log_level = %config.log_level, "Workload converged");
        ReconcileOutcome::Active
    }

    /// Install `desired` and restart the service if it differs from the active plan.
    ///
    /// Returns whether anything was changed.
    async fn install(
        &self,
        model: &dyn Model,
        supervisor: &dyn Supervisor,
        desired: &Layer,
    ) -> Result<bool> {
        let current = supervisor.get_plan().await?;
        if !layer::services_changed(&current, desired) {
            debug!(service = %self.settings.service, "Plan already up to date");
            return Ok(false);
        }

        let maintenance =
            ReconcileOutcome::Maintenance(format!("updating {} layer", self.settings.service));
        if let Err(e) = model.set_status(&maintenance).await {
            debug!(error = %e, "Failed to set maintenance status");
        }

        supervisor
            .add_layer(&self.settings.service, desired, true)
            .await?;
        supervisor
            .restart(std::slice::from_ref(&self.settings.service))
            .await?;
        Ok(true)
    }

    /// Workload version, or an empty string when it cannot be determined.
    async fn workload_version(&self, probe: &dyn VersionProbe, port: u16) -> String {
        match probe.version(port).await {
            Ok(version) => version,
            Err(e) => {
                warn!(error = %e, "Failed to query workload version");
                String::new()
            }
        }
    }
}
