//! Pebble layer (process descriptor) for the Nessie workload.
//!
//! The layer is rebuilt from scratch on every hook and compared against
//! the active Pebble plan; it is never patched in place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{CharmConfig, CharmSettings};
use crate::error::{CharmError, Result};
use crate::relation::DatabaseState;

/// Environment variable names expected by the workload image.
pub mod env {
    pub const STORE_TYPE: &str = "NESSIE_VERSION_STORE_TYPE";
    pub const JDBC_URL: &str = "QUARKUS_DATASOURCE_JDBC_URL";
    pub const DB_HOST: &str = "DEMO_SERVER_DB_HOST";
    pub const DB_PORT: &str = "DEMO_SERVER_DB_PORT";
    pub const DB_USER: &str = "DEMO_SERVER_DB_USER";
    pub const DB_PASSWORD: &str = "DEMO_SERVER_DB_PASSWORD";
    pub const HTTP_PORT: &str = "QUARKUS_HTTP_PORT";
    pub const LOG_LEVEL: &str = "QUARKUS_LOG_LEVEL";

    /// Version store backend used when a database is related.
    pub const STORE_TYPE_JDBC: &str = "JDBC";
}

/// How a layer's service entry merges with earlier layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Override {
    #[default]
    Replace,
}

/// Whether Pebble starts the service on replan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Startup {
    Enabled,
    #[default]
    Disabled,
}

/// One service entry of a layer or plan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(rename = "override", default)]
    pub override_: Override,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub startup: Startup,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

/// A Pebble configuration layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Layer {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceDescriptor>,
}

impl Layer {
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// The combined plan Pebble is currently running.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub services: BTreeMap<String, ServiceDescriptor>,
}

impl Plan {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty plan comes back as an empty document.
        if yaml.trim().is_empty() || yaml.trim() == "{}" {
            return Ok(Plan::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Build the desired layer for the current database state and config.
pub fn build_descriptor(
    database: &DatabaseState,
    settings: &CharmSettings,
    config: &CharmConfig,
) -> Result<Layer> {
    let params = match database {
        DatabaseState::Ready(params) => params,
        DatabaseState::NotReady(reason) => {
            return Err(CharmError::ConnectionNotReady(reason.to_string()));
        }
    };

    let environment = BTreeMap::from([
        (env::STORE_TYPE.to_string(), env::STORE_TYPE_JDBC.to_string()),
        (env::JDBC_URL.to_string(), params.jdbc_url()),
        (env::DB_HOST.to_string(), params.host.clone()),
        (env::DB_PORT.to_string(), params.port.clone()),
        (env::DB_USER.to_string(), params.username.clone()),
        (env::DB_PASSWORD.to_string(), params.password.clone()),
        (env::HTTP_PORT.to_string(), config.webui_port.to_string()),
        (
            env::LOG_LEVEL.to_string(),
            config.log_level.quarkus_level().to_string(),
        ),
    ]);

    let service = ServiceDescriptor {
        override_: Override::Replace,
        summary: settings.service.clone(),
        command: settings.command.clone(),
        startup: Startup::Enabled,
        environment,
    };

    Ok(Layer {
        summary: format!("{} layer", settings.service),
        description: format!("pebble config layer for {}", settings.service),
        services: BTreeMap::from([(settings.service.clone(), service)]),
    })
}

/// Whether installing `desired` would change the running services.
///
/// Only the services are compared; layer summary and description are ignored.
pub fn services_changed(current: &Plan, desired: &Layer) -> bool {
    current.services != desired.services
}
