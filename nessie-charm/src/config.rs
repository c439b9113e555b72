//! Charm configuration.
//!
//! Two layers: [`CharmSettings`] holds the values baked into the charm
//! (container, service and relation names), [`CharmConfig`] is what the
//! operator sets with `juju config` and is validated on every hook.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{CharmError, Result};

/// Default Nessie HTTP port.
pub const DEFAULT_WEBUI_PORT: u16 = 19120;

/// Static names the charm is built around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharmSettings {
    /// Workload container name in `metadata.yaml`.
    pub container: String,
    /// Pebble service (and layer label) name.
    pub service: String,
    /// Entrypoint of the workload image.
    pub command: String,
    /// Name of the PostgreSQL relation endpoint.
    pub database_relation: String,
    /// Database requested from the provider.
    pub database_name: String,
}

impl Default for CharmSettings {
    fn default() -> Self {
        Self {
            container: "nessie".to_string(),
            service: "nessie".to_string(),
            command: "/usr/local/s2i/run".to_string(),
            database_relation: "database".to_string(),
            database_name: "names_db".to_string(),
        }
    }
}

/// Log levels accepted by the `log-level` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub const VALID: [&'static str; 5] = ["info", "debug", "warning", "error", "critical"];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }

    /// Level name as understood by the Quarkus runtime in the workload image.
    pub fn quarkus_level(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "FATAL",
        }
    }
}

impl FromStr for LogLevel {
    type Err = CharmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            _ => Err(CharmError::InvalidConfig(format!("invalid log level: '{s}'"))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw option values as returned by `config-get --format=json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    #[serde(rename = "webui-port")]
    pub webui_port: Option<serde_json::Value>,
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

/// Validated operator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharmConfig {
    pub webui_port: u16,
    pub log_level: LogLevel,
}

impl Default for CharmConfig {
    fn default() -> Self {
        Self {
            webui_port: DEFAULT_WEBUI_PORT,
            log_level: LogLevel::Info,
        }
    }
}

impl CharmConfig {
    /// Parse only the port, so it can be applied even when other options are bad.
    pub fn parse_port(raw: &RawConfig) -> Result<u16> {
        let Some(value) = raw.webui_port.as_ref() else {
            return Ok(DEFAULT_WEBUI_PORT);
        };

        // Juju hands integers over as JSON numbers, but accept numeric strings too.
        let port = match value {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };

        match port {
            Some(p) if (1..=u16::MAX as u64).contains(&p) => Ok(p as u16),
            _ => Err(CharmError::InvalidConfig(format!(
                "invalid webui-port: {value}"
            ))),
        }
    }

    /// Validate every option.
    pub fn from_raw(raw: &RawConfig) -> Result<Self> {
        let webui_port = Self::parse_port(raw)?;
        let log_level = match raw.log_level.as_deref() {
            Some(level) => level.parse()?,
            None => LogLevel::default(),
        };
        Ok(Self {
            webui_port,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_log_level_case_insensitive() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!(" Warning ".parse::<LogLevel>().unwrap(), LogLevel::Warning);
    }

    #[test]
    fn test_log_level_rejects_trace() {
        let err = "trace".parse::<LogLevel>().unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: invalid log level: 'trace'");
    }

    #[test]
    fn test_every_valid_level_parses() {
        for name in LogLevel::VALID {
            assert_eq!(name.parse::<LogLevel>().unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_quarkus_mapping() {
        assert_eq!(LogLevel::Warning.quarkus_level(), "WARN");
        assert_eq!(LogLevel::Critical.quarkus_level(), "FATAL");
    }

    #[test]
    fn test_config_defaults_when_unset() {
        let cfg = CharmConfig::from_raw(&RawConfig::default()).unwrap();
        assert_eq!(cfg, CharmConfig::default());
    }

    #[test]
    fn test_config_from_json() {
        let cfg = CharmConfig::from_raw(&raw(json!({"webui-port": 8080, "log-level": "error"})))
            .unwrap();
        assert_eq!(cfg.webui_port, 8080);
        assert_eq!(cfg.log_level, LogLevel::Error);
    }

    #[test]
    fn test_port_out_of_range() {
        assert!(CharmConfig::parse_port(&raw(json!({"webui-port": 0}))).is_err());
        assert!(CharmConfig::parse_port(&raw(json!({"webui-port": 70000}))).is_err());
        assert!(CharmConfig::parse_port(&raw(json!({"webui-port": "abc"}))).is_err());
        assert_eq!(
            CharmConfig::parse_port(&raw(json!({"webui-port": "9000"}))).unwrap(),
            9000
        );
    }

    #[test]
    fn test_port_valid_even_if_log_level_bad() {
        let r = raw(json!({"webui-port": 8080, "log-level": "trace"}));
        assert_eq!(CharmConfig::parse_port(&r).unwrap(), 8080);
        assert!(CharmConfig::from_raw(&r).is_err());
    }
}
