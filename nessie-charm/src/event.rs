//! Hook events the charm reacts to.

use std::fmt;

/// A Juju hook, decoded from the dispatch path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    /// `<container>-pebble-ready`
    WorkloadReady,
    ConfigChanged,
    /// `database-relation-joined`: ask the provider for our database.
    DatabaseRequested,
    /// `database-relation-changed`: credentials created or endpoints changed.
    DatabaseChanged,
    DatabaseBroken,
    /// `upgrade-charm` / `update-status`
    Refresh,
    Ignored(String),
}

impl HookEvent {
    /// Decode a dispatch path such as `hooks/config-changed`.
    pub fn from_dispatch_path(path: &str, container: &str, relation: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);

        if name == format!("{container}-pebble-ready") {
            return HookEvent::WorkloadReady;
        }

        if let Some(suffix) = name
            .strip_prefix(relation)
            .and_then(|rest| rest.strip_prefix("-relation-"))
        {
            return match suffix {
                "joined" => HookEvent::DatabaseRequested,
                "changed" => HookEvent::DatabaseChanged,
                "broken" => HookEvent::DatabaseBroken,
                _ => HookEvent::Ignored(name.to_string()),
            };
        }

        match name {
            "config-changed" => HookEvent::ConfigChanged,
            "upgrade-charm" | "update-status" => HookEvent::Refresh,
            other => HookEvent::Ignored(other.to_string()),
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookEvent::WorkloadReady => write!(f, "workload-ready"),
            HookEvent::ConfigChanged => write!(f, "config-changed"),
            HookEvent::DatabaseRequested => write!(f, "database-requested"),
            HookEvent::DatabaseChanged => write!(f, "database-changed"),
            HookEvent::DatabaseBroken => write!(f, "database-broken"),
            HookEvent::Refresh => write!(f, "refresh"),
            HookEvent::Ignored(name) => write!(f, "ignored ({name})"),
        }
    }
}
