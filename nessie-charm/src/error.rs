//! Charm error types.

use thiserror::Error;

/// Errors that can occur while handling a hook.
#[derive(Debug, Error)]
pub enum CharmError {
    /// Pebble socket is not answering yet.
    #[error("supervisor unreachable: {0}")]
    SupervisorUnreachable(String),

    /// A layer was requested without usable database credentials.
    #[error("database connection not ready: {0}")]
    ConnectionNotReady(String),

    /// Operator-supplied configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Workload version could not be queried.
    #[error("version probe failed: {0}")]
    VersionProbe(String),

    /// Pebble answered with an error.
    #[error("pebble API error (status {status}): {message}")]
    Pebble { status: u16, message: String },

    /// Transport-level HTTP failure.
    #[error("http: {0}")]
    Http(String),

    /// A Juju hook tool exited unsuccessfully or could not be spawned.
    #[error("hook tool {tool} failed: {message}")]
    HookTool { tool: String, message: String },

    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for charm operations.
pub type Result<T> = std::result::Result<T, CharmError>;
