//! Unit status reported back to Juju.

use std::fmt;

/// Final result of handling one hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Active,
    Waiting(String),
    Blocked(String),
    Maintenance(String),
}

impl ReconcileOutcome {
    /// Status name as passed to `status-set`.
    pub fn name(&self) -> &'static str {
        match self {
            ReconcileOutcome::Active => "active",
            ReconcileOutcome::Waiting(_) => "waiting",
            ReconcileOutcome::Blocked(_) => "blocked",
            ReconcileOutcome::Maintenance(_) => "maintenance",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ReconcileOutcome::Active => "",
            ReconcileOutcome::Waiting(m)
            | ReconcileOutcome::Blocked(m)
            | ReconcileOutcome::Maintenance(m) => m,
        }
    }

    pub fn waiting(reason: impl Into<String>) -> Self {
        ReconcileOutcome::Waiting(reason.into())
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        ReconcileOutcome::Blocked(reason.into())
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::Active => write!(f, "active"),
            other => write!(f, "{}: {}", other.name(), other.message()),
        }
    }
}
