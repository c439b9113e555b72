//! nessie-charm - Juju sidecar charm for the Nessie version store.
//!
//! Every hook invocation runs one reconcile pass: read config and the
//! `database` relation, build the Pebble layer for the `nessie` service,
//! install it and restart the service when it differs from the active plan,
//! then report the unit status.
//!
//! ## Architecture
//!
//! - **Reconciler**: per-hook convergence and status mapping
//! - **Clients**: Pebble (unix socket HTTP), Juju hook tools, workload version probe
//! - **Layer / Relation**: pure builders for the process descriptor and connection parameters

pub mod clients;
pub mod config;
pub mod error;
pub mod event;
pub mod layer;
pub mod reconciler;
pub mod relation;
pub mod status;

pub use config::{CharmConfig, CharmSettings, LogLevel};
pub use error::{CharmError, Result};
pub use event::HookEvent;
pub use reconciler::Reconciler;
pub use status::ReconcileOutcome;
