//! nessie-charm: hook entry point.
//!
//! Juju runs this binary once per hook (via `dispatch`) with
//! `JUJU_DISPATCH_PATH` naming the hook. The binary reconciles once,
//! reports the unit status and exits.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use nessie_charm::clients::{HookTools, HttpVersionProbe, PebbleClient};
use nessie_charm::{CharmSettings, HookEvent, Reconciler};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Nessie charm
#[derive(Parser, Debug)]
#[command(name = "nessie-charm", version, about)]
struct Args {
    /// Hook being dispatched (e.g. hooks/config-changed)
    #[arg(long, env = "JUJU_DISPATCH_PATH")]
    dispatch_path: String,

    /// Unit name, for logging only
    #[arg(long, env = "JUJU_UNIT_NAME", default_value = "nessie/0")]
    unit_name: String,

    /// Pebble socket of the workload container
    /// (defaults to /charm/containers/<container>/pebble.socket)
    #[arg(long, env = "NESSIE_PEBBLE_SOCKET")]
    pebble_socket: Option<PathBuf>,

    /// Directory with the Juju hook tools (defaults to PATH lookup)
    #[arg(long, env = "NESSIE_HOOK_TOOLS_DIR")]
    hook_tools_dir: Option<PathBuf>,

    /// Host the workload version probe connects to
    #[arg(long, default_value = "localhost")]
    workload_host: String,

    /// Timeout for the workload version probe in seconds
    #[arg(long, default_value = "5")]
    version_timeout: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Juju captures stderr into debug-log.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nessie_charm=info,hyper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let settings = CharmSettings::default();

    let event = HookEvent::from_dispatch_path(
        &args.dispatch_path,
        &settings.container,
        &settings.database_relation,
    );
    info!(unit = %args.unit_name, hook = %args.dispatch_path, event = %event, "Dispatching");

    let socket = args
        .pebble_socket
        .unwrap_or_else(|| PebbleClient::socket_for_container(&settings.container));
    let supervisor = PebbleClient::new(socket);
    let model = HookTools::new(args.hook_tools_dir);
    let probe = HttpVersionProbe::new(args.workload_host)
        .with_timeout(Duration::from_secs(args.version_timeout));

    let reconciler = Reconciler::new(settings);
    let outcome = reconciler
        .dispatch(&event, &model, &supervisor, &probe)
        .await
        .context("Failed to report unit status")?;

    match outcome {
        Some(outcome) => info!(status = %outcome, "Hook finished"),
        None => info!("Hook ignored"),
    }

    Ok(())
}
