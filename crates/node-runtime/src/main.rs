//! # Skipchain Node Runtime
//!
//! Entry point of the skipchain collective.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (environment, `SC_*`)
//! 2. Initialize logging with the `SC_LOG` filter
//! 3. Boot the collective and run genesis, production and catch-up
//! 4. Report the proven head

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::{load_config, NodeRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;

    let runtime = NodeRuntime::new(config);
    let summary = runtime.run().await?;

    info!(
        "✅ Replicated {} block(s) across {} authorities; lagging node stored {} new, {} known",
        summary.height + 1,
        summary.authorities,
        summary.caught_up.inserted,
        summary.caught_up.skipped
    );
    Ok(())
}
