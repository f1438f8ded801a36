// Path: crates/node/src/telemetry.rs
//! Structured logging for the node binaries.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Noisy HTTP internals are capped at `warn` unless `RUST_LOG` says
/// otherwise; everything of ours defaults to `info`.
const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Installs the global subscriber: JSON lines on stderr, `RUST_LOG`
/// overridable. The `service` name is emitted once at startup so
/// co-located binaries stay distinguishable in a shared log stream.
pub fn init_tracing(service: &'static str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(false),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {e}"))?;

    tracing::info!(service, "logging initialized");
    Ok(())
}
