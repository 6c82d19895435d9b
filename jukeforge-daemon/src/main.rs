//! # jukeforge
//!
//! The Jukeforge music bot daemon.
//!
//! On startup the daemon:
//! - Loads `$XDG_CONFIG_HOME/jukeforge/config.toml`, creating a documented default
//! - Registers the built-in playback factories, providers and suggesters
//! - Configures and initializes every enabled plugin
//!
//! It then runs until interrupted and closes all plugins on the way out.
//!
//! ## Running
//!
//! ```bash
//! # Start the daemon
//! cargo run --bin jukeforge
//!
//! # With debug logging
//! RUST_LOG=debug cargo run --bin jukeforge
//! ```

use anyhow::Result;
use jukeforge_daemon::config::Config;
use jukeforge_daemon::init_writer::TracingInitStateWriter;
use jukeforge_daemon::manager::{InitReport, ProviderManager};
use jukeforge_plugin_api::{PlaybackFactoryManager, ProviderRef, SuggesterRef};
use provider_dummy::{DummyPlaybackFactory, DummyProvider, DummySuggester};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn log_report(kind: &str, report: &InitReport) {
    info!("Activated {} {}(s): {:?}", report.activated.len(), kind, report.activated);
    for failure in &report.failed {
        warn!("{} {} unavailable: {}", kind, failure.id, failure.reason);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so the configured level applies
    let (config, config_error) = match Config::load_default() {
        Ok(cfg) => (cfg, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.daemon.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Starting jukeforge v{}", env!("CARGO_PKG_VERSION"));
    match config_error {
        None => info!("Loaded configuration from default path"),
        Some(e) => warn!("Failed to load config, using defaults: {:#}", e),
    }

    let mut playback_factories = PlaybackFactoryManager::new();
    playback_factories.register(DummyPlaybackFactory);

    let mut manager = ProviderManager::new();
    manager.register_provider(ProviderRef::raw(DummyProvider::new()))?;
    manager.register_suggester(SuggesterRef::raw(DummySuggester::new("dummy")))?;

    manager.initialize(&config, Arc::new(playback_factories))?;

    let writer = TracingInitStateWriter::new();
    let providers = manager.initialize_providers(&writer).await?;
    log_report("provider", &providers);
    let suggesters = manager.initialize_suggesters(&writer).await?;
    log_report("suggester", &suggesters);

    for status in manager.status()? {
        info!(
            "{} {} ({}): {}{}",
            status.kind,
            status.id,
            status.name,
            status.state,
            status
                .last_error
                .map(|e| format!(" - {}", e))
                .unwrap_or_default()
        );
    }

    info!("Daemon startup complete");
    info!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    manager.close().await?;

    info!("Daemon stopped");
    Ok(())
}
