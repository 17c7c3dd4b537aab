// SPDX-License-Identifier: MIT OR Apache-2.0
//! nodeflow demo host
//!
//! Loads an engine configuration, installs logging, registers the built-in
//! catalog and evaluates a sample graph.
//!
//! ## Usage
//!
//! `nodeflow [config.ron]`. Without an argument the default configuration
//! is used. `RUST_LOG` takes precedence over the configured log filter.

mod app;

use app::AppError;
use nodeflow_core::EngineConfig;
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<EngineConfig, AppError> {
    match std::env::args().nth(1) {
        Some(path) => Ok(EngineConfig::load(Path::new(&path))?),
        None => Ok(EngineConfig::default()),
    }
}

fn init_logging(config: &EngineConfig) -> Result<(), AppError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    Ok(())
}

fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    tracing::info!("Starting nodeflow v{}", env!("CARGO_PKG_VERSION"));

    match app::run(config) {
        Ok(summary) => tracing::info!(
            "Demo finished: result {}, {} -> {} connections across undo/redo, {} passes",
            summary.result,
            summary.connections_after_undo,
            summary.connections_after_redo,
            summary.stats.passes
        ),
        Err(e) => {
            tracing::error!("Demo failed: {e}");
            std::process::exit(1);
        }
    }
}
