//! Initialisation du système de logs
//!
//! `RUST_LOG` a priorité ; sinon le niveau minimal vient de la configuration
//! (`host.logger.min_level`).

use anyhow::{Result, anyhow};
use boxartconfig::Config;
use tracing_subscriber::EnvFilter;

pub fn init_logging(config: &Config) -> Result<()> {
    if !config.get_log_enable_console()? {
        return Ok(());
    }

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.get_log_min_level()?.to_lowercase())
            .unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to set tracing subscriber: {}", e))
}
