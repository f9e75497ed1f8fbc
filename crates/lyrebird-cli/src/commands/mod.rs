//! CLI subcommands.

pub mod cleanup;
pub mod delete;
pub mod devices;
pub mod ingest;
pub mod list;
pub mod listen;
pub mod recognize;

use anyhow::Context;
use lyrebird_store::{Config, MySqlStore};
use std::path::Path;

/// Load configuration and open the fingerprint store.
pub(crate) async fn open_store(config_path: &Path) -> anyhow::Result<MySqlStore> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    MySqlStore::connect(&config.database)
        .await
        .context("failed to connect to the fingerprint store")
}
