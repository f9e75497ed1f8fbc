//! Duplicate cleanup command.

use clap::Args;
use lyrebird_store::FingerprintStore;
use std::path::Path;

#[derive(Args)]
pub struct CleanupArgs {}

pub async fn run(_args: CleanupArgs, config: &Path) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;
    let removed = store.cleanup().await?;

    if removed == 0 {
        println!("No duplicate songs found");
    } else {
        println!("Removed {removed} duplicate song(s)");
    }

    store.close().await;
    Ok(())
}
