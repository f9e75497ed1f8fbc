//! Song deletion command.

use clap::Args;
use lyrebird_store::FingerprintStore;
use std::path::Path;

#[derive(Args)]
pub struct DeleteArgs {
    /// Id of the song to delete
    #[arg(value_name = "ID")]
    id: i32,
}

pub async fn run(args: DeleteArgs, config: &Path) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;
    store.delete_song(args.id).await?;
    println!("Deleted song #{}", args.id);

    store.close().await;
    Ok(())
}
