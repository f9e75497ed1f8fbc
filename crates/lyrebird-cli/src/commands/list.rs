//! Song listing command.

use clap::Args;
use lyrebird_store::FingerprintStore;
use std::path::Path;

#[derive(Args)]
pub struct ListArgs {}

pub async fn run(_args: ListArgs, config: &Path) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;
    let songs = store.list_songs().await?;

    if songs.is_empty() {
        println!("No songs in the database");
    } else {
        for song in &songs {
            println!(
                "ID: {} | Name: {} | Artist: {} | Fingerprinted: {} | Hashes: {} | Created: {}",
                song.id,
                song.name,
                song.artist,
                song.fingerprinted,
                song.total_hashes,
                song.date_created.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    store.close().await;
    Ok(())
}
