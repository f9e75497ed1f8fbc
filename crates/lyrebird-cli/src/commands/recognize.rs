//! File recognition command.

use clap::Args;
use lyrebird_engine::recognize_file;
use lyrebird_store::FingerprintStore;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct RecognizeArgs {
    /// Audio file to recognise
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

pub async fn run(args: RecognizeArgs, config: &Path) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;
    let matches = recognize_file(&store, &args.file).await?;

    if matches.is_empty() {
        println!("No matches found");
    } else {
        println!("Found matches:");
        for (i, m) in matches.iter().enumerate() {
            println!(
                "{}. {} by {} (score: {:.3}, offset: {}ms)",
                i + 1,
                m.name,
                m.artist,
                m.score,
                m.offset_ms
            );
        }
    }

    store.close().await;
    Ok(())
}
