//! Song ingestion command.

use clap::Args;
use lyrebird_engine::ingest_file;
use lyrebird_store::FingerprintStore;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct IngestArgs {
    /// Audio file to fingerprint
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Song name (defaults to the file stem)
    #[arg(short, long)]
    name: Option<String>,

    /// Artist name
    #[arg(short, long, default_value = "unknown")]
    artist: String,
}

pub async fn run(args: IngestArgs, config: &Path) -> anyhow::Result<()> {
    let store = super::open_store(config).await?;

    let name = args.name.unwrap_or_else(|| {
        args.file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    });

    let report = ingest_file(&store, &args.file, &name, &args.artist).await?;
    println!(
        "Added song #{}: '{}' by '{}' ({} fingerprints from {} peaks)",
        report.song_id, name, args.artist, report.fingerprints, report.peaks
    );

    store.close().await;
    Ok(())
}
