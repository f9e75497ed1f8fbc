//! Lyrebird CLI - song ingestion and recognition against a fingerprint index.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lyrebird")]
#[command(author, version, about = "Audio fingerprinting and recognition", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true, default_value = "configs/config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint an audio file and add it to the database
    Ingest(commands::ingest::IngestArgs),

    /// Recognise a recorded audio file
    Recognize(commands::recognize::RecognizeArgs),

    /// Recognise live audio from the default microphone
    Listen(commands::listen::ListenArgs),

    /// List the songs in the database
    List(commands::list::ListArgs),

    /// Delete a song by id
    Delete(commands::delete::DeleteArgs),

    /// Remove songs duplicated under the same file hash
    Cleanup(commands::cleanup::CleanupArgs),

    /// List available audio capture devices
    Devices(commands::devices::DevicesArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest(args) => commands::ingest::run(args, &cli.config).await,
        Commands::Recognize(args) => commands::recognize::run(args, &cli.config).await,
        Commands::Listen(args) => commands::listen::run(args, &cli.config).await,
        Commands::List(args) => commands::list::run(args, &cli.config).await,
        Commands::Delete(args) => commands::delete::run(args, &cli.config).await,
        Commands::Cleanup(args) => commands::cleanup::run(args, &cli.config).await,
        Commands::Devices(args) => commands::devices::run(args),
    }
}
