//! Live microphone recognition command.

use clap::Args;
use lyrebird_engine::{listen, ListenOutcome};
use lyrebird_store::FingerprintStore;
use std::path::Path;
use std::sync::Arc;

#[derive(Args)]
pub struct ListenArgs {}

pub async fn run(_args: ListenArgs, config: &Path) -> anyhow::Result<()> {
    let store = Arc::new(super::open_store(config).await?);

    println!("Listening... play some music (30s timeout, Ctrl-C to stop)");
    match listen(Arc::clone(&store)).await? {
        ListenOutcome::Matched(m) => {
            println!(
                "Matched: {} by {} (score: {:.3}, offset: {}ms)",
                m.name, m.artist, m.score, m.offset_ms
            );
        }
        ListenOutcome::TimedOut => println!("No match found"),
        ListenOutcome::Interrupted => println!("Stopped"),
    }

    store.close().await;
    Ok(())
}
