//! Song ingestion: decode, fingerprint, persist.

use crate::pipeline::fingerprint_samples;
use crate::{Error, Result};
use lyrebird_io::decode_file;
use lyrebird_store::{FingerprintRow, FingerprintStore};
use std::path::Path;

/// Summary of a completed ingestion.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub song_id: i32,
    pub peaks: usize,
    pub fingerprints: usize,
}

/// Fingerprint an audio file and store it as a new song.
///
/// The song row is written first, then the fingerprints in bulk, and the
/// fingerprinted flag last, so a song only reads as complete once all of its
/// hashes are queryable. Re-ingesting audio with a known file hash fails
/// with [`lyrebird_store::Error::DuplicateSong`] before anything is written.
pub async fn ingest_file<S: FingerprintStore>(
    store: &S,
    path: &Path,
    name: &str,
    artist: &str,
) -> Result<IngestReport> {
    tracing::info!(path = %path.display(), "ingesting");

    let owned_path = path.to_path_buf();
    let (file_hash, rows, peak_count) =
        tokio::task::spawn_blocking(move || -> Result<(String, Vec<FingerprintRow>, usize)> {
            let decoded = decode_file(&owned_path)?;
            let (peaks, fingerprints) =
                fingerprint_samples(&decoded.samples, decoded.sample_rate)?;

            let rows = fingerprints
                .into_iter()
                .map(|f| FingerprintRow {
                    hash: f.hash,
                    offset_ms: f.offset_ms,
                })
                .collect();
            Ok((decoded.file_hash, rows, peaks.len()))
        })
        .await
        .map_err(|e| Error::JobFailed(e.to_string()))??;

    let song_id = store
        .insert_song(name, artist, &file_hash, rows.len() as i32)
        .await?;
    store.insert_fingerprints(song_id, &rows).await?;
    store.mark_fingerprinted(song_id).await?;

    tracing::info!(
        song_id,
        peaks = peak_count,
        fingerprints = rows.len(),
        "ingested '{name}' by '{artist}'"
    );

    Ok(IngestReport {
        song_id,
        peaks: peak_count,
        fingerprints: rows.len(),
    })
}
