//! One-shot recognition of a recorded audio file.

use crate::matcher::{find_matches, Match, MatchProfile};
use crate::pipeline::{build_query, fingerprint_samples};
use crate::{Error, Result};
use lyrebird_io::decode_file;
use lyrebird_store::FingerprintStore;
use std::collections::HashMap;
use std::path::Path;

/// Recognition only fingerprints the head of the file; a full album track
/// would produce far more query hashes than alignment needs.
const RECOGNIZE_MAX_SECS: usize = 30;

/// Recognise an audio file against the store and return ranked matches.
pub async fn recognize_file<S: FingerprintStore>(store: &S, path: &Path) -> Result<Vec<Match>> {
    tracing::info!(path = %path.display(), "recognizing");

    let owned_path = path.to_path_buf();
    let query = tokio::task::spawn_blocking(move || -> Result<HashMap<String, i32>> {
        let decoded = decode_file(&owned_path)?;

        let mut samples = decoded.samples;
        let max_samples = decoded.sample_rate as usize * RECOGNIZE_MAX_SECS;
        if samples.len() > max_samples {
            tracing::debug!(
                total = samples.len(),
                kept = max_samples,
                "limiting query to the first {RECOGNIZE_MAX_SECS}s"
            );
            samples.truncate(max_samples);
        }

        let (peaks, fingerprints) = fingerprint_samples(&samples, decoded.sample_rate)?;
        tracing::debug!(
            peaks = peaks.len(),
            fingerprints = fingerprints.len(),
            "query fingerprinted"
        );
        Ok(build_query(&fingerprints))
    })
    .await
    .map_err(|e| Error::JobFailed(e.to_string()))??;

    if query.is_empty() {
        return Ok(Vec::new());
    }

    find_matches(store, &query, &MatchProfile::file()).await
}
