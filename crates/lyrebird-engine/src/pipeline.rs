//! Shared steps between file recognition, ingestion and the listen loop.

use lyrebird_dsp::{encode, pick_peaks, spectrogram, Fingerprint, Peak};
use std::collections::HashMap;

/// Run samples through the spectrogram, peak and base-encoding stages.
pub fn fingerprint_samples(
    samples: &[f64],
    sample_rate: u32,
) -> lyrebird_dsp::Result<(Vec<Peak>, Vec<Fingerprint>)> {
    let grid = spectrogram(samples, sample_rate)?;
    let peaks = pick_peaks(&grid, sample_rate);
    let fingerprints = encode(&peaks);
    Ok((peaks, fingerprints))
}

/// Collapse fingerprints into the hash -> anchor-offset map the matcher
/// consumes. Duplicate hashes keep the last offset seen.
pub fn build_query(fingerprints: &[Fingerprint]) -> HashMap<String, i32> {
    fingerprints
        .iter()
        .map(|f| (f.hash.clone(), f.offset_ms))
        .collect()
}
