//! Temporally aligned scoring of query hashes against the store.
//!
//! A genuine match concentrates many (db_offset - query_offset) deltas in
//! one bucket: the position of the query inside the reference recording.
//! Unrelated hash collisions scatter. Scoring therefore rewards both the
//! absolute size of the modal bucket and how dominant it is among all hits
//! for that song.

use crate::Result;
use lyrebird_store::{FingerprintStore, MAX_QUERY_HASHES};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Maximum number of ranked matches returned.
pub const MAX_MATCHES: usize = 5;

/// Scoring parameters. The defaults are empirical; file and microphone
/// queries use different tolerances because live captures produce fewer and
/// noisier hashes.
#[derive(Debug, Clone, Copy)]
pub struct MatchProfile {
    /// Minimum hits for a song to be considered at all.
    pub min_matches: usize,
    /// Normalisation divisor mapping raw alignment evidence onto [0, 1].
    pub norm: f64,
    /// Scores at or below this are discarded.
    pub score_threshold: f64,
}

impl MatchProfile {
    /// Profile for recognising a recorded file.
    pub fn file() -> Self {
        Self {
            min_matches: 5,
            norm: 100.0,
            score_threshold: 0.1,
        }
    }

    /// More tolerant profile for live microphone queries.
    pub fn microphone() -> Self {
        Self {
            min_matches: 3,
            norm: 50.0,
            score_threshold: 0.05,
        }
    }
}

/// A ranked candidate song.
#[derive(Debug, Clone)]
pub struct Match {
    pub song_id: i32,
    pub name: String,
    pub artist: String,
    /// Confidence in [0, 1].
    pub score: f64,
    /// Position of the query within the song: the modal offset delta, in
    /// milliseconds.
    pub offset_ms: i32,
}

/// Score query hashes against the store and return ranked candidates.
///
/// The store is consulted in batches of at most [`MAX_QUERY_HASHES`] hashes;
/// results across batches are merged without ordering.
pub async fn find_matches<S: FingerprintStore>(
    store: &S,
    query: &HashMap<String, i32>,
    profile: &MatchProfile,
) -> Result<Vec<Match>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let hashes: Vec<String> = query.keys().cloned().collect();
    tracing::debug!(hashes = hashes.len(), "matching against store");

    let mut hits = Vec::new();
    for batch in hashes.chunks(MAX_QUERY_HASHES) {
        hits.extend(store.query_fingerprints(batch).await?);
    }
    if hits.is_empty() {
        return Ok(Vec::new());
    }

    // Bucket offset deltas per song.
    let mut deltas_by_song: HashMap<i32, HashMap<i32, usize>> = HashMap::new();
    for hit in &hits {
        let Some(&query_offset) = query.get(&hit.hash) else {
            continue;
        };
        let delta = hit.offset_ms - query_offset;
        *deltas_by_song
            .entry(hit.song_id)
            .or_default()
            .entry(delta)
            .or_default() += 1;
    }

    let mut matches = Vec::new();
    for (song_id, deltas) in &deltas_by_song {
        let total: usize = deltas.values().sum();
        if total < profile.min_matches {
            continue;
        }

        // Modal delta; ties go to the smallest delta so ranking is stable.
        let (&modal_delta, &peak_count) = deltas
            .iter()
            .max_by_key(|(&delta, &count)| (count, Reverse(delta)))
            .expect("song bucket is non-empty");

        let aligned_ratio = peak_count as f64 / total as f64;
        let raw = peak_count as f64 * aligned_ratio;
        let score = (raw / profile.norm).min(1.0);
        if score <= profile.score_threshold {
            continue;
        }

        let song = store.get_song(*song_id).await?;
        matches.push(Match {
            song_id: *song_id,
            name: song.name,
            artist: song.artist,
            score,
            offset_ms: modal_delta,
        });
    }

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.song_id.cmp(&b.song_id))
    });
    matches.truncate(MAX_MATCHES);

    tracing::debug!(hits = hits.len(), candidates = matches.len(), "matching done");
    Ok(matches)
}
