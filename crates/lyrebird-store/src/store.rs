//! The store contract the recognition engine runs against.

use crate::model::{FingerprintMatch, FingerprintRow, SongRecord};
use crate::Result;
use std::future::Future;

/// Hard upper bound on hashes per [`FingerprintStore::query_fingerprints`]
/// call. Callers batch above this; the store rejects larger sets outright to
/// keep per-query work and placeholder counts bounded.
pub const MAX_QUERY_HASHES: usize = 1000;

/// Contract for a persisted fingerprint index.
///
/// Implementations are shared across concurrent recognition jobs, so every
/// method takes `&self` and the returned futures are `Send`.
pub trait FingerprintStore: Send + Sync {
    /// Idempotently create the persistent structures.
    fn setup(&self) -> impl Future<Output = Result<()>> + Send;

    /// Insert a song row; fails with [`crate::Error::DuplicateSong`] when the
    /// file hash is already present.
    fn insert_song(
        &self,
        name: &str,
        artist: &str,
        file_hash: &str,
        total_hashes: i32,
    ) -> impl Future<Output = Result<i32>> + Send;

    /// Bulk-insert fingerprints; idempotent per `(hash, song_id, offset_ms)`.
    fn insert_fingerprints(
        &self,
        song_id: i32,
        rows: &[FingerprintRow],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Flip the song's fingerprinted flag once ingestion completes.
    fn mark_fingerprinted(&self, song_id: i32) -> impl Future<Output = Result<()>> + Send;

    /// Remove a song and, by cascade, its fingerprints.
    fn delete_song(&self, song_id: i32) -> impl Future<Output = Result<()>> + Send;

    /// Every stored row whose hash is in the input set, in no particular
    /// order. At most [`MAX_QUERY_HASHES`] hashes per call.
    fn query_fingerprints(
        &self,
        hashes: &[String],
    ) -> impl Future<Output = Result<Vec<FingerprintMatch>>> + Send;

    fn get_song(&self, song_id: i32) -> impl Future<Output = Result<SongRecord>> + Send;

    fn list_songs(&self) -> impl Future<Output = Result<Vec<SongRecord>>> + Send;

    /// Remove songs duplicated under the same file hash, keeping the lowest
    /// id. Returns the number of song rows removed.
    fn cleanup(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Release the connection pool.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
