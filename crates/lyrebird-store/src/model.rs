//! Durable record types shared across the store boundary.

use chrono::{DateTime, Utc};

/// A song row in the index.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SongRecord {
    pub id: i32,
    pub name: String,
    pub artist: String,
    /// SHA-1 of the normalised WAV bytes; unique per song.
    pub file_hash: String,
    /// Set once all fingerprints for the song have been stored.
    pub fingerprinted: bool,
    pub total_hashes: i32,
    pub date_created: DateTime<Utc>,
}

/// A fingerprint to persist for a song being ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintRow {
    /// 40-character lowercase hex SHA-1 pair hash.
    pub hash: String,
    /// Anchor offset from the start of the song, in milliseconds.
    pub offset_ms: i32,
}

/// A fingerprint row returned by a hash lookup.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FingerprintMatch {
    pub hash: String,
    pub song_id: i32,
    pub offset_ms: i32,
}
