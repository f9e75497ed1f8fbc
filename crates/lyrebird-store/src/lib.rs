//! Persistence layer for the fingerprint index.
//!
//! This crate provides:
//! - YAML configuration loading via [`config`]
//! - The [`FingerprintStore`] contract the matcher and ingestion run against
//! - The MySQL implementation via [`mysql`]

pub mod config;
pub mod model;
pub mod mysql;
pub mod store;

pub use config::{Config, DatabaseConfig};
pub use model::{FingerprintMatch, FingerprintRow, SongRecord};
pub use mysql::MySqlStore;
pub use store::{FingerprintStore, MAX_QUERY_HASHES};

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("song with file hash {file_hash} already exists (id {song_id})")]
    DuplicateSong { file_hash: String, song_id: i32 },

    #[error("no song with id {0}")]
    SongNotFound(i32),

    #[error("fingerprint query of {len} hashes exceeds the {max} batch limit")]
    BatchTooLarge { len: usize, max: usize },

    #[error("unsupported database type: {0}")]
    UnsupportedBackend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
