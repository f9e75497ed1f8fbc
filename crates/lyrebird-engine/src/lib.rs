//! Recognition engine tying the DSP pipeline to the fingerprint store.
//!
//! - [`matcher`] - temporally aligned scoring of query hashes against the index
//! - [`ingest`] - fingerprint a file and persist it as a new song
//! - [`recognize`] - one-shot recognition of a recorded file
//! - [`listen`] - continuous microphone recognition with early exit

pub mod ingest;
pub mod listen;
pub mod matcher;
mod pipeline;
pub mod recognize;

pub use ingest::{ingest_file, IngestReport};
pub use listen::{listen, ListenOutcome};
pub use matcher::{find_matches, Match, MatchProfile, MAX_MATCHES};
pub use recognize::recognize_file;

/// Error types for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Audio(#[from] lyrebird_io::Error),

    #[error(transparent)]
    Dsp(#[from] lyrebird_dsp::Error),

    #[error(transparent)]
    Store(#[from] lyrebird_store::Error),

    #[error("recognition job failed: {0}")]
    JobFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
