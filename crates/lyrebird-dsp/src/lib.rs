//! Constellation-map DSP pipeline for audio recognition.
//!
//! This crate turns mono PCM into compact fingerprint tokens in three steps:
//!
//! - [`spectrogram`] - STFT magnitude grid via windowed FFT
//! - [`peaks`] - sparse constellation of band-limited spectral peaks
//! - [`fingerprint`] - combinatorial hashing of anchor/target peak pairs
//!
//! The hash format (lowercase hex SHA-1 of `"<anchor_bin>|<target_bin>|<delta_ms>"`)
//! is a stability contract: databases built by one binary must remain readable
//! by another, so identical peak pairs always produce byte-identical hashes.

pub mod fingerprint;
pub mod peaks;
pub mod spectrogram;

pub use fingerprint::{encode, encode_with_tolerance, Fingerprint};
pub use peaks::{pick_peaks, FrequencyBand, Peak};
pub use spectrogram::spectrogram;

/// STFT window size in samples (power of 2).
pub const WINDOW_SIZE: usize = 4096;

/// Hop between consecutive STFT frames, in samples.
pub const HOP_SIZE: usize = WINDOW_SIZE / 4;

/// Minimum magnitude for a spectral peak, on the normalised amplitude scale.
pub const PEAK_THRESHOLD: f64 = 0.02;

/// Minimum anchor-to-target spacing in milliseconds (exclusive).
pub const MIN_HASH_TIME_DELTA: f64 = 0.0;

/// Maximum anchor-to-target spacing in milliseconds (inclusive).
pub const MAX_HASH_TIME_DELTA: f64 = 2000.0;

/// How many successor peaks each anchor is paired with.
pub const FAN_VALUE: usize = 15;

/// Error types for the DSP pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("signal too short for analysis: {len} samples, need at least {window}")]
    ShortSignal { len: usize, window: usize },

    #[error("FFT produced a non-finite value at frame {frame}")]
    Fft { frame: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
