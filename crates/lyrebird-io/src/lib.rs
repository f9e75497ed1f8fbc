//! Audio I/O layer for the Lyrebird recognition pipeline.
//!
//! This crate provides:
//! - Decoding of audio files to normalised mono PCM via [`decode`]
//! - Real-time microphone capture via [`capture`]

pub mod capture;
pub mod decode;

pub use capture::{CaptureBuffer, CaptureLevels, Recorder};
pub use decode::{decode_file, DecodedAudio};

/// Sample rate every pipeline stage operates at, in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file too short to be audio: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("unsupported or corrupt audio stream: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("no decodable audio track in file")]
    NoAudioTrack,

    #[error("decoder produced no samples")]
    EmptyAudio,

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),

    #[error("no audio input device available")]
    NoDevice,

    #[error("unsupported capture sample format: {0}")]
    UnsupportedFormat(String),

    #[error("audio stream error: {0}")]
    Stream(String),
}

pub type Result<T> = std::result::Result<T, Error>;
