//! Decoding of audio files into normalised mono PCM.
//!
//! Whatever the input container, the output contract is fixed: mono 16-bit
//! PCM at 44.1 kHz, re-encoded as WAV, plus the parsed sample vector scaled
//! to [-1, 1]. The SHA-1 of the re-encoded bytes is the deduplication key
//! for ingestion, so it is computed here, before any float conversion.

use crate::{Error, Result, TARGET_SAMPLE_RATE};
use hound::{SampleFormat, WavSpec, WavWriter};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use sha1::{Digest, Sha1};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Minimum size of a plausible audio file: one WAV header.
const MIN_WAV_BYTES: usize = 44;

/// A decoded, normalised audio file.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in [-1, 1], parsed from the 16-bit PCM stream.
    pub samples: Vec<f64>,
    /// Always [`TARGET_SAMPLE_RATE`].
    pub sample_rate: u32,
    /// The mono 16-bit 44.1 kHz WAV re-encoding of the input.
    pub wav_bytes: Vec<u8>,
    /// Lowercase hex SHA-1 of `wav_bytes`; the ingestion dedup key.
    pub file_hash: String,
}

/// Decode an audio file to normalised mono PCM at 44.1 kHz.
///
/// Errors on unreadable paths, on inputs shorter than a WAV header, and on
/// streams symphonia cannot probe or decode.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<DecodedAudio> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    if bytes.len() < MIN_WAV_BYTES {
        return Err(Error::TooShort {
            len: bytes.len(),
            min: MIN_WAV_BYTES,
        });
    }

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let (samples, source_rate, channels) = decode_bytes(bytes, hint)?;
    if samples.is_empty() {
        return Err(Error::EmptyAudio);
    }

    let mono = downmix(&samples, channels);
    let resampled = resample(&mono, source_rate, TARGET_SAMPLE_RATE)?;

    let pcm: Vec<i16> = resampled
        .iter()
        .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
        .collect();

    let wav_bytes = encode_wav(&pcm)?;
    let file_hash = hex::encode(Sha1::digest(&wav_bytes));

    tracing::debug!(
        samples = pcm.len(),
        seconds = pcm.len() as f64 / TARGET_SAMPLE_RATE as f64,
        %file_hash,
        "decoded {}",
        path.display()
    );

    Ok(DecodedAudio {
        samples: pcm.iter().map(|&s| s as f64 / 32768.0).collect(),
        sample_rate: TARGET_SAMPLE_RATE,
        wav_bytes,
        file_hash,
    })
}

/// Probe and decode a byte stream to interleaved f64 samples.
fn decode_bytes(bytes: Vec<u8>, hint: Hint) -> Result<(Vec<f64>, u32, usize)> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let probed = symphonia::default::get_probe().format(
        &hint,
        stream,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format.default_track().ok_or(Error::NoAudioTrack)?;
    let track_id = track.id;
    let source_rate = track.codec_params.sample_rate.ok_or(Error::NoAudioTrack)?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .ok_or(Error::NoAudioTrack)?;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream, or a truncated tail we can live with.
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Skip undecodable packets; symphonia recovers at the next one.
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(err) => return Err(err.into()),
        };

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        buffer.copy_interleaved_ref(decoded);
        samples.extend(buffer.samples().iter().map(|&s| s as f64));
    }

    Ok((samples, source_rate, channels))
}

/// Average interleaved channels down to mono.
fn downmix(samples: &[f64], channels: usize) -> Vec<f64> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f64>() / frame.len() as f64)
        .collect()
}

/// Resample mono audio with a windowed-sinc kernel. Identity when the rates
/// already agree (the default profile: ratio 1, no decimation).
fn resample(input: &[f64], input_rate: u32, output_rate: u32) -> Result<Vec<f64>> {
    if input_rate == output_rate {
        return Ok(input.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        oversampling_factor: 64,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let chunk_size = 1024;

    let mut resampler = SincFixedIn::<f64>::new(
        output_rate as f64 / input_rate as f64,
        2.0,
        params,
        chunk_size,
        1,
    )
    .map_err(|e| Error::Resample(e.to_string()))?;

    let mut output = Vec::with_capacity(input.len() * output_rate as usize / input_rate as usize);
    let mut position = 0;

    while position + chunk_size <= input.len() {
        let chunk = vec![input[position..position + chunk_size].to_vec()];
        let result = resampler
            .process(&chunk, None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        output.extend_from_slice(&result[0]);
        position += chunk_size;
    }

    let remaining = input.len() - position;
    if remaining > 0 {
        let mut padded = vec![0.0; chunk_size];
        padded[..remaining].copy_from_slice(&input[position..]);
        let result = resampler
            .process(&[padded], None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        output.extend_from_slice(&result[0]);
    }

    Ok(output)
}

/// Encode mono 16-bit PCM as an in-memory WAV at the target rate.
fn encode_wav(pcm: &[i16]) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for &sample in pcm {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn write_test_wav(
        path: &Path,
        sample_rate: u32,
        channels: u16,
        samples: impl Iterator<Item = i16>,
    ) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn sine_i16(freq: f64, sample_rate: u32, num: usize) -> impl Iterator<Item = i16> {
        (0..num).map(move |i| {
            ((2.0 * PI * freq * i as f64 / sample_rate as f64).sin() * 0.5 * 32767.0) as i16
        })
    }

    #[test]
    fn mono_wav_at_target_rate_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_test_wav(&path, 44100, 1, sine_i16(440.0, 44100, 44100));

        let decoded = decode_file(&path).unwrap();
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.samples.len(), 44100);
        assert!(decoded.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn stereo_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // Interleave a tone with silence: the mix halves the amplitude.
        let left: Vec<i16> = sine_i16(440.0, 44100, 1000).collect();
        let interleaved = left.iter().flat_map(|&s| [s, 0]);
        write_test_wav(&path, 44100, 2, interleaved);

        let decoded = decode_file(&path).unwrap();
        assert_eq!(decoded.samples.len(), 1000);

        let peak = decoded.samples.iter().fold(0.0f64, |m, s| m.max(s.abs()));
        assert!(peak < 0.3, "downmix should halve the 0.5 amplitude, got {peak}");
    }

    #[test]
    fn low_rate_input_is_resampled_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.wav");
        write_test_wav(&path, 22050, 1, sine_i16(440.0, 22050, 22050));

        let decoded = decode_file(&path).unwrap();
        assert_eq!(decoded.sample_rate, 44100);
        // Chunked resampling pads the tail, so allow one output chunk of slack.
        let expected = 44100i64;
        assert!(
            (decoded.samples.len() as i64 - expected).abs() < 4096,
            "expected about {expected} samples, got {}",
            decoded.samples.len()
        );
    }

    #[test]
    fn file_hash_is_stable_for_identical_audio() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_test_wav(&a, 44100, 1, sine_i16(440.0, 44100, 4410));
        write_test_wav(&b, 44100, 1, sine_i16(440.0, 44100, 4410));

        let da = decode_file(&a).unwrap();
        let db = decode_file(&b).unwrap();
        assert_eq!(da.file_hash, db.file_hash);
        assert_eq!(da.file_hash.len(), 40);
        assert!(da.file_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_audio_hashes_differently() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_test_wav(&a, 44100, 1, sine_i16(440.0, 44100, 4410));
        write_test_wav(&b, 44100, 1, sine_i16(880.0, 44100, 4410));

        assert_ne!(
            decode_file(&a).unwrap().file_hash,
            decode_file(&b).unwrap().file_hash
        );
    }

    #[test]
    fn truncated_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stub.wav");
        fs::write(&path, b"RIFF").unwrap();

        let err = decode_file(&path).unwrap_err();
        assert!(matches!(err, Error::TooShort { len: 4, min: 44 }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = decode_file("/nonexistent/audio.wav").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
