//! Real-time microphone capture via cpal.
//!
//! The stream callback does only cheap work: downmix the incoming frames,
//! append them to a ring-bounded buffer and update running level meters.
//! Recognition readers take snapshot copies; no DSP runs on the audio
//! thread.

use crate::{Error, Result, TARGET_SAMPLE_RATE};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Upper bound on buffered audio, in seconds; older samples are evicted.
pub const MAX_BUFFER_SECS: usize = 10;

/// Running input level meters, updated per callback chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureLevels {
    /// Largest absolute sample in the last chunk.
    pub peak: f32,
    /// Mean absolute sample in the last chunk.
    pub average: f32,
}

struct BufferInner {
    samples: VecDeque<f32>,
    levels: CaptureLevels,
}

/// Ring-bounded sample buffer shared between the capture callback (single
/// writer) and recognition jobs (snapshot readers).
pub struct CaptureBuffer {
    max_samples: usize,
    inner: Mutex<BufferInner>,
}

impl CaptureBuffer {
    pub fn new(max_samples: usize) -> Self {
        Self {
            max_samples,
            inner: Mutex::new(BufferInner {
                samples: VecDeque::with_capacity(max_samples),
                levels: CaptureLevels::default(),
            }),
        }
    }

    /// Append a chunk of mono samples, evicting the oldest on overflow.
    pub fn push(&self, chunk: &[f32]) {
        if chunk.is_empty() {
            return;
        }

        let mut peak = 0.0f32;
        let mut sum = 0.0f32;
        for &s in chunk {
            let a = s.abs();
            peak = peak.max(a);
            sum += a;
        }

        let mut inner = self.inner.lock();
        inner.samples.extend(chunk.iter().copied());
        while inner.samples.len() > self.max_samples {
            inner.samples.pop_front();
        }
        inner.levels = CaptureLevels {
            peak,
            average: sum / chunk.len() as f32,
        };
    }

    /// Copy out the most recent `n` samples (or everything, if fewer are
    /// buffered).
    pub fn snapshot_latest(&self, n: usize) -> Vec<f32> {
        let inner = self.inner.lock();
        let skip = inner.samples.len().saturating_sub(n);
        inner.samples.iter().skip(skip).copied().collect()
    }

    /// Number of samples currently buffered.
    pub fn len(&self) -> usize {
        self.inner.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The latest level meters.
    pub fn levels(&self) -> CaptureLevels {
        self.inner.lock().levels
    }
}

/// A running microphone capture stream feeding a [`CaptureBuffer`].
///
/// The stream stays live while the recorder exists; dropping it (or calling
/// [`Recorder::stop`]) releases the device.
pub struct Recorder {
    stream: cpal::Stream,
    buffer: Arc<CaptureBuffer>,
    sample_rate: u32,
}

impl Recorder {
    /// Open the default input device at 44.1 kHz and start capturing.
    pub fn start() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(Error::NoDevice)?;

        let default_config = device
            .default_input_config()
            .map_err(|e| Error::Stream(e.to_string()))?;
        if default_config.sample_format() != cpal::SampleFormat::F32 {
            return Err(Error::UnsupportedFormat(
                default_config.sample_format().to_string(),
            ));
        }

        let channels = default_config.channels() as usize;
        let config = cpal::StreamConfig {
            channels: channels as u16,
            sample_rate: cpal::SampleRate(TARGET_SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let buffer = Arc::new(CaptureBuffer::new(
            TARGET_SAMPLE_RATE as usize * MAX_BUFFER_SECS,
        ));
        let callback_buffer = Arc::clone(&buffer);
        let mut mono = Vec::new();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if channels > 1 {
                        mono.clear();
                        mono.extend(
                            data.chunks(channels)
                                .map(|f| f.iter().sum::<f32>() / f.len() as f32),
                        );
                        callback_buffer.push(&mono);
                    } else {
                        callback_buffer.push(data);
                    }
                },
                |err| tracing::warn!("input stream error: {err}"),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;

        let name = device.name().unwrap_or_else(|_| "unknown".into());
        tracing::info!(device = %name, channels, "microphone capture started");

        Ok(Self {
            stream,
            buffer,
            sample_rate: TARGET_SAMPLE_RATE,
        })
    }

    /// The shared capture buffer.
    pub fn buffer(&self) -> Arc<CaptureBuffer> {
        Arc::clone(&self.buffer)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Pause the capture stream. Dropping the recorder also releases it.
    pub fn stop(&self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| Error::Stream(e.to_string()))
    }
}

/// Names of the available audio input devices.
pub fn input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    if let Ok(devices) = host.input_devices() {
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_keeps_most_recent_on_overflow() {
        let buffer = CaptureBuffer::new(4);
        buffer.push(&[1.0, 2.0, 3.0]);
        buffer.push(&[4.0, 5.0, 6.0]);

        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.snapshot_latest(4), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn buffer_never_exceeds_capacity() {
        let max = TARGET_SAMPLE_RATE as usize; // 1 "second"
        let buffer = CaptureBuffer::new(max);
        let chunk = vec![0.1f32; 4096];
        for _ in 0..20 {
            buffer.push(&chunk);
        }
        assert_eq!(buffer.len(), max);
    }

    #[test]
    fn snapshot_of_short_buffer_returns_everything() {
        let buffer = CaptureBuffer::new(100);
        buffer.push(&[1.0, 2.0]);
        assert_eq!(buffer.snapshot_latest(50), vec![1.0, 2.0]);
    }

    #[test]
    fn snapshot_does_not_drain() {
        let buffer = CaptureBuffer::new(100);
        buffer.push(&[1.0, 2.0, 3.0]);
        let _ = buffer.snapshot_latest(2);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn levels_track_last_chunk() {
        let buffer = CaptureBuffer::new(100);
        buffer.push(&[0.5, -1.0, 0.25, 0.25]);

        let levels = buffer.levels();
        assert!((levels.peak - 1.0).abs() < 1e-6);
        assert!((levels.average - 0.5).abs() < 1e-6);
    }
}
