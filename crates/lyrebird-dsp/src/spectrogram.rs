//! STFT spectrogram generation.

use crate::{Error, Result, HOP_SIZE, WINDOW_SIZE};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

/// Hann window coefficients for a given size.
fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
        .collect()
}

/// Compute the complex spectrogram of a mono signal.
///
/// Frames advance by [`HOP_SIZE`] samples and each frame is tapered with a
/// Hann window before the forward FFT. Only the positive-frequency half of
/// each spectrum is retained, so the result is `T x (WINDOW_SIZE / 2)` with
/// `T = 1 + (len - WINDOW_SIZE) / HOP_SIZE`. Bins are scaled by the window's
/// coherent gain, so a full-scale tone reads as magnitude ~1.0 and the peak
/// threshold stays in sample-amplitude units.
///
/// Returns [`Error::ShortSignal`] when the signal does not fill one analysis
/// window, and [`Error::Fft`] if the kernel produces a non-finite value.
pub fn spectrogram(samples: &[f64], _sample_rate: u32) -> Result<Vec<Vec<Complex<f64>>>> {
    if samples.len() < WINDOW_SIZE {
        return Err(Error::ShortSignal {
            len: samples.len(),
            window: WINDOW_SIZE,
        });
    }

    let window = hann_window(WINDOW_SIZE);
    let scale = 2.0 / window.iter().sum::<f64>();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(WINDOW_SIZE);

    let num_frames = 1 + (samples.len() - WINDOW_SIZE) / HOP_SIZE;
    let num_bins = WINDOW_SIZE / 2;
    let mut grid = Vec::with_capacity(num_frames);

    let mut buffer = vec![Complex::new(0.0, 0.0); WINDOW_SIZE];
    for frame_idx in 0..num_frames {
        let start = frame_idx * HOP_SIZE;
        for (slot, (&sample, &coeff)) in buffer
            .iter_mut()
            .zip(samples[start..start + WINDOW_SIZE].iter().zip(window.iter()))
        {
            *slot = Complex::new(sample * coeff, 0.0);
        }

        fft.process(&mut buffer);

        let row: Vec<Complex<f64>> = buffer[..num_bins]
            .iter()
            .map(|c| Complex::new(c.re * scale, c.im * scale))
            .collect();
        if row.iter().any(|c| !c.re.is_finite() || !c.im.is_finite()) {
            return Err(Error::Fft { frame: frame_idx });
        }
        grid.push(row);
    }

    Ok(grid)
}
