//! Spectral peak extraction.
//!
//! The constellation map keeps at most one peak per STFT frame and frequency
//! band: the strongest strict local maximum in that band, provided it clears
//! the magnitude threshold. Limiting peaks per band keeps the map sparse and
//! spreads it across the spectrum instead of clustering around bass energy.

use crate::{HOP_SIZE, PEAK_THRESHOLD, WINDOW_SIZE};
use rustfft::num_complex::Complex;

/// A spectral peak in the time-frequency grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// STFT frame index.
    pub frame: usize,
    /// Time of the frame start in milliseconds.
    pub time_ms: f64,
    /// Frequency bin index in `[0, WINDOW_SIZE / 2)`.
    pub freq_bin: usize,
    /// Magnitude of the cell.
    pub magnitude: f64,
}

/// An inclusive range of frequency bins searched for one peak per frame.
#[derive(Debug, Clone, Copy)]
pub struct FrequencyBand {
    pub start: usize,
    pub end: usize,
}

/// Peak-search bands in Hz. Narrow bands at the low end track bass and
/// fundamentals; the two wide bands cover melody and presence.
const BAND_EDGES_HZ: [(f64, f64); 6] = [
    (40.0, 80.0),
    (80.0, 120.0),
    (120.0, 180.0),
    (180.0, 300.0),
    (300.0, 2000.0),
    (2000.0, 5000.0),
];

/// Convert the Hz band table to bin ranges for the given sample rate.
///
/// Bands are clamped so they never pass the last positive-frequency bin;
/// a band that becomes empty or inverted after clamping is dropped.
pub fn frequency_bands(sample_rate: u32, window_size: usize) -> Vec<FrequencyBand> {
    let nyquist = sample_rate as f64 / 2.0;
    let bin_size = nyquist / (window_size / 2) as f64;
    let max_bin = window_size / 2 - 1;

    BAND_EDGES_HZ
        .iter()
        .filter_map(|&(lo, hi)| {
            let start = (lo / bin_size).ceil() as usize;
            let end = ((hi / bin_size).floor() as usize).min(max_bin);
            (start <= end && start <= max_bin).then_some(FrequencyBand { start, end })
        })
        .collect()
}

/// Extract the peak constellation from a complex spectrogram.
///
/// Peaks are returned ordered by frame, then by frequency bin. A cell
/// qualifies when it is a strict local maximum over its in-range 3x3
/// neighbourhood and its magnitude exceeds [`PEAK_THRESHOLD`]; per frame and
/// band only the strongest such cell is kept, ties preferring the lower bin.
pub fn pick_peaks(grid: &[Vec<Complex<f64>>], sample_rate: u32) -> Vec<Peak> {
    if grid.is_empty() || grid[0].is_empty() {
        return Vec::new();
    }

    let magnitudes: Vec<Vec<f64>> = grid
        .iter()
        .map(|row| row.iter().map(|c| c.norm()).collect())
        .collect();

    let bands = frequency_bands(sample_rate, WINDOW_SIZE);
    let mut peaks = Vec::new();

    for (t, row) in magnitudes.iter().enumerate() {
        let time_ms = t as f64 * HOP_SIZE as f64 / sample_rate as f64 * 1000.0;

        for band in &bands {
            let mut best: Option<(usize, f64)> = None;

            for f in band.start..=band.end.min(row.len() - 1) {
                let mag = row[f];
                if mag > best.map_or(0.0, |(_, m)| m) && is_local_peak(&magnitudes, t, f) {
                    best = Some((f, mag));
                }
            }

            if let Some((freq_bin, magnitude)) = best {
                if magnitude > PEAK_THRESHOLD {
                    peaks.push(Peak {
                        frame: t,
                        time_ms,
                        freq_bin,
                        magnitude,
                    });
                }
            }
        }
    }

    peaks
}

/// Strict local maximum over the 3x3 neighbourhood. Cells outside the grid
/// are absent rather than disqualifying.
fn is_local_peak(magnitudes: &[Vec<f64>], t: usize, f: usize) -> bool {
    let value = magnitudes[t][f];

    for dt in -1i64..=1 {
        for df in -1i64..=1 {
            if dt == 0 && df == 0 {
                continue;
            }
            let tt = t as i64 + dt;
            let ff = f as i64 + df;
            if tt < 0 || ff < 0 {
                continue;
            }
            let (tt, ff) = (tt as usize, ff as usize);
            if tt >= magnitudes.len() || ff >= magnitudes[tt].len() {
                continue;
            }
            if value <= magnitudes[tt][ff] {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a grid with the given magnitudes as purely real cells.
    fn grid_from(mags: &[Vec<f64>]) -> Vec<Vec<Complex<f64>>> {
        mags.iter()
            .map(|row| row.iter().map(|&m| Complex::new(m, 0.0)).collect())
            .collect()
    }

    /// A quiet grid with a single hot cell at (t, f).
    fn single_peak_grid(frames: usize, bins: usize, t: usize, f: usize, mag: f64) -> Vec<Vec<f64>> {
        let mut mags = vec![vec![0.001; bins]; frames];
        mags[t][f] = mag;
        mags
    }

    #[test]
    fn band_ranges_at_44100() {
        let bands = frequency_bands(44100, WINDOW_SIZE);
        assert_eq!(bands.len(), 6);
        // 2000-5000 Hz at ~10.77 Hz/bin.
        assert_eq!(bands[5].start, 186);
        assert_eq!(bands[5].end, 464);
    }

    #[test]
    fn bands_clamp_to_nyquist() {
        // At 8 kHz the 2000-5000 band crosses the 4 kHz Nyquist and must be
        // clamped to the last bin rather than dropped entirely.
        let bands = frequency_bands(8000, WINDOW_SIZE);
        let max_bin = WINDOW_SIZE / 2 - 1;
        assert!(bands.iter().all(|b| b.end <= max_bin));
        assert!(bands.iter().all(|b| b.start <= b.end));
    }

    #[test]
    fn detects_isolated_peak() {
        let mags = single_peak_grid(5, 512, 2, 200, 1.0);
        let peaks = pick_peaks(&grid_from(&mags), 44100);

        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].frame, 2);
        assert_eq!(peaks[0].freq_bin, 200);
        assert!((peaks[0].magnitude - 1.0).abs() < 1e-12);
    }

    #[test]
    fn peak_below_threshold_is_dropped() {
        let mags = single_peak_grid(5, 512, 2, 200, PEAK_THRESHOLD * 0.9);
        let peaks = pick_peaks(&grid_from(&mags), 44100);
        assert!(peaks.is_empty());
    }

    #[test]
    fn plateau_is_not_a_peak() {
        // Two equal neighbours: neither is strictly greater, so no peak.
        let mut mags = vec![vec![0.001; 512]; 5];
        mags[2][200] = 1.0;
        mags[2][201] = 1.0;
        let peaks = pick_peaks(&grid_from(&mags), 44100);
        assert!(peaks.is_empty());
    }

    #[test]
    fn grid_edges_do_not_disqualify() {
        // Peak in the very first frame: out-of-range neighbours are absent.
        let mags = single_peak_grid(3, 512, 0, 200, 1.0);
        let peaks = pick_peaks(&grid_from(&mags), 44100);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].frame, 0);
    }

    #[test]
    fn one_peak_per_band_per_frame() {
        // Two separated maxima inside the 300-2000 Hz band; only the
        // stronger one survives.
        let mut mags = vec![vec![0.001; 512]; 3];
        mags[1][50] = 0.8;
        mags[1][100] = 0.9;
        let peaks = pick_peaks(&grid_from(&mags), 44100);

        let band5: Vec<_> = peaks
            .iter()
            .filter(|p| p.freq_bin >= 28 && p.freq_bin <= 185)
            .collect();
        assert_eq!(band5.len(), 1);
        assert_eq!(band5[0].freq_bin, 100);
    }

    #[test]
    fn peaks_ordered_by_frame_then_bin() {
        let mut mags = vec![vec![0.001; 512]; 4];
        mags[0][200] = 1.0;
        mags[2][50] = 0.8;
        mags[2][300] = 0.7;
        let peaks = pick_peaks(&grid_from(&mags), 44100);

        let order: Vec<(usize, usize)> = peaks.iter().map(|p| (p.frame, p.freq_bin)).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn every_peak_beats_its_neighbours() {
        // Pseudo-random grid; re-check the local-max invariant on output.
        let mut state = 0x2f6e2b1u64;
        let mut mags = vec![vec![0.0; 512]; 20];
        for row in mags.iter_mut() {
            for cell in row.iter_mut() {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                *cell = (state % 10_000) as f64 / 10_000.0;
            }
        }

        let peaks = pick_peaks(&grid_from(&mags), 44100);
        assert!(!peaks.is_empty());
        for p in &peaks {
            assert!(p.magnitude > PEAK_THRESHOLD);
            for dt in -1i64..=1 {
                for df in -1i64..=1 {
                    if dt == 0 && df == 0 {
                        continue;
                    }
                    let tt = p.frame as i64 + dt;
                    let ff = p.freq_bin as i64 + df;
                    if tt < 0 || ff < 0 || tt >= 20 || ff >= 512 {
                        continue;
                    }
                    assert!(p.magnitude > mags[tt as usize][ff as usize]);
                }
            }
        }
    }
}
