//! Combinatorial fingerprint hashing of peak pairs.
//!
//! Each peak acts as an anchor that is paired with up to [`FAN_VALUE`] of the
//! peaks following it in time order. The pair is hashed as the SHA-1 of
//! `"<anchor_bin>|<target_bin>|<delta_ms>"`, hex-encoded in lower case. This
//! string form is the interchange format shared with existing databases and
//! must never change.

use crate::{Peak, FAN_VALUE, MAX_HASH_TIME_DELTA, MIN_HASH_TIME_DELTA};
use sha1::{Digest, Sha1};

/// A single fingerprint token: the pair hash plus the anchor's position in
/// the processed audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// 40-character lowercase hex SHA-1 of the canonical pair string.
    pub hash: String,
    /// Anchor time, truncated to whole milliseconds.
    pub offset_ms: i32,
}

/// Anchor stride for the tolerance encoder; only every Nth peak fans out.
const TOLERANCE_ANCHOR_STRIDE: usize = 4;

/// Neighbouring-bin perturbations applied per accepted pair: anchor -1/+1,
/// then target -1/+1.
const TOLERANCE_OFFSETS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Perturbed bins outside `[0, MAX_PERTURBED_BIN]` are discarded.
const MAX_PERTURBED_BIN: i64 = 2048;

/// Hard cap on tolerance tokens per encoding run.
const MAX_TOLERANCE_TOKENS: usize = 10_000;

fn hash_pair(anchor_bin: i64, target_bin: i64, delta_ms: i64) -> String {
    let input = format!("{anchor_bin}|{target_bin}|{delta_ms}");
    hex::encode(Sha1::digest(input.as_bytes()))
}

/// Time gap between two peaks, or `None` when the pair falls outside the
/// `(MIN_HASH_TIME_DELTA, MAX_HASH_TIME_DELTA]` pairing window.
fn pair_delta_ms(anchor: &Peak, target: &Peak) -> Option<f64> {
    let delta = target.time_ms - anchor.time_ms;
    (delta > MIN_HASH_TIME_DELTA && delta <= MAX_HASH_TIME_DELTA).then_some(delta)
}

/// Encode a peak sequence into fingerprint tokens.
///
/// Peaks must be ordered by time ascending (as produced by
/// [`crate::pick_peaks`]). The output is deterministic and order-preserving:
/// anchors in index order, targets in index order within each fan.
pub fn encode(peaks: &[Peak]) -> Vec<Fingerprint> {
    let mut fingerprints = Vec::new();

    for (i, anchor) in peaks.iter().enumerate() {
        for target in &peaks[i + 1..(i + FAN_VALUE).min(peaks.len())] {
            let Some(delta) = pair_delta_ms(anchor, target) else {
                continue;
            };

            fingerprints.push(Fingerprint {
                hash: hash_pair(anchor.freq_bin as i64, target.freq_bin as i64, delta as i64),
                offset_ms: anchor.time_ms as i32,
            });
        }
    }

    fingerprints
}

/// Encode neighbouring-bin variants to absorb spectral jitter in live
/// captures.
///
/// Strides through anchors in steps of four and, for each accepted pair,
/// emits the four single-bin perturbations of (anchor_bin, target_bin).
/// Output is capped at [`MAX_TOLERANCE_TOKENS`]; the cap is checked before
/// each emit, so the result is a deterministic prefix. The microphone
/// pipeline concatenates these with the base tokens from [`encode`].
pub fn encode_with_tolerance(peaks: &[Peak]) -> Vec<Fingerprint> {
    let mut fingerprints = Vec::new();

    for i in (0..peaks.len()).step_by(TOLERANCE_ANCHOR_STRIDE) {
        let anchor = &peaks[i];

        for target in &peaks[i + 1..(i + FAN_VALUE).min(peaks.len())] {
            let Some(delta) = pair_delta_ms(anchor, target) else {
                continue;
            };

            for (da, dt) in TOLERANCE_OFFSETS {
                let anchor_bin = anchor.freq_bin as i64 + da;
                let target_bin = target.freq_bin as i64 + dt;
                if anchor_bin < 0
                    || target_bin < 0
                    || anchor_bin > MAX_PERTURBED_BIN
                    || target_bin > MAX_PERTURBED_BIN
                {
                    continue;
                }

                if fingerprints.len() >= MAX_TOLERANCE_TOKENS {
                    return fingerprints;
                }
                fingerprints.push(Fingerprint {
                    hash: hash_pair(anchor_bin, target_bin, delta as i64),
                    offset_ms: anchor.time_ms as i32,
                });
            }
        }
    }

    fingerprints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(time_ms: f64, freq_bin: usize) -> Peak {
        Peak {
            frame: (time_ms / 23.2) as usize,
            time_ms,
            freq_bin,
            magnitude: 1.0,
        }
    }

    #[test]
    fn hash_matches_published_digest() {
        assert_eq!(
            hash_pair(123, 456, 789),
            "55edacfdd455a9de649d0aa903569ebb79202426"
        );
        assert_eq!(
            hash_pair(100, 200, 300),
            "5f00a6a652129709d2e0098f6f551aa6e679d3e4"
        );
    }

    #[test]
    fn pair_encodes_hash_and_anchor_offset() {
        let peaks = vec![peak(100.7, 123), peak(889.9, 456)];
        let fps = encode(&peaks);

        assert_eq!(fps.len(), 1);
        // delta = 789.2 ms, truncated to 789.
        assert_eq!(fps[0].hash, "55edacfdd455a9de649d0aa903569ebb79202426");
        assert_eq!(fps[0].offset_ms, 100);
    }

    #[test]
    fn zero_delta_pairs_are_dropped() {
        // Same frame, different bands: delta is exactly 0.
        let peaks = vec![peak(100.0, 10), peak(100.0, 300)];
        assert!(encode(&peaks).is_empty());
    }

    #[test]
    fn pairs_beyond_max_delta_are_dropped() {
        let peaks = vec![peak(0.0, 10), peak(2000.0, 20), peak(2000.1, 30)];
        let fps = encode(&peaks);

        // 0 -> 2000.0 is inside (0, 2000]; 0 -> 2000.1 is out; the second
        // anchor pairs with the third at delta 0.1.
        assert_eq!(fps.len(), 2);
    }

    #[test]
    fn fan_limits_targets_per_anchor() {
        let peaks: Vec<Peak> = (0..40).map(|i| peak(i as f64 * 10.0, 100 + i)).collect();
        let fps = encode(&peaks);

        // Every anchor pairs with at most FAN_VALUE - 1 successors, all
        // within the delta window here.
        let first_anchor = fps.iter().filter(|f| f.offset_ms == 0).count();
        assert_eq!(first_anchor, FAN_VALUE - 1);
    }

    #[test]
    fn encoding_is_deterministic_and_order_preserving() {
        let peaks: Vec<Peak> = (0..60)
            .map(|i| peak(i as f64 * 37.0, 50 + (i * 13) % 400))
            .collect();

        let a = encode(&peaks);
        let b = encode(&peaks);
        assert_eq!(a, b);

        // Anchor offsets never decrease across the sequence.
        assert!(a.windows(2).all(|w| w[0].offset_ms <= w[1].offset_ms));
    }

    #[test]
    fn tolerance_emits_four_variants_per_pair() {
        let peaks = vec![peak(0.0, 100), peak(500.0, 200)];
        let fps = encode_with_tolerance(&peaks);

        assert_eq!(fps.len(), 4);
        let expected: Vec<String> = [(99, 200), (101, 200), (100, 199), (100, 201)]
            .iter()
            .map(|&(a, t)| hash_pair(a, t, 500))
            .collect();
        let got: Vec<String> = fps.iter().map(|f| f.hash.clone()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn tolerance_discards_out_of_range_bins() {
        // Anchor at bin 0: the -1 perturbation falls below zero and is
        // dropped, leaving three variants.
        let peaks = vec![peak(0.0, 0), peak(500.0, 200)];
        assert_eq!(encode_with_tolerance(&peaks).len(), 3);

        // Target at the top of the perturbation range: +1 exceeds 2048.
        let peaks = vec![peak(0.0, 100), peak(500.0, 2048)];
        assert_eq!(encode_with_tolerance(&peaks).len(), 3);
    }

    #[test]
    fn tolerance_strides_anchors_by_four() {
        // Five peaks, 100 ms apart: anchors are indices 0 and 4; index 4 has
        // no successor, so only anchor 0 produces pairs.
        let peaks: Vec<Peak> = (0..5).map(|i| peak(i as f64 * 100.0, 100 + i)).collect();
        let fps = encode_with_tolerance(&peaks);

        assert_eq!(fps.len(), 4 * 4);
        assert!(fps.iter().all(|f| f.offset_ms == 0));
    }

    #[test]
    fn tolerance_output_is_capped() {
        // A long, dense sequence overflows the cap; the encoder must stop
        // at exactly MAX_TOLERANCE_TOKENS.
        let peaks: Vec<Peak> = (0..4000).map(|i| peak(i as f64 * 5.0, 100)).collect();
        let fps = encode_with_tolerance(&peaks);
        assert_eq!(fps.len(), MAX_TOLERANCE_TOKENS);
    }
}
