//! Continuous microphone recognition.
//!
//! The capture callback feeds a ring-bounded buffer; this loop samples it on
//! a fixed tick and races recognition attempts against a wall-clock timeout
//! and Ctrl-C. The first confident match wins. Recognition jobs are
//! supervised: the DSP half runs under `spawn_blocking`, so a panicking job
//! surfaces as a join error that is logged and discarded instead of taking
//! the loop down.

use crate::matcher::{find_matches, Match, MatchProfile};
use crate::pipeline::build_query;
use crate::{Error, Result};
use lyrebird_dsp::{encode, encode_with_tolerance, pick_peaks, spectrogram};
use lyrebird_io::Recorder;
use lyrebird_store::FingerprintStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Interval between recognition attempts.
const RECOGNITION_TICK: Duration = Duration::from_secs(2);

/// The loop gives up after this much wall-clock time without a match.
const LISTEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Don't bother recognising until this much audio is buffered.
const MIN_AUDIO_SECS: usize = 3;

/// Each attempt works on the most recent window of this length.
const WINDOW_SECS: usize = 5;

/// Matches at or below this score are treated as inconclusive.
const MATCH_SCORE_GATE: f64 = 0.3;

/// Attempts with fewer peaks than this are discarded without querying.
const MIN_PEAKS: usize = 20;

/// Attempts with fewer base fingerprints than this are discarded without
/// querying.
const MIN_BASE_FINGERPRINTS: usize = 50;

/// How a listen session ended.
#[derive(Debug)]
pub enum ListenOutcome {
    /// A song scored above the confidence gate.
    Matched(Match),
    /// No confident match within [`LISTEN_TIMEOUT`].
    TimedOut,
    /// Ctrl-C.
    Interrupted,
}

/// Listen on the default microphone until a match, timeout or interrupt.
///
/// In-flight recognition jobs may outlive the loop; their results are
/// dropped with the match channel.
pub async fn listen<S>(store: Arc<S>) -> Result<ListenOutcome>
where
    S: FingerprintStore + 'static,
{
    let recorder = Recorder::start()?;
    let buffer = recorder.buffer();
    let sample_rate = recorder.sample_rate();

    // Single-slot channel: the first confident match wins, later ones are
    // dropped by try_send.
    let (match_tx, mut match_rx) = mpsc::channel::<Match>(1);
    let in_flight = Arc::new(AtomicBool::new(false));

    let timeout = tokio::time::sleep(LISTEN_TIMEOUT);
    tokio::pin!(timeout);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(RECOGNITION_TICK);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!("listening... ({}s timeout)", LISTEN_TIMEOUT.as_secs());

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupted, stopping capture");
                break ListenOutcome::Interrupted;
            }

            _ = &mut timeout => {
                tracing::info!("no match within {}s", LISTEN_TIMEOUT.as_secs());
                break ListenOutcome::TimedOut;
            }

            Some(found) = match_rx.recv() => {
                tracing::info!(
                    score = found.score,
                    "matched '{}' by '{}'", found.name, found.artist
                );
                break ListenOutcome::Matched(found);
            }

            _ = ticker.tick() => {
                let buffered = buffer.len();
                let levels = buffer.levels();
                tracing::debug!(
                    seconds = buffered as f64 / sample_rate as f64,
                    peak = levels.peak,
                    average = levels.average,
                    "capture state"
                );

                if buffered < sample_rate as usize * MIN_AUDIO_SECS {
                    continue;
                }
                // Skip the dispatch when the previous attempt is still
                // running; the buffer keeps accumulating for the next tick.
                if in_flight.swap(true, Ordering::SeqCst) {
                    continue;
                }

                let snapshot = buffer.snapshot_latest(sample_rate as usize * WINDOW_SECS);
                let job_store = Arc::clone(&store);
                let job_tx = match_tx.clone();
                let job_flag = Arc::clone(&in_flight);

                tokio::spawn(async move {
                    match recognition_attempt(job_store.as_ref(), snapshot, sample_rate).await {
                        Ok(Some(found)) if found.score > MATCH_SCORE_GATE => {
                            let _ = job_tx.try_send(found);
                        }
                        Ok(Some(found)) => {
                            tracing::debug!(
                                score = found.score,
                                "weak candidate '{}', continuing", found.name
                            );
                        }
                        Ok(None) => {}
                        // Per-job failures (including panics in the DSP
                        // stage) are suppressed so the loop stays live.
                        Err(err) => tracing::debug!("recognition attempt discarded: {err}"),
                    }
                    job_flag.store(false, Ordering::SeqCst);
                });
            }
        }
    };

    if let Err(err) = recorder.stop() {
        tracing::warn!("failed to stop capture stream: {err}");
    }

    Ok(outcome)
}

/// One recognition attempt over a snapshot of the capture buffer.
async fn recognition_attempt<S: FingerprintStore>(
    store: &S,
    snapshot: Vec<f32>,
    sample_rate: u32,
) -> Result<Option<Match>> {
    let query = tokio::task::spawn_blocking(move || -> Result<Option<HashMap<String, i32>>> {
        let samples: Vec<f64> = snapshot.iter().map(|&s| s as f64).collect();
        let grid = spectrogram(&samples, sample_rate)?;
        let peaks = pick_peaks(&grid, sample_rate);
        if peaks.len() < MIN_PEAKS {
            tracing::debug!(peaks = peaks.len(), "too few peaks, discarding attempt");
            return Ok(None);
        }

        let mut fingerprints = encode(&peaks);
        if fingerprints.len() < MIN_BASE_FINGERPRINTS {
            tracing::debug!(
                fingerprints = fingerprints.len(),
                "too few fingerprints, discarding attempt"
            );
            return Ok(None);
        }
        fingerprints.extend(encode_with_tolerance(&peaks));

        Ok(Some(build_query(&fingerprints)))
    })
    .await
    .map_err(|e| Error::JobFailed(e.to_string()))??;

    let Some(query) = query else {
        return Ok(None);
    };

    let matches = find_matches(store, &query, &MatchProfile::microphone()).await?;
    Ok(matches.into_iter().next())
}
