//! Spectral front end: frames, chroma, onset envelope, beat tracking
//!
//! Produces the per-frame measurements the core stages consume. The core
//! treats everything here as already frequency/time-calibrated input.

use crate::audio::AudioState;
use crate::config::Config;
use crate::error::{Result as TranscribeResult, TranscribeError};
use crate::spectral::{self, interpolate_peak_bin};
use ndarray::Array2;

/// Maximum pitch candidates kept per frame
const MAX_CANDIDATES: usize = 8;

/// Candidate fundamentals are searched in this band (Hz)
const PITCH_FMIN: f32 = 50.0;
const PITCH_FMAX: f32 = 4200.0;

/// One analysis time-step. Immutable once produced; frames are ordered by
/// time with a fixed hop length.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame center time in seconds
    pub time: f32,
    /// (frequency_hz, magnitude) pairs, strongest first
    pub pitch_candidates: Vec<(f32, f32)>,
    /// RMS energy around the frame center
    pub rms: f32,
    /// Pitch-class energy distribution, L1-normalized
    pub chroma: [f32; 12],
}

pub fn run(state: &mut AudioState, config: &Config) -> TranscribeResult<()> {
    log::info!("Front end: spectral analysis");

    if state.y.is_empty() {
        return Err(TranscribeError::EmptyWaveform);
    }

    let n_fft = config.stft.n_fft;
    let hop = config.stft.hop_length;

    let stft_data = spectral::stft(&state.y, n_fft, hop, &config.stft.window, state.sr);
    let magnitude = spectral::magnitude_spectrogram(&stft_data);
    let n_frames = magnitude.shape()[1];

    let rms = spectral::frame_rms(&state.y, n_frames, hop, n_fft);
    let chroma = chroma_matrix(&magnitude, &stft_data.freqs);

    // Assemble per-frame records
    let mut frames = Vec::with_capacity(n_frames);
    for frame_idx in 0..n_frames {
        let mag_frame: Vec<f32> = magnitude.column(frame_idx).to_vec();
        let candidates = pitch_candidates(&mag_frame, &stft_data.freqs);

        let mut chroma_row = [0.0f32; 12];
        for (c, slot) in chroma_row.iter_mut().enumerate() {
            *slot = chroma[[c, frame_idx]];
        }

        frames.push(Frame {
            time: stft_data.times[frame_idx],
            pitch_candidates: candidates,
            rms: rms[frame_idx],
            chroma: chroma_row,
        });
    }

    let onset_env = onset_strength(&magnitude);
    let (tempo_bpm, beat_times) =
        track_beats(&onset_env, &stft_data.times, state.sr, hop);

    if tempo_bpm.is_none() {
        log::warn!("Front end: beat tracking degenerate, quantization will be skipped");
    }

    log::debug!(
        "Front end: {} frames, {} beats, tempo {:?}",
        frames.len(),
        beat_times.len(),
        tempo_bpm
    );

    state.frames = frames;
    state.freqs = stft_data.freqs;
    state.times = stft_data.times;
    state.magnitude = Some(magnitude);
    state.onset_env = onset_env;
    state.tempo_bpm = tempo_bpm;
    state.beat_times = beat_times;

    Ok(())
}

/// Pick spectral peaks in the pitch band as fundamental candidates, refined
/// by parabolic interpolation, strongest first.
fn pitch_candidates(mag_frame: &[f32], freqs: &[f32]) -> Vec<(f32, f32)> {
    let peak = mag_frame.iter().cloned().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return Vec::new();
    }
    let floor = peak * 0.01;

    let mut candidates: Vec<(f32, f32)> = Vec::new();
    for bin in 1..mag_frame.len().saturating_sub(1) {
        if freqs[bin] < PITCH_FMIN || freqs[bin] > PITCH_FMAX {
            continue;
        }
        let m = mag_frame[bin];
        if m > floor && m >= mag_frame[bin - 1] && m > mag_frame[bin + 1] {
            let refined_bin = interpolate_peak_bin(mag_frame, bin);
            let bin_width = freqs[1] - freqs[0];
            candidates.push((refined_bin * bin_width, m));
        }
    }

    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(MAX_CANDIDATES);
    candidates
}

/// Fold spectrogram bins into a 12 x frames pitch-class energy matrix,
/// L1-normalized per frame
pub fn chroma_matrix(magnitude: &Array2<f32>, freqs: &[f32]) -> Array2<f32> {
    let n_frames = magnitude.shape()[1];
    let mut chroma = Array2::<f32>::zeros((12, n_frames));

    // Precompute bin -> pitch class, skipping sub-audible and very high bins
    let classes: Vec<Option<usize>> = freqs
        .iter()
        .map(|&f| {
            if f < 27.0 || f > 8000.0 {
                None
            } else {
                let midi = spectral::hz_to_midi(f).round() as i32;
                Some(midi.rem_euclid(12) as usize)
            }
        })
        .collect();

    for frame_idx in 0..n_frames {
        for (bin, class) in classes.iter().enumerate() {
            if let Some(c) = class {
                chroma[[*c, frame_idx]] += magnitude[[bin, frame_idx]];
            }
        }
        let sum: f32 = (0..12).map(|c| chroma[[c, frame_idx]]).sum();
        if sum > 0.0 {
            for c in 0..12 {
                chroma[[c, frame_idx]] /= sum;
            }
        }
    }

    chroma
}

/// Positive spectral flux per frame
pub fn onset_strength(magnitude: &Array2<f32>) -> Vec<f32> {
    let mut flux = vec![0.0; magnitude.shape()[1]];

    for t in 1..magnitude.shape()[1] {
        let mut frame_flux = 0.0;
        for f in 0..magnitude.shape()[0] {
            let diff = magnitude[[f, t]] - magnitude[[f, t - 1]];
            if diff > 0.0 {
                frame_flux += diff;
            }
        }
        flux[t] = frame_flux;
    }

    flux
}

/// Estimate tempo from the onset autocorrelation and place beats on the best
/// phase of that period. Returns (None, empty) when the envelope is too flat
/// or short for a meaningful estimate.
pub fn track_beats(
    onset_env: &[f32],
    times: &[f32],
    sr: u32,
    hop_length: usize,
) -> (Option<f32>, Vec<f32>) {
    let frame_rate = sr as f32 / hop_length as f32;

    // Plausible beat periods: 240 down to 30 BPM
    let min_lag = (frame_rate * 60.0 / 240.0).round() as usize;
    let max_lag = (frame_rate * 60.0 / 30.0).round() as usize;

    if onset_env.len() < min_lag * 2 {
        return (None, Vec::new());
    }

    let mean = onset_env.iter().sum::<f32>() / onset_env.len() as f32;
    let energy: f32 = onset_env.iter().map(|&x| (x - mean) * (x - mean)).sum();
    if energy <= f32::EPSILON {
        return (None, Vec::new());
    }

    let mut best_lag = 0;
    let mut best_corr = f32::MIN;
    for lag in min_lag..=max_lag.min(onset_env.len() - 1) {
        let mut corr = 0.0;
        for i in lag..onset_env.len() {
            corr += (onset_env[i] - mean) * (onset_env[i - lag] - mean);
        }
        // Mild preference for moderate tempi over their half/double partners
        let bpm = frame_rate * 60.0 / lag as f32;
        let prior = (-((bpm / 120.0).log2()).powi(2) / 2.0).exp();
        corr *= prior;
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    if best_lag == 0 || best_corr <= 0.0 {
        return (None, Vec::new());
    }

    let tempo = frame_rate * 60.0 / best_lag as f32;

    // Phase: offset whose comb of onsets is strongest
    let mut best_phase = 0;
    let mut best_sum = f32::MIN;
    for phase in 0..best_lag {
        let sum: f32 = (phase..onset_env.len())
            .step_by(best_lag)
            .map(|i| onset_env[i])
            .sum();
        if sum > best_sum {
            best_sum = sum;
            best_phase = phase;
        }
    }

    let beat_times: Vec<f32> = (best_phase..onset_env.len())
        .step_by(best_lag)
        .map(|i| times[i])
        .collect();

    if beat_times.len() < 2 {
        return (None, Vec::new());
    }

    (Some(tempo), beat_times)
}
