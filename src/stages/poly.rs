//! Polyphonic note tracker
//!
//! Builds a harmonic-summation salience surface over the piano pitch range
//! and tracks one small state machine per MIDI pitch. Pitches appear and
//! disappear independently, so concurrent notes fall out naturally.
//!
//! Known limitation: a re-attack of an already-sounding pitch is not detected
//! as a new note, since the per-pitch state machine only observes
//! presence/absence among the kept peaks.

use crate::audio::AudioState;
use crate::config::{Config, PolyphonyConfig};
use crate::error::{Result as TranscribeResult, TranscribeError};
use crate::events::NoteEvent;
use crate::spectral::midi_to_hz;
use ndarray::Array2;

/// Minimum peak separation along the pitch axis, in semitones
const MIN_PEAK_SEPARATION: usize = 3;

/// Salience surface: one score per (MIDI pitch, frame).
///
/// For a candidate fundamental, spectral energy at its integer harmonics is
/// summed with weight `1/h`. Candidates whose fundamental bin carries almost
/// no energy relative to the frame peak score zero, which suppresses the
/// subharmonic ghosts a plain harmonic sum would produce.
pub fn compute_salience(
    magnitude: &Array2<f32>,
    freqs: &[f32],
    config: &PolyphonyConfig,
    min_magnitude: f32,
) -> Array2<f32> {
    let n_pitches = (config.max_midi_pitch - config.min_midi_pitch) as usize + 1;
    let n_frames = magnitude.shape()[1];
    let n_bins = magnitude.shape()[0];
    let bin_width = if freqs.len() > 1 { freqs[1] - freqs[0] } else { 1.0 };
    let nyquist = freqs[freqs.len() - 1];

    // Precompute harmonic bin indices per candidate pitch
    let harmonic_bins: Vec<Vec<usize>> = (0..n_pitches)
        .map(|p| {
            let f0 = midi_to_hz((config.min_midi_pitch as usize + p) as f32);
            (1..=config.num_harmonics)
                .filter_map(|h| {
                    let freq = f0 * h as f32;
                    if freq >= nyquist {
                        return None;
                    }
                    let bin = (freq / bin_width).round() as usize;
                    (bin < n_bins).then_some(bin)
                })
                .collect()
        })
        .collect();

    let mut salience = Array2::<f32>::zeros((n_pitches, n_frames));

    for frame_idx in 0..n_frames {
        let frame_peak = (0..n_bins)
            .map(|b| magnitude[[b, frame_idx]])
            .fold(0.0f32, f32::max);
        // Quiet frames produce no candidates at all; without this floor the
        // per-frame normalization would amplify noise into spurious peaks
        if frame_peak < min_magnitude {
            continue;
        }
        let gate = frame_peak * config.fundamental_gate;

        for (p, bins) in harmonic_bins.iter().enumerate() {
            let Some(&fundamental_bin) = bins.first() else {
                continue;
            };
            if magnitude[[fundamental_bin, frame_idx]] < gate {
                continue;
            }

            let mut sum = 0.0;
            for (h, &bin) in bins.iter().enumerate() {
                sum += magnitude[[bin, frame_idx]] / (h + 1) as f32;
            }
            salience[[p, frame_idx]] = sum;
        }
    }

    salience
}

/// Peak-pick one frame of frame-normalized salience along the pitch axis:
/// local maxima above the relative threshold, at least `MIN_PEAK_SEPARATION`
/// semitones apart, top `max_polyphony` by height. Returns pitch indices.
pub fn pick_peaks(frame_salience: &[f32], config: &PolyphonyConfig) -> Vec<usize> {
    let mut peaks: Vec<(usize, f32)> = Vec::new();

    for i in 0..frame_salience.len() {
        let v = frame_salience[i];
        if v < config.salience_threshold {
            continue;
        }
        let left = if i > 0 { frame_salience[i - 1] } else { 0.0 };
        let right = if i + 1 < frame_salience.len() {
            frame_salience[i + 1]
        } else {
            0.0
        };
        if v >= left && v > right {
            peaks.push((i, v));
        }
    }

    // Highest first, then greedily enforce the separation
    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut kept: Vec<usize> = Vec::new();
    for (idx, _) in peaks {
        if kept.len() >= config.max_polyphony {
            break;
        }
        if kept
            .iter()
            .all(|&k| k.abs_diff(idx) >= MIN_PEAK_SEPARATION)
        {
            kept.push(idx);
        }
    }

    kept
}

/// Per-pitch tracking state, arena-indexed by pitch offset from the lowest
/// candidate. The pitch domain is fixed and bounded, so a flat table beats a
/// dynamic map here.
#[derive(Debug, Clone, Copy, Default)]
struct PitchState {
    active: bool,
    start_time: f32,
    frames: u32,
    salience_sum: f32,
}

impl PitchState {
    fn activate(&mut self, time: f32) {
        self.active = true;
        self.start_time = time;
        self.frames = 0;
        self.salience_sum = 0.0;
    }

    fn accumulate(&mut self, salience: f32) {
        self.frames += 1;
        self.salience_sum += salience;
    }

    /// Close the active span against `end`, emitting a note when long enough
    fn close(&mut self, pitch: u8, end: f32, min_duration: f32) -> Option<NoteEvent> {
        let start = self.start_time;
        let duration = end - start;
        let mean_salience = if self.frames > 0 {
            self.salience_sum / self.frames as f32
        } else {
            0.0
        };
        *self = PitchState::default();

        if duration < min_duration || duration <= 0.0 {
            return None;
        }

        Some(NoteEvent {
            start,
            duration,
            pitch,
            velocity: (mean_salience * 127.0).clamp(20.0, 127.0) as u8,
            confidence: mean_salience.clamp(0.0, 1.0),
        })
    }
}

/// Track the salience surface into (possibly overlapping) note events
pub fn track_notes(
    salience: &Array2<f32>,
    times: &[f32],
    config: &PolyphonyConfig,
    min_duration: f32,
) -> Vec<NoteEvent> {
    let n_pitches = salience.shape()[0];
    let n_frames = salience.shape()[1];
    let mut states = vec![PitchState::default(); n_pitches];
    let mut notes = Vec::new();

    let mut normalized = vec![0.0f32; n_pitches];

    for frame_idx in 0..n_frames {
        let frame_max = (0..n_pitches)
            .map(|p| salience[[p, frame_idx]])
            .fold(0.0f32, f32::max);
        let scale = if frame_max > 0.0 { 1.0 / frame_max } else { 1.0 };
        for p in 0..n_pitches {
            normalized[p] = salience[[p, frame_idx]] * scale;
        }

        let kept = pick_peaks(&normalized, config);

        let mut present = vec![false; n_pitches];
        for &p in &kept {
            present[p] = true;
        }

        for p in 0..n_pitches {
            let pitch = config.min_midi_pitch + p as u8;
            if present[p] {
                if !states[p].active {
                    states[p].activate(times[frame_idx]);
                }
                states[p].accumulate(normalized[p]);
            } else if states[p].active {
                if let Some(note) = states[p].close(pitch, times[frame_idx], min_duration) {
                    notes.push(note);
                }
            }
        }
    }

    // Anything still sounding closes against the final frame time
    if let Some(&last) = times.last() {
        for p in 0..n_pitches {
            if states[p].active {
                let pitch = config.min_midi_pitch + p as u8;
                if let Some(note) = states[p].close(pitch, last, min_duration) {
                    notes.push(note);
                }
            }
        }
    }

    notes.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    notes
}

pub fn run(state: &mut AudioState, config: &Config) -> TranscribeResult<()> {
    log::info!("Polyphonic tracker");

    let magnitude = state.magnitude.as_ref().ok_or_else(|| {
        TranscribeError::ProcessingPipelineError(
            "Front end must run before the polyphonic tracker".to_string(),
        )
    })?;

    let salience = compute_salience(
        magnitude,
        &state.freqs,
        &config.polyphony,
        config.tracker.magnitude_threshold,
    );
    state.notes = track_notes(
        &salience,
        &state.times,
        &config.polyphony,
        config.tracker.min_note_duration_sec,
    );
    state.polyphonic = true;

    log::info!("Polyphonic tracker: {} notes", state.notes.len());
    Ok(())
}
