//! Monophonic note tracker
//!
//! Consolidates per-frame pitch estimates into a single-voice note sequence.
//! A frame continues the active note when its pitch lies within one semitone
//! of the note's nominal pitch; anything else closes the note. The closed
//! note's pitch is the confidence-weighted median of the accumulated
//! estimates, so transient jitter does not bias the result.

use crate::audio::AudioState;
use crate::config::{Config, TrackerConfig};
use crate::error::Result as TranscribeResult;
use crate::events::NoteEvent;
use crate::frontend::Frame;
use crate::spectral::hz_to_midi;

/// Weighted median over (pitch, weight) samples: sort by pitch and take the
/// sample at the cumulative-weight midpoint.
pub fn weighted_median(samples: &[(u8, f32)]) -> Option<u8> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted: Vec<(u8, f32)> = samples.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let total: f32 = sorted.iter().map(|&(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        // All-zero weights degenerate to the plain median
        return Some(sorted[sorted.len() / 2].0);
    }

    let midpoint = total / 2.0;
    let mut cumulative = 0.0;
    for &(pitch, weight) in &sorted {
        cumulative += weight.max(0.0);
        if cumulative >= midpoint {
            return Some(pitch);
        }
    }
    Some(sorted[sorted.len() - 1].0)
}

/// Per-frame pitch decision: the strongest candidate, or None when the frame
/// is unvoiced (quiet spectrum or RMS below the silence floor).
///
/// Returns (midi_pitch, weight, normalized_magnitude).
pub fn frame_pitch(frame: &Frame, config: &TrackerConfig) -> Option<(u8, f32, f32)> {
    if frame.rms < config.silence_rms_threshold {
        return None;
    }

    let &(freq, mag) = frame.pitch_candidates.first()?;
    if mag < config.magnitude_threshold || freq <= 0.0 {
        return None;
    }

    let midi = hz_to_midi(freq).round();
    if !(0.0..=127.0).contains(&midi) {
        return None;
    }

    let weight = mag / config.magnitude_threshold;
    Some((midi as u8, weight, mag))
}

/// Accumulator for the currently sounding note
struct ActiveNote {
    nominal_pitch: u8,
    start: f32,
    samples: Vec<(u8, f32)>,
    magnitude_sum: f32,
}

impl ActiveNote {
    fn new(pitch: u8, start: f32, weight: f32, magnitude: f32) -> Self {
        Self {
            nominal_pitch: pitch,
            start,
            samples: vec![(pitch, weight)],
            magnitude_sum: magnitude,
        }
    }

    fn push(&mut self, pitch: u8, weight: f32, magnitude: f32) {
        self.samples.push((pitch, weight));
        self.magnitude_sum += magnitude;
    }

    /// Close against `end`; None when the span is shorter than the minimum
    fn close(self, end: f32, min_duration: f32) -> Option<NoteEvent> {
        let duration = end - self.start;
        if duration < min_duration || duration <= 0.0 {
            return None;
        }

        let pitch = weighted_median(&self.samples).unwrap_or(self.nominal_pitch);
        let confidence = (self.magnitude_sum / self.samples.len() as f32).clamp(0.0, 1.0);
        let velocity = (confidence * 127.0).clamp(20.0, 127.0) as u8;

        Some(NoteEvent {
            start: self.start,
            duration,
            pitch,
            velocity,
            confidence,
        })
    }
}

/// Track a frame sequence into a non-overlapping note sequence
pub fn track_notes(frames: &[Frame], config: &TrackerConfig) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let mut active: Option<ActiveNote> = None;

    for frame in frames {
        let detected = frame_pitch(frame, config);

        match (&mut active, detected) {
            (Some(note), Some((pitch, weight, mag)))
                if (pitch as i32 - note.nominal_pitch as i32).abs() <= 1 =>
            {
                note.push(pitch, weight, mag);
            }
            (current, detected) => {
                // Close whatever was sounding at the first non-matching frame
                if let Some(note) = current.take() {
                    if let Some(event) = note.close(frame.time, config.min_note_duration_sec) {
                        notes.push(event);
                    }
                }
                if let Some((pitch, weight, mag)) = detected {
                    *current = Some(ActiveNote::new(pitch, frame.time, weight, mag));
                }
            }
        }
    }

    // A span surviving to the end closes against the final timestamp
    if let (Some(note), Some(last)) = (active, frames.last()) {
        if let Some(event) = note.close(last.time, config.min_note_duration_sec) {
            notes.push(event);
        }
    }

    notes.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    remove_overlaps(notes)
}

/// Enforce monophonic exclusivity: trim the end of the earlier of two
/// overlapping notes to the start of the later one. Trimming produces a
/// replacement event; a note trimmed to nothing is dropped.
pub fn remove_overlaps(notes: Vec<NoteEvent>) -> Vec<NoteEvent> {
    let mut cleaned: Vec<NoteEvent> = Vec::with_capacity(notes.len());

    for note in notes {
        if let Some(prev) = cleaned.last() {
            if note.start < prev.end() {
                let trimmed_duration = note.start - prev.start;
                if let Some(prev) = cleaned.pop() {
                    if trimmed_duration > 0.0 {
                        cleaned.push(NoteEvent {
                            duration: trimmed_duration,
                            ..prev
                        });
                    }
                }
            }
        }
        cleaned.push(note);
    }

    cleaned
}

pub fn run(state: &mut AudioState, config: &Config) -> TranscribeResult<()> {
    log::info!("Monophonic tracker");

    state.notes = track_notes(&state.frames, &config.tracker);
    state.polyphonic = false;

    log::info!("Monophonic tracker: {} notes", state.notes.len());
    Ok(())
}
