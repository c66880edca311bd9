//! Rhythm quantizer
//!
//! Snaps note timings to a beat-subdivision grid derived from the mean
//! inter-beat interval. Start and end are quantized independently and the
//! duration recomputed; a start/end pair that collapses at a grid boundary is
//! clamped to one grid unit (see the boundary test).

use crate::audio::AudioState;
use crate::config::Config;
use crate::error::Result as TranscribeResult;
use crate::events::NoteEvent;

/// Grid spacing in seconds for a beat sequence, or None when there are too
/// few beats to define a grid
pub fn grid_spacing(beat_times: &[f32], subdivisions: usize) -> Option<f32> {
    if beat_times.len() < 2 || subdivisions == 0 {
        return None;
    }
    let beat_duration = (beat_times[beat_times.len() - 1] - beat_times[0])
        / (beat_times.len() - 1) as f32;
    if beat_duration <= 0.0 {
        return None;
    }
    Some(beat_duration / subdivisions as f32)
}

/// Quantize a timestamp to the nearest grid position: find the nearest beat,
/// round the offset from that beat to a grid multiple, add it back, and clamp
/// the result to be non-negative.
pub fn quantize_time(time: f32, beat_times: &[f32], subdivisions: usize) -> f32 {
    let Some(spacing) = grid_spacing(beat_times, subdivisions) else {
        return time;
    };

    let mut nearest_beat = beat_times[0];
    for &beat in &beat_times[1..] {
        if (beat - time).abs() < (nearest_beat - time).abs() {
            nearest_beat = beat;
        }
    }

    let offset = time - nearest_beat;
    let steps = (offset / spacing).round();
    (nearest_beat + steps * spacing).max(0.0)
}

/// Quantize a note sequence against a beat grid. Collapsed durations are
/// clamped to one grid unit; each adjustment yields a replacement event.
pub fn quantize_notes(
    notes: &[NoteEvent],
    beat_times: &[f32],
    subdivisions: usize,
) -> Vec<NoteEvent> {
    let Some(spacing) = grid_spacing(beat_times, subdivisions) else {
        return notes.to_vec();
    };

    let mut quantized: Vec<NoteEvent> = notes
        .iter()
        .map(|note| {
            let start = quantize_time(note.start, beat_times, subdivisions);
            let end = quantize_time(note.end(), beat_times, subdivisions);
            let duration = if end - start > 0.0 {
                end - start
            } else {
                spacing
            };
            NoteEvent {
                start,
                duration,
                ..*note
            }
        })
        .collect();

    quantized.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    quantized
}

pub fn run(state: &mut AudioState, config: &Config) -> TranscribeResult<()> {
    if !config.quantize.enabled {
        log::debug!("Quantizer disabled, keeping raw timings");
        return Ok(());
    }

    if state.beat_times.len() < 2 {
        log::warn!("Quantizer: fewer than 2 beats, skipping");
        return Ok(());
    }

    log::info!(
        "Quantizer: {} beats, {} subdivisions per beat",
        state.beat_times.len(),
        config.quantize.subdivisions
    );

    state.notes = quantize_notes(&state.notes, &state.beat_times, config.quantize.subdivisions);
    Ok(())
}
