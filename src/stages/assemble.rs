//! Event assembler: final filtering and the immutable transcription record

use crate::audio::AudioState;
use crate::config::Config;
use crate::error::Result as TranscribeResult;
use crate::events::{NoteEvent, Transcription};

/// Drop non-positive durations and order by start time. Assembly is the last
/// point where an event can be rejected.
pub fn finalize_notes(notes: &[NoteEvent]) -> Vec<NoteEvent> {
    let mut cleaned: Vec<NoteEvent> = notes
        .iter()
        .filter(|n| n.duration > 0.0)
        .cloned()
        .collect();
    cleaned.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    cleaned
}

pub fn run(state: &mut AudioState, _config: &Config) -> TranscribeResult<()> {
    let notes = finalize_notes(&state.notes);
    let dropped = state.notes.len() - notes.len();
    if dropped > 0 {
        log::debug!("Assembler: dropped {} degenerate events", dropped);
    }

    let mut chords = state.chords.clone();
    chords.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

    state.transcription = Some(Transcription {
        notes,
        polyphonic: state.polyphonic,
        chords,
        key: state.key.clone(),
        tonal_stability: state.tonal_stability,
        tempo_bpm: state.tempo_bpm,
        time_signature: state.time_signature,
    });

    let t = state.transcription.as_ref().map(|t| t.notes.len()).unwrap_or(0);
    log::info!("Assembler: {} notes in final transcription", t);
    Ok(())
}
