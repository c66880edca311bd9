//! MIDI export
//!
//! Writes the assembled transcription as a standard MIDI file: one note
//! track, plus an optional second track rendering each chord segment as a
//! block chord.

use crate::config::Config;
use crate::error::{Result as TranscribeResult, TranscribeError};
use crate::events::{ChordSegment, NoteEvent, Transcription};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, TrackEvent, TrackEventKind};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const DEFAULT_TEMPO_BPM: f32 = 120.0;

/// Export the transcription as a MIDI file
pub fn export_midi(
    transcription: &Transcription,
    path: &Path,
    config: &Config,
) -> TranscribeResult<()> {
    let bytes = render_midi(transcription, config)?;

    let mut file = File::create(path)?;
    file.write_all(&bytes)?;

    log::info!(
        "Exported {} notes to {}",
        transcription.notes.len(),
        path.display()
    );
    Ok(())
}

/// Render the transcription to MIDI file bytes
pub fn render_midi(transcription: &Transcription, config: &Config) -> TranscribeResult<Vec<u8>> {
    let ppq = config.export.ppq;
    let tempo_bpm = transcription.tempo_bpm.unwrap_or(DEFAULT_TEMPO_BPM);
    let ticks_per_sec = ppq as f32 * tempo_bpm / 60.0;

    let mut tracks = Vec::new();
    tracks.push(note_track(transcription, config, ticks_per_sec, tempo_bpm)?);

    if config.export.chord_track && !transcription.chords.is_empty() {
        tracks.push(chord_track(&transcription.chords, ticks_per_sec));
    }

    let header = Header {
        format: if tracks.len() > 1 {
            Format::Parallel
        } else {
            Format::SingleTrack
        },
        timing: midly::Timing::Metrical(u15::from(ppq)),
    };

    let smf = Smf { header, tracks };
    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| TranscribeError::MidiExportError(format!("{:?}", e)))?;
    Ok(bytes)
}

/// Timed MIDI message at an absolute tick, before delta encoding
enum Timed {
    On { pitch: u8, velocity: u8 },
    Off { pitch: u8 },
}

/// Collect note on/off pairs at absolute ticks, then delta-encode. Note-offs
/// sort before note-ons at the same tick so back-to-back repeats of a pitch
/// stay well-formed.
fn encode_notes(notes: &[NoteEvent], ticks_per_sec: f32) -> Vec<(u32, Timed)> {
    let mut timed: Vec<(u32, Timed)> = Vec::with_capacity(notes.len() * 2);

    for note in notes {
        let on_tick = (note.start * ticks_per_sec).round() as u32;
        let off_tick = ((note.end()) * ticks_per_sec).round() as u32;
        let off_tick = off_tick.max(on_tick + 1);

        timed.push((
            on_tick,
            Timed::On {
                pitch: note.pitch,
                velocity: note.velocity,
            },
        ));
        timed.push((off_tick, Timed::Off { pitch: note.pitch }));
    }

    timed.sort_by_key(|(tick, msg)| (*tick, matches!(msg, Timed::On { .. }) as u8));
    timed
}

fn delta_encode(timed: Vec<(u32, Timed)>, channel: u8, track: &mut Vec<TrackEvent<'static>>) {
    let mut current_tick = 0u32;
    for (tick, msg) in timed {
        let delta = tick.saturating_sub(current_tick);
        current_tick = tick;
        let message = match msg {
            Timed::On { pitch, velocity } => MidiMessage::NoteOn {
                key: u7::from(pitch.min(127)),
                vel: u7::from(velocity.min(127)),
            },
            Timed::Off { pitch } => MidiMessage::NoteOff {
                key: u7::from(pitch.min(127)),
                vel: u7::from(0),
            },
        };
        track.push(TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Midi {
                channel: u4::from(channel),
                message,
            },
        });
    }
}

fn note_track(
    transcription: &Transcription,
    config: &Config,
    ticks_per_sec: f32,
    tempo_bpm: f32,
) -> TranscribeResult<Vec<TrackEvent<'static>>> {
    let mut track = Vec::new();

    let tempo_uspq = (60_000_000.0 / tempo_bpm) as u32;
    track.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(tempo_uspq))),
    });

    if let Some(ts) = transcription.time_signature {
        let denominator_log2 = (ts.denominator as f32).log2() as u8;
        track.push(TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                ts.numerator,
                denominator_log2,
                24,
                8,
            )),
        });
    }

    track.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Midi {
            channel: u4::from(0),
            message: MidiMessage::ProgramChange {
                program: u7::from(config.export.program.min(127)),
            },
        },
    });

    delta_encode(encode_notes(&transcription.notes, ticks_per_sec), 0, &mut track);

    track.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    Ok(track)
}

/// Render each chord segment as a block chord around middle C on channel 1
fn chord_track(chords: &[ChordSegment], ticks_per_sec: f32) -> Vec<TrackEvent<'static>> {
    let mut timed: Vec<(u32, Timed)> = Vec::new();

    for chord in chords {
        let on_tick = (chord.start * ticks_per_sec).round() as u32;
        let off_tick = ((chord.end()) * ticks_per_sec).round() as u32;
        let off_tick = off_tick.max(on_tick + 1);
        let velocity = (chord.confidence * 127.0).clamp(20.0, 100.0) as u8;

        for &interval in chord.chord_type.intervals() {
            let pitch = 48 + chord.root_pitch_class + interval;
            timed.push((on_tick, Timed::On { pitch, velocity }));
            timed.push((off_tick, Timed::Off { pitch }));
        }
    }

    timed.sort_by_key(|(tick, msg)| (*tick, matches!(msg, Timed::On { .. }) as u8));

    let mut track = Vec::new();
    delta_encode(timed, 1, &mut track);
    track.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}
