//! Validation tests for the event assembler and full pipeline

use pitch2midi::audio::AudioState;
use pitch2midi::config::{Config, TranscriptionMode};
use pitch2midi::events::NoteEvent;
use pitch2midi::stages::assemble;
use pitch2midi::Transcriber;
use std::f32::consts::PI;

fn note(start: f32, duration: f32, pitch: u8) -> NoteEvent {
    NoteEvent {
        start,
        duration,
        pitch,
        velocity: 80,
        confidence: 0.8,
    }
}

fn generate_sine(freq: f32, amplitude: f32, duration_sec: f32, sr: u32) -> Vec<f32> {
    let n_samples = (duration_sec * sr as f32) as usize;
    (0..n_samples)
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sr as f32).sin())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_drops_degenerate_durations() {
        let notes = vec![note(0.0, 0.5, 60), note(0.6, 0.0, 62), note(0.7, -0.1, 64)];
        let cleaned = assemble::finalize_notes(&notes);

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].pitch, 60);
    }

    #[test]
    fn test_finalize_sorts_by_start() {
        let notes = vec![note(1.0, 0.5, 64), note(0.0, 0.5, 60)];
        let cleaned = assemble::finalize_notes(&notes);

        assert_eq!(cleaned[0].pitch, 60);
        assert_eq!(cleaned[1].pitch, 64);
    }

    #[test]
    fn test_pipeline_end_to_end_monophonic() {
        let mut config = Config::default();
        // Beat estimates on a steady sine are unreliable; keep raw timings
        config.quantize.enabled = false;

        let sr = 44100;
        let state = AudioState::from_samples(generate_sine(440.0, 0.5, 2.0, sr), sr, &config);
        let transcription = Transcriber::new(config).transcribe(state).unwrap();

        assert!(!transcription.polyphonic);
        assert_eq!(transcription.notes.len(), 1);
        assert_eq!(transcription.notes[0].pitch, 69);
        for note in &transcription.notes {
            assert!(note.duration > 0.0);
        }
        // A lone pitch class still yields some key estimate
        assert!(transcription.key.is_some());
    }

    #[test]
    fn test_pipeline_end_to_end_polyphonic() {
        let mut config = Config::default();
        config.mode = TranscriptionMode::Polyphonic;
        config.quantize.enabled = false;

        let sr = 44100;
        let n_samples = (2.0 * sr as f32) as usize;
        let y: Vec<f32> = (0..n_samples)
            .map(|i| {
                let t = i as f32 / sr as f32;
                0.4 * (2.0 * PI * 261.63 * t).sin()
                    + 0.35 * (2.0 * PI * 329.63 * t).sin()
                    + 0.3 * (2.0 * PI * 392.0 * t).sin()
            })
            .collect();

        let state = AudioState::from_samples(y, sr, &config);
        let transcription = Transcriber::new(config).transcribe(state).unwrap();

        assert!(transcription.polyphonic);
        assert_eq!(transcription.notes.len(), 3);
    }

    #[test]
    fn test_pipeline_accepts_silence() {
        let mut config = Config::default();
        config.quantize.enabled = false;

        let sr = 44100;
        let state = AudioState::from_samples(vec![0.0; sr as usize], sr, &config);
        let transcription = Transcriber::new(config).transcribe(state).unwrap();

        assert!(transcription.notes.is_empty());
        assert!(transcription.chords.is_empty());
        assert!(transcription.key.is_none());
    }
}
