//! Validation tests for the polyphonic note tracker

use pitch2midi::audio::AudioState;
use pitch2midi::config::{Config, TranscriptionMode};
use pitch2midi::frontend;
use pitch2midi::stages::poly;
use std::f32::consts::PI;

/// Mix of pure tones at the given (freq, amplitude) pairs
fn generate_mix(tones: &[(f32, f32)], duration_sec: f32, sr: u32) -> Vec<f32> {
    let n_samples = (duration_sec * sr as f32) as usize;
    (0..n_samples)
        .map(|i| {
            let t = i as f32 / sr as f32;
            tones
                .iter()
                .map(|&(freq, amp)| amp * (2.0 * PI * freq * t).sin())
                .sum()
        })
        .collect()
}

fn poly_config() -> Config {
    Config {
        mode: TranscriptionMode::Polyphonic,
        ..Config::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triad_produces_three_overlapping_notes() {
        let config = poly_config();
        let sr = 44100;
        // C4 + E4 + G4
        let y = generate_mix(
            &[(261.63, 0.4), (329.63, 0.35), (392.0, 0.3)],
            2.0,
            sr,
        );
        let mut state = AudioState::from_samples(y, sr, &config);

        frontend::run(&mut state, &config).unwrap();
        poly::run(&mut state, &config).unwrap();

        assert!(state.polyphonic);
        assert_eq!(state.notes.len(), 3, "got {:?}", state.notes);

        let mut pitches: Vec<u8> = state.notes.iter().map(|n| n.pitch).collect();
        pitches.sort_unstable();
        for (found, expected) in pitches.iter().zip([60u8, 64, 67]) {
            assert!(
                (*found as i32 - expected as i32).abs() <= 1,
                "pitch {} not within a semitone of {}",
                found,
                expected
            );
        }

        // Concurrent notes overlap in time
        for note in &state.notes {
            assert!(note.start < 0.1, "late start in {:?}", note);
            assert!(note.duration > 1.5, "short note in {:?}", note);
        }
    }

    #[test]
    fn test_silence_produces_no_notes() {
        let config = poly_config();
        let sr = 44100;
        let y: Vec<f32> = (0..sr as usize)
            .map(|_| (rand::random::<f32>() - 0.5) * 0.001)
            .collect();
        let mut state = AudioState::from_samples(y, sr, &config);

        frontend::run(&mut state, &config).unwrap();
        poly::run(&mut state, &config).unwrap();

        assert!(state.notes.is_empty(), "got {:?}", state.notes);
    }

    #[test]
    fn test_poly_requires_front_end() {
        let config = poly_config();
        let mut state = AudioState::from_samples(vec![0.0; 1024], 44100, &config);
        assert!(poly::run(&mut state, &config).is_err());
    }

    #[test]
    fn test_peak_picking_respects_separation_and_count() {
        let config = poly_config();
        let mut salience = vec![0.0f32; 30];
        // Two peaks one semitone apart: only the taller survives
        salience[10] = 1.0;
        salience[11] = 0.9;
        salience[20] = 0.8;

        let peaks = poly::pick_peaks(&salience, &config.polyphony);
        assert_eq!(peaks.len(), 2);
        assert!(peaks.contains(&10));
        assert!(peaks.contains(&20));
        assert!(!peaks.contains(&11));
    }

    #[test]
    fn test_peak_picking_threshold() {
        let config = poly_config();
        let mut salience = vec![0.0f32; 30];
        salience[10] = 0.2; // below the 0.3 relative threshold

        let peaks = poly::pick_peaks(&salience, &config.polyphony);
        assert!(peaks.is_empty());
    }
}
