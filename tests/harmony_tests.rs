//! Validation tests for the harmony analyzer

use pitch2midi::events::{ChordSegment, ChordType, KeyEstimate, Mode};
use pitch2midi::stages::harmony;

/// Chroma vector with unit energy at the given pitch classes
fn chroma_of(classes: &[usize]) -> [f32; 12] {
    let mut chroma = [0.0f32; 12];
    for &c in classes {
        chroma[c] = 1.0;
    }
    chroma
}

/// Chroma shaped exactly like the major profile rotated to `tonic`
fn profile_chroma(tonic: usize) -> [f32; 12] {
    let mut chroma = [0.0f32; 12];
    for (i, slot) in chroma.iter_mut().enumerate() {
        // Inverse of the detector's rotation: index (tonic + i) % 12 carries
        // profile value i
        *slot = harmony::MAJOR_PROFILE[(12 + i - tonic) % 12];
    }
    chroma
}

fn segment(start: f32, duration: f32, root: u8, chord_type: ChordType, conf: f32) -> ChordSegment {
    ChordSegment {
        start,
        duration,
        root_pitch_class: root,
        chord_type,
        confidence: conf,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pearson_perfect_and_inverse() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        assert!((harmony::pearson(&a, &b) - 1.0).abs() < 1e-5);

        let c = [4.0, 3.0, 2.0, 1.0];
        assert!((harmony::pearson(&a, &c) + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_pearson_constant_input_is_zero() {
        let a = [1.0, 1.0, 1.0, 1.0];
        let b = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(harmony::pearson(&a, &b), 0.0);
    }

    #[test]
    fn test_detect_key_c_major_profile() {
        let (tonic, mode, corr) = harmony::detect_key(&profile_chroma(0));
        assert_eq!(tonic, 0);
        assert_eq!(mode, Mode::Major);
        assert!(corr > 0.99, "correlation {}", corr);
    }

    #[test]
    fn test_detect_key_transposed_profile() {
        // The same profile rotated to G must detect tonic 7
        let (tonic, mode, corr) = harmony::detect_key(&profile_chroma(7));
        assert_eq!(tonic, 7);
        assert_eq!(mode, Mode::Major);
        assert!(corr > 0.99);
    }

    #[test]
    fn test_estimate_key_degenerate_chroma() {
        assert!(harmony::estimate_key(&[], 10).is_none());
        let silent = vec![[0.0f32; 12]; 20];
        assert!(harmony::estimate_key(&silent, 10).is_none());
    }

    #[test]
    fn test_key_consistency_full_agreement() {
        let frames = vec![profile_chroma(0); 100];
        let key = harmony::estimate_key(&frames, 10).unwrap();
        assert_eq!(key.tonic_pitch_class, 0);
        assert!((key.consistency - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_key_consistency_short_clip_is_one() {
        // Fewer frames than one window counts as fully consistent
        let frames = vec![profile_chroma(0); 5];
        let key = harmony::estimate_key(&frames, 100).unwrap();
        assert!((key.consistency - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_detect_chord_exact_major_triad() {
        let (root, chord_type, conf) =
            harmony::detect_chord(&chroma_of(&[0, 4, 7]), 0.6).unwrap();
        assert_eq!(root, 0);
        assert_eq!(chord_type, ChordType::Major);
        assert!(conf > 0.99, "confidence {}", conf);
    }

    #[test]
    fn test_detect_chord_minor_seventh() {
        // A C E G = Am7
        let (root, chord_type, _) =
            harmony::detect_chord(&chroma_of(&[9, 0, 4, 7]), 0.6).unwrap();
        assert_eq!(root, 9);
        assert_eq!(chord_type, ChordType::Minor7);
    }

    #[test]
    fn test_uniform_chroma_matches_no_chord() {
        let uniform = [1.0f32 / 12.0; 12];
        assert!(harmony::detect_chord(&uniform, 0.6).is_none());
    }

    #[test]
    fn test_empty_chroma_matches_no_chord() {
        assert!(harmony::detect_chord(&[0.0f32; 12], 0.6).is_none());
    }

    #[test]
    fn test_merge_adjacent_identical_segments() {
        let segments = vec![
            segment(0.0, 0.5, 0, ChordType::Major, 0.9),
            segment(0.5, 0.5, 0, ChordType::Major, 0.7),
            segment(1.0, 0.5, 7, ChordType::Major, 0.8),
        ];
        let merged = harmony::merge_segments(segments);

        assert_eq!(merged.len(), 2);
        assert!((merged[0].duration - 1.0).abs() < 1e-5);
        // First sub-segment's confidence is kept
        assert!((merged[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(merged[1].root_pitch_class, 7);
    }

    #[test]
    fn test_gap_breaks_merge() {
        let segments = vec![
            segment(0.0, 0.5, 0, ChordType::Major, 0.9),
            segment(0.6, 0.5, 0, ChordType::Major, 0.7),
        ];
        let merged = harmony::merge_segments(segments);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_tonal_stability_counts_diatonic_roots() {
        let key = KeyEstimate {
            tonic_pitch_class: 0,
            mode: Mode::Major,
            correlation: 0.9,
            consistency: 1.0,
        };
        let chords = vec![
            segment(0.0, 1.0, 0, ChordType::Major, 0.9),  // C, diatonic
            segment(1.0, 1.0, 7, ChordType::Major, 0.9),  // G, diatonic
            segment(2.0, 1.0, 6, ChordType::Major, 0.9),  // F#, chromatic
        ];
        let stability = harmony::tonal_stability(&chords, &key);
        assert!((stability - 2.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_tonal_stability_empty_chords() {
        let key = KeyEstimate {
            tonic_pitch_class: 0,
            mode: Mode::Major,
            correlation: 0.9,
            consistency: 1.0,
        };
        assert_eq!(harmony::tonal_stability(&[], &key), 0.0);
    }

    #[test]
    fn test_time_signature_defaults_without_beats() {
        let ts = harmony::estimate_time_signature(&[], &[], 86.0);
        assert_eq!((ts.numerator, ts.denominator), (4, 4));
    }

    #[test]
    fn test_time_signature_detects_triple_meter() {
        // Beats every 0.5 s with every third beat accented
        let frame_rate = 86.13f32;
        let beat_times: Vec<f32> = (0..24).map(|i| i as f32 * 0.5).collect();
        let n_frames = (12.5 * frame_rate) as usize;
        let mut onset_env = vec![0.1f32; n_frames];
        for (i, &t) in beat_times.iter().enumerate() {
            let frame = (t * frame_rate).round() as usize;
            onset_env[frame] = if i % 3 == 0 { 1.0 } else { 0.3 };
        }

        let ts = harmony::estimate_time_signature(&beat_times, &onset_env, frame_rate);
        assert_eq!((ts.numerator, ts.denominator), (3, 4));
    }

    #[test]
    fn test_time_signature_flat_accents_default_to_common_time() {
        let frame_rate = 86.13f32;
        let beat_times: Vec<f32> = (0..16).map(|i| i as f32 * 0.5).collect();
        let n_frames = (8.5 * frame_rate) as usize;
        let mut onset_env = vec![0.1f32; n_frames];
        // Accent every fourth beat: neither triple grouping aligns
        for (i, &t) in beat_times.iter().enumerate() {
            let frame = (t * frame_rate).round() as usize;
            onset_env[frame] = if i % 4 == 0 { 1.0 } else { 0.3 };
        }

        let ts = harmony::estimate_time_signature(&beat_times, &onset_env, frame_rate);
        assert_eq!((ts.numerator, ts.denominator), (4, 4));
    }
}
