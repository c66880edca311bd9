//! Validation tests for the rhythm quantizer

use pitch2midi::events::NoteEvent;
use pitch2midi::stages::quantize;

fn note(start: f32, duration: f32, pitch: u8) -> NoteEvent {
    NoteEvent {
        start,
        duration,
        pitch,
        velocity: 80,
        confidence: 0.8,
    }
}

/// Uniform beat grid: beats every 0.5 s starting at 0.5
fn regular_beats() -> Vec<f32> {
    vec![0.5, 1.0, 1.5, 2.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_spacing_from_mean_interval() {
        let spacing = quantize::grid_spacing(&regular_beats(), 4).unwrap();
        assert!((spacing - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_grid_spacing_degenerate() {
        assert!(quantize::grid_spacing(&[0.5], 4).is_none());
        assert!(quantize::grid_spacing(&[], 4).is_none());
        assert!(quantize::grid_spacing(&[0.5, 0.5], 4).is_none());
    }

    #[test]
    fn test_quantize_time_snaps_to_nearest_grid_position() {
        let beats = regular_beats();
        // 0.62 is nearest beat 0.5 plus ~one grid step
        let q = quantize::quantize_time(0.62, &beats, 4);
        assert!((q - 0.625).abs() < 1e-4);

        // Already on a beat
        let q = quantize::quantize_time(1.0, &beats, 4);
        assert!((q - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_quantize_result_is_non_negative() {
        let beats = vec![0.05, 0.55, 1.05];
        let q = quantize::quantize_time(0.0, &beats, 4);
        assert!(q >= 0.0);
    }

    #[test]
    fn test_quantization_is_idempotent() {
        let beats = regular_beats();
        let notes = vec![note(0.62, 0.35, 60), note(1.23, 0.4, 64), note(1.81, 0.2, 67)];

        let once = quantize::quantize_notes(&notes, &beats, 4);
        let twice = quantize::quantize_notes(&once, &beats, 4);

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a.start - b.start).abs() < 1e-4, "{:?} vs {:?}", a, b);
            assert!((a.duration - b.duration).abs() < 1e-4, "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_collapsed_duration_clamps_to_one_grid_unit() {
        let beats = regular_beats();
        // Both endpoints round to the same grid position
        let notes = vec![note(0.51, 0.02, 60)];

        let quantized = quantize::quantize_notes(&notes, &beats, 4);
        assert_eq!(quantized.len(), 1);
        assert!((quantized[0].start - 0.5).abs() < 1e-4);
        assert!((quantized[0].duration - 0.125).abs() < 1e-4);
    }

    #[test]
    fn test_quantized_output_is_sorted() {
        let beats = regular_beats();
        let notes = vec![note(1.81, 0.2, 67), note(0.62, 0.35, 60)];

        let quantized = quantize::quantize_notes(&notes, &beats, 4);
        assert!(quantized[0].start <= quantized[1].start);
    }

    #[test]
    fn test_metadata_preserved_through_quantization() {
        let beats = regular_beats();
        let notes = vec![note(0.62, 0.35, 60)];

        let quantized = quantize::quantize_notes(&notes, &beats, 4);
        assert_eq!(quantized[0].pitch, 60);
        assert_eq!(quantized[0].velocity, 80);
        assert!((quantized[0].confidence - 0.8).abs() < 1e-6);
    }
}
