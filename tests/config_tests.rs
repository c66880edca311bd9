//! Validation tests for configuration loading and validation

use pitch2midi::config::{validate_config, Config, TranscriptionMode};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.mode, TranscriptionMode::Monophonic);
        assert_eq!(config.stft.n_fft, 2048);
        assert_eq!(config.stft.hop_length, 512);
        assert!((config.tracker.magnitude_threshold - 0.1).abs() < 1e-6);
        assert!((config.tracker.silence_rms_threshold - 0.02).abs() < 1e-6);
        assert!((config.tracker.min_note_duration_sec - 0.05).abs() < 1e-6);
        assert_eq!(config.polyphony.max_polyphony, 6);
        assert!((config.polyphony.salience_threshold - 0.3).abs() < 1e-6);
        assert_eq!(config.polyphony.num_harmonics, 5);
        assert_eq!(config.quantize.subdivisions, 4);
        assert!((config.harmony.chord_threshold - 0.6).abs() < 1e-6);
        assert!((config.harmony.chord_segment_seconds - 0.5).abs() < 1e-6);
        assert!((config.harmony.key_window_seconds - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"mode": "polyphonic", "stft": {"n_fft": 4096}}"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.mode, TranscriptionMode::Polyphonic);
        assert_eq!(config.stft.n_fft, 4096);
        // Untouched fields keep their defaults
        assert_eq!(config.stft.hop_length, 512);
        assert_eq!(config.quantize.subdivisions, 4);
    }

    #[test]
    fn test_rejects_non_power_of_two_fft() {
        let mut config = Config::default();
        config.stft.n_fft = 1000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_hop_longer_than_fft() {
        let mut config = Config::default();
        config.stft.hop_length = 4096;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_polyphony() {
        let mut config = Config::default();
        config.polyphony.max_polyphony = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_inverted_pitch_range() {
        let mut config = Config::default();
        config.polyphony.min_midi_pitch = 100;
        config.polyphony.max_midi_pitch = 50;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_chord_threshold() {
        let mut config = Config::default();
        config.harmony.chord_threshold = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_subdivisions() {
        let mut config = Config::default();
        config.quantize.subdivisions = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.stft.n_fft, config.stft.n_fft);
        assert_eq!(parsed.mode, config.mode);
    }
}
