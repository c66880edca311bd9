//! Configuration system for the transcription pipeline

use crate::error::{Result as TranscribeResult, TranscribeError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which note tracker drives the transcription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionMode {
    Monophonic,
    Polyphonic,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub mode: TranscriptionMode,
    pub stft: StftConfig,
    pub tracker: TrackerConfig,
    pub polyphony: PolyphonyConfig,
    pub quantize: QuantizeConfig,
    pub harmony: HarmonyConfig,
    pub live: LiveConfig,
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            mode: TranscriptionMode::Monophonic,
            stft: StftConfig::default(),
            tracker: TrackerConfig::default(),
            polyphony: PolyphonyConfig::default(),
            quantize: QuantizeConfig::default(),
            harmony: HarmonyConfig::default(),
            live: LiveConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// STFT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StftConfig {
    pub n_fft: usize,
    pub hop_length: usize,
    pub window: String,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            window: "hann".to_string(),
        }
    }
}

/// Monophonic note tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum normalized spectral magnitude for a voiced frame
    pub magnitude_threshold: f32,
    /// Frames below this RMS level count as silence
    pub silence_rms_threshold: f32,
    /// Notes shorter than this are discarded (seconds)
    pub min_note_duration_sec: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            magnitude_threshold: 0.1,
            silence_rms_threshold: 0.02,
            min_note_duration_sec: 0.05,
        }
    }
}

/// Polyphonic note tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolyphonyConfig {
    /// Maximum number of simultaneous notes kept per frame
    pub max_polyphony: usize,
    /// Relative peak height threshold on the frame-normalized salience
    pub salience_threshold: f32,
    /// Number of harmonics summed per candidate fundamental
    pub num_harmonics: usize,
    /// Candidates whose fundamental bin is below this fraction of the frame
    /// peak score zero (suppresses spurious subharmonics)
    pub fundamental_gate: f32,
    /// Lowest MIDI pitch candidate (piano range)
    pub min_midi_pitch: u8,
    /// Highest MIDI pitch candidate (piano range)
    pub max_midi_pitch: u8,
}

impl Default for PolyphonyConfig {
    fn default() -> Self {
        Self {
            max_polyphony: 6,
            salience_threshold: 0.3,
            num_harmonics: 5,
            fundamental_gate: 0.1,
            min_midi_pitch: 21,
            max_midi_pitch: 108,
        }
    }
}

/// Rhythm quantization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizeConfig {
    pub enabled: bool,
    /// Subdivisions per beat (4 = sixteenth-note grid)
    pub subdivisions: usize,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            subdivisions: 4,
        }
    }
}

/// Key and chord detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonyConfig {
    /// Duration of each chord detection segment (seconds)
    pub chord_segment_seconds: f32,
    /// Minimum cosine similarity for a chord to be accepted
    pub chord_threshold: f32,
    /// Window length for the key-consistency sweep (seconds)
    pub key_window_seconds: f32,
}

impl Default for HarmonyConfig {
    fn default() -> Self {
        Self {
            chord_segment_seconds: 0.5,
            chord_threshold: 0.6,
            key_window_seconds: 5.0,
        }
    }
}

/// Live session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Rolling analysis window length (seconds)
    pub buffer_seconds: f32,
    /// Interval between window re-analyses (milliseconds)
    pub process_interval_ms: u64,
    /// Bounded capacity of the results queue
    pub queue_capacity: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            buffer_seconds: 2.0,
            process_interval_ms: 100,
            queue_capacity: 256,
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// MIDI pulses per quarter note
    pub ppq: u16,
    /// MIDI program for the note track (0 = Acoustic Grand Piano)
    pub program: u8,
    /// Write detected chords as a second block-chord track
    pub chord_track: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ppq: 960,
            program: 0,
            chord_track: true,
        }
    }
}

/// Load configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> TranscribeResult<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_json::from_str(&contents)
        .map_err(|e| TranscribeError::ConfigValidationFailed(format!("Parse error: {}", e)))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration parameter ranges
pub fn validate_config(config: &Config) -> TranscribeResult<()> {
    if config.stft.n_fft == 0 || !config.stft.n_fft.is_power_of_two() {
        return Err(TranscribeError::ConfigValidationFailed(format!(
            "n_fft must be a power of two, got {}",
            config.stft.n_fft
        )));
    }
    if config.stft.hop_length == 0 || config.stft.hop_length > config.stft.n_fft {
        return Err(TranscribeError::ConfigValidationFailed(format!(
            "hop_length must be in 1..=n_fft, got {}",
            config.stft.hop_length
        )));
    }
    if config.tracker.magnitude_threshold <= 0.0 {
        return Err(TranscribeError::ConfigValidationFailed(
            "magnitude_threshold must be positive".to_string(),
        ));
    }
    if config.tracker.min_note_duration_sec < 0.0 {
        return Err(TranscribeError::ConfigValidationFailed(
            "min_note_duration_sec must be non-negative".to_string(),
        ));
    }
    if config.polyphony.max_polyphony == 0 {
        return Err(TranscribeError::ConfigValidationFailed(
            "max_polyphony must be at least 1".to_string(),
        ));
    }
    if config.polyphony.num_harmonics == 0 {
        return Err(TranscribeError::ConfigValidationFailed(
            "num_harmonics must be at least 1".to_string(),
        ));
    }
    if config.polyphony.min_midi_pitch > config.polyphony.max_midi_pitch {
        return Err(TranscribeError::ConfigValidationFailed(format!(
            "invalid MIDI pitch range {}..={}",
            config.polyphony.min_midi_pitch, config.polyphony.max_midi_pitch
        )));
    }
    if config.quantize.subdivisions == 0 {
        return Err(TranscribeError::ConfigValidationFailed(
            "quantize subdivisions must be at least 1".to_string(),
        ));
    }
    if config.harmony.chord_segment_seconds <= 0.0 {
        return Err(TranscribeError::ConfigValidationFailed(
            "chord_segment_seconds must be positive".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.harmony.chord_threshold) {
        return Err(TranscribeError::ConfigValidationFailed(format!(
            "chord_threshold must be in 0..=1, got {}",
            config.harmony.chord_threshold
        )));
    }
    if config.live.buffer_seconds <= 0.0 || config.live.process_interval_ms == 0 {
        return Err(TranscribeError::ConfigValidationFailed(
            "live buffer and process interval must be positive".to_string(),
        ));
    }
    Ok(())
}
