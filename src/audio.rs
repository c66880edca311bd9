//! Audio I/O and pipeline state

use crate::config::Config;
use crate::error::{Result as TranscribeResult, TranscribeError};
use crate::events::{ChordSegment, KeyEstimate, NoteEvent, TimeSignature, Transcription};
use crate::frontend::Frame;
use hound::WavReader;
use ndarray::Array2;
use std::path::Path;

/// Audio state threaded through the pipeline stages.
///
/// Each stage fully consumes the prior stage's output before starting; there
/// is no streaming fusion between stages.
#[derive(Debug, Clone)]
pub struct AudioState {
    /// Audio samples (mono, normalized to [-1, 1])
    pub y: Vec<f32>,
    /// Sample rate in Hz
    pub sr: u32,
    /// Configuration reference
    pub config: Config,

    // Front end outputs
    /// Per-frame analysis slices (pitch candidates, RMS, chroma)
    pub frames: Vec<Frame>,
    /// Magnitude spectrogram (bins x frames)
    pub magnitude: Option<Array2<f32>>,
    /// Frequency of each spectrogram bin in Hz
    pub freqs: Vec<f32>,
    /// Time of each frame in seconds
    pub times: Vec<f32>,
    /// Onset strength envelope per frame
    pub onset_env: Vec<f32>,
    /// Estimated tempo, None when beat tracking was degenerate
    pub tempo_bpm: Option<f32>,
    /// Beat timestamps, strictly increasing
    pub beat_times: Vec<f32>,

    // Tracker / quantizer outputs
    /// Detected notes (mono: non-overlapping; poly: may overlap)
    pub notes: Vec<NoteEvent>,
    /// Set when the polyphonic tracker produced `notes`
    pub polyphonic: bool,

    // Harmony analyzer outputs
    pub key: Option<KeyEstimate>,
    pub chords: Vec<ChordSegment>,
    pub tonal_stability: Option<f32>,
    pub time_signature: Option<TimeSignature>,

    // Assembler output
    pub transcription: Option<Transcription>,
}

impl AudioState {
    /// Load audio file and create initial state
    pub fn load<P: AsRef<Path>>(path: P, config: &Config) -> TranscribeResult<Self> {
        let (y, sr) = load_audio_file(path)?;
        Ok(Self::from_samples(y, sr, config))
    }

    /// Create state directly from samples (tests, live windows)
    pub fn from_samples(samples: Vec<f32>, sr: u32, config: &Config) -> Self {
        AudioState {
            y: samples,
            sr,
            config: config.clone(),
            frames: Vec::new(),
            magnitude: None,
            freqs: Vec::new(),
            times: Vec::new(),
            onset_env: Vec::new(),
            tempo_bpm: None,
            beat_times: Vec::new(),
            notes: Vec::new(),
            polyphonic: false,
            key: None,
            chords: Vec::new(),
            tonal_stability: None,
            time_signature: None,
            transcription: None,
        }
    }

    /// Get audio duration in seconds
    pub fn duration_sec(&self) -> f32 {
        self.y.len() as f32 / self.sr as f32
    }

    /// Get number of samples
    pub fn n_samples(&self) -> usize {
        self.y.len()
    }
}

/// Load a WAV file and return mono samples with the sample rate
pub fn load_audio_file<P: AsRef<Path>>(path: P) -> TranscribeResult<(Vec<f32>, u32)> {
    let path = path.as_ref();

    let mut reader = WavReader::open(path)
        .map_err(|e| TranscribeError::AudioFileError(format!("{}: {}", path.display(), e)))?;
    let spec = reader.spec();

    if spec.sample_rate < 8000 {
        return Err(TranscribeError::UnsupportedSampleRate(spec.sample_rate));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| TranscribeError::InvalidAudioFormat(e.to_string()))?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| TranscribeError::InvalidAudioFormat(e.to_string()))?
        }
    };

    // Downmix interleaved channels to mono
    let channels = spec.channels as usize;
    let mono: Vec<f32> = if channels > 1 {
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    if mono.is_empty() {
        return Err(TranscribeError::EmptyWaveform);
    }

    Ok((mono, spec.sample_rate))
}

/// Check that an input file exists and looks like readable audio
pub fn validate_audio_file<P: AsRef<Path>>(path: P) -> TranscribeResult<()> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TranscribeError::InputValidationError(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    if extension != "wav" {
        return Err(TranscribeError::InvalidAudioFormat(format!(
            "Unsupported extension '{}', expected wav",
            extension
        )));
    }

    WavReader::open(path)
        .map(|_| ())
        .map_err(|e| TranscribeError::InvalidAudioFormat(e.to_string()))
}
