//! Error types for the transcription pipeline

use std::fmt;

/// Custom error type for audio-to-MIDI transcription.
///
/// Fatal input errors (E001-E005) abort the pipeline with no partial
/// transcription. Degenerate-analysis conditions (fewer than 2 beats, empty
/// chroma) are *not* errors: the affected stage skips itself and the
/// corresponding output field stays empty.
#[derive(Debug, Clone)]
pub enum TranscribeError {
    /// E001: Invalid audio format (e.g., non-PCM WAV)
    InvalidAudioFormat(String),
    /// E002: Unsupported sample rate
    UnsupportedSampleRate(u32),
    /// E003: Empty or zero-length waveform
    EmptyWaveform,
    /// E004: Audio file I/O error
    AudioFileError(String),
    /// E005: Input validation error
    InputValidationError(String),
    /// E006: Configuration validation failed
    ConfigValidationFailed(String),
    /// E007: STFT processing error
    StftProcessingError(String),
    /// E008: Processing pipeline error
    ProcessingPipelineError(String),
    /// E009: MIDI export error
    MidiExportError(String),
    /// E010: Analysis export error
    AnalysisExportError(String),
}

impl fmt::Display for TranscribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscribeError::InvalidAudioFormat(msg) => {
                write!(f, "E001: Invalid audio format - {}", msg)
            }
            TranscribeError::UnsupportedSampleRate(sr) => {
                write!(f, "E002: Unsupported sample rate {} Hz", sr)
            }
            TranscribeError::EmptyWaveform => {
                write!(f, "E003: Empty or zero-length waveform")
            }
            TranscribeError::AudioFileError(msg) => {
                write!(f, "E004: Audio file I/O error - {}", msg)
            }
            TranscribeError::InputValidationError(msg) => {
                write!(f, "E005: Input validation error - {}", msg)
            }
            TranscribeError::ConfigValidationFailed(msg) => {
                write!(f, "E006: Configuration validation failed - {}", msg)
            }
            TranscribeError::StftProcessingError(msg) => {
                write!(f, "E007: STFT processing error - {}", msg)
            }
            TranscribeError::ProcessingPipelineError(msg) => {
                write!(f, "E008: Processing pipeline error - {}", msg)
            }
            TranscribeError::MidiExportError(msg) => {
                write!(f, "E009: MIDI export error - {}", msg)
            }
            TranscribeError::AnalysisExportError(msg) => {
                write!(f, "E010: Analysis export error - {}", msg)
            }
        }
    }
}

impl std::error::Error for TranscribeError {}

impl From<std::io::Error> for TranscribeError {
    fn from(err: std::io::Error) -> Self {
        TranscribeError::AudioFileError(format!("File I/O error: {}", err))
    }
}

impl From<serde_json::Error> for TranscribeError {
    fn from(err: serde_json::Error) -> Self {
        TranscribeError::AnalysisExportError(format!("JSON serialization error: {}", err))
    }
}

impl From<anyhow::Error> for TranscribeError {
    fn from(err: anyhow::Error) -> Self {
        TranscribeError::ProcessingPipelineError(format!("Generic error: {}", err))
    }
}

/// Result type alias for transcription operations
pub type Result<T> = std::result::Result<T, TranscribeError>;
