//! Note & Harmony Extraction Engine
//!
//! A deterministic, non-ML audio analysis system that transcribes pitched
//! audio into MIDI notes with key, chord, and rhythm context.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod frontend;
pub mod live;
pub mod midi;
pub mod spectral;
pub mod stages;

pub use audio::AudioState;
pub use config::{Config, TranscriptionMode};
pub use error::{Result as TranscribeResult, TranscribeError};
pub use events::Transcription;
pub use live::{LiveSession, LiveUpdate};

use std::path::Path;

/// Main processing pipeline for audio-to-MIDI transcription
pub struct Transcriber {
    config: Config,
}

impl Transcriber {
    /// Create a new transcriber with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Process an audio file and write MIDI and analysis output
    pub fn process<P: AsRef<Path>>(&self, input_path: P, output_dir: P) -> TranscribeResult<()> {
        let mut state = AudioState::load(input_path, &self.config)?;

        self.run_pipeline(&mut state)?;
        self.export_results(&state, output_dir)?;

        Ok(())
    }

    /// Run the pipeline on an already-loaded state and return the
    /// transcription without touching the filesystem
    pub fn transcribe(&self, mut state: AudioState) -> TranscribeResult<Transcription> {
        self.run_pipeline(&mut state)?;
        state.transcription.ok_or_else(|| {
            TranscribeError::ProcessingPipelineError("Assembler produced no output".to_string())
        })
    }

    /// Execute the complete stage pipeline
    fn run_pipeline(&self, state: &mut AudioState) -> TranscribeResult<()> {
        // Stage 1: Signal front end (STFT, pitch candidates, chroma, beats)
        frontend::run(state, &self.config)?;

        // Stage 2: Note tracking
        match self.config.mode {
            TranscriptionMode::Monophonic => stages::mono::run(state, &self.config)?,
            TranscriptionMode::Polyphonic => stages::poly::run(state, &self.config)?,
        }

        // Stage 3: Rhythm quantization
        stages::quantize::run(state, &self.config)?;

        // Stage 4: Harmony analysis (key, chords, tonal stability)
        stages::harmony::run(state, &self.config)?;

        // Stage 5: Event assembly
        stages::assemble::run(state, &self.config)?;

        Ok(())
    }

    /// Export MIDI and the analysis report
    fn export_results<P: AsRef<Path>>(
        &self,
        state: &AudioState,
        output_dir: P,
    ) -> TranscribeResult<()> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;

        let transcription = state.transcription.as_ref().ok_or_else(|| {
            TranscribeError::ProcessingPipelineError("Pipeline did not run to completion".to_string())
        })?;

        midi::export_midi(transcription, &output_dir.join("transcription.mid"), &self.config)?;
        analysis::export_analysis(state, &output_dir.join("analysis.json"))?;
        Ok(())
    }
}

/// Validate configuration and input files
pub fn validate_input<P: AsRef<Path>>(input_path: P, config: &Config) -> TranscribeResult<()> {
    audio::validate_audio_file(input_path)?;
    config::validate_config(config)?;
    Ok(())
}
