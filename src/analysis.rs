//! Analysis export: the transcription and a summary as JSON

use crate::audio::AudioState;
use crate::error::{Result as TranscribeResult, TranscribeError};
use crate::events::Transcription;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Top-level JSON report written next to the MIDI file
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub summary: Summary,
    pub transcription: &'a Transcription,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub duration_sec: f32,
    pub sample_rate: u32,
    pub mode: String,
    pub note_count: usize,
    pub chord_count: usize,
    pub key: Option<String>,
    pub tempo_bpm: Option<f32>,
}

/// Build the report from the pipeline state. Requires assembly to have run.
pub fn build_report(state: &AudioState) -> TranscribeResult<AnalysisReport<'_>> {
    let transcription = state.transcription.as_ref().ok_or_else(|| {
        TranscribeError::ProcessingPipelineError(
            "Assembler must run before analysis export".to_string(),
        )
    })?;

    Ok(AnalysisReport {
        summary: Summary {
            duration_sec: state.duration_sec(),
            sample_rate: state.sr,
            mode: if transcription.polyphonic {
                "polyphonic".to_string()
            } else {
                "monophonic".to_string()
            },
            note_count: transcription.notes.len(),
            chord_count: transcription.chords.len(),
            key: transcription.key.as_ref().map(|k| k.name()),
            tempo_bpm: transcription.tempo_bpm,
        },
        transcription,
    })
}

/// Write the analysis report as pretty-printed JSON
pub fn export_analysis(state: &AudioState, path: &Path) -> TranscribeResult<()> {
    let report = build_report(state)?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| TranscribeError::AnalysisExportError(e.to_string()))?;

    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;

    log::info!("Exported analysis to {}", path.display());
    Ok(())
}
