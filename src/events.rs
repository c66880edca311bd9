//! Symbolic event types produced by the pipeline

use serde::{Deserialize, Serialize};

/// Pitch-class names, C = 0
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One detected note.
///
/// Events are never mutated in place: corrections (overlap trimming,
/// quantization) produce replacement events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Onset time in seconds
    pub start: f32,
    /// Duration in seconds (always positive once assembled)
    pub duration: f32,
    /// MIDI note number (0-127)
    pub pitch: u8,
    /// MIDI velocity (0-127)
    pub velocity: u8,
    /// Detection confidence (0-1)
    pub confidence: f32,
}

impl NoteEvent {
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    /// Note name with octave, e.g. "A4" for MIDI 69
    pub fn name(&self) -> String {
        let class = (self.pitch % 12) as usize;
        let octave = self.pitch as i32 / 12 - 1;
        format!("{}{}", NOTE_NAMES[class], octave)
    }
}

/// Chord quality relative to the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordType {
    Major,
    Minor,
    Diminished,
    Augmented,
    Major7,
    Minor7,
    Dominant7,
}

impl ChordType {
    /// All chord qualities, in template order
    pub const ALL: [ChordType; 7] = [
        ChordType::Major,
        ChordType::Minor,
        ChordType::Diminished,
        ChordType::Augmented,
        ChordType::Major7,
        ChordType::Minor7,
        ChordType::Dominant7,
    ];

    /// Semitone intervals of the chord tones above the root
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ChordType::Major => &[0, 4, 7],
            ChordType::Minor => &[0, 3, 7],
            ChordType::Diminished => &[0, 3, 6],
            ChordType::Augmented => &[0, 4, 8],
            ChordType::Major7 => &[0, 4, 7, 11],
            ChordType::Minor7 => &[0, 3, 7, 10],
            ChordType::Dominant7 => &[0, 4, 7, 10],
        }
    }

    /// Suffix used in chord labels ("" for major, "m7" for minor seventh, ...)
    pub fn suffix(&self) -> &'static str {
        match self {
            ChordType::Major => "",
            ChordType::Minor => "m",
            ChordType::Diminished => "dim",
            ChordType::Augmented => "aug",
            ChordType::Major7 => "maj7",
            ChordType::Minor7 => "m7",
            ChordType::Dominant7 => "7",
        }
    }
}

/// One span of a detected chord
///
/// Segments are contiguous per detection run, non-overlapping, and ordered by
/// start time. Spans where no chord cleared the threshold produce no segment,
/// so gaps in time coverage are expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSegment {
    pub start: f32,
    pub duration: f32,
    /// Root pitch class (0-11, C = 0)
    pub root_pitch_class: u8,
    pub chord_type: ChordType,
    /// Cosine similarity of the winning template match (0-1)
    pub confidence: f32,
}

impl ChordSegment {
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    /// Chord label, e.g. "Am7"
    pub fn name(&self) -> String {
        format!(
            "{}{}",
            NOTE_NAMES[(self.root_pitch_class % 12) as usize],
            self.chord_type.suffix()
        )
    }
}

/// Major or minor mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

/// Global key estimate for a clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimate {
    /// Tonic pitch class (0-11, C = 0)
    pub tonic_pitch_class: u8,
    pub mode: Mode,
    /// Pearson correlation of the winning profile match
    pub correlation: f32,
    /// Fraction of local time windows agreeing with the global estimate (0-1)
    pub consistency: f32,
}

impl KeyEstimate {
    /// Key label, e.g. "A minor"
    pub fn name(&self) -> String {
        let mode = match self.mode {
            Mode::Major => "major",
            Mode::Minor => "minor",
        };
        format!("{} {}", NOTE_NAMES[(self.tonic_pitch_class % 12) as usize], mode)
    }
}

/// Time signature as (numerator, denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }
}

/// Final transcription record handed to the output writers.
///
/// Immutable after assembly. Writers must accept empty note and chord
/// sequences without error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    /// Notes ordered by start time. In polyphonic mode these may overlap
    /// across distinct pitches.
    pub notes: Vec<NoteEvent>,
    /// Set when the polyphonic tracker produced the notes
    pub polyphonic: bool,
    /// Chord progression ordered by start time (gaps allowed)
    pub chords: Vec<ChordSegment>,
    /// Global key, absent when chroma analysis was degenerate
    pub key: Option<KeyEstimate>,
    /// Fraction of chords diatonic to the detected key
    pub tonal_stability: Option<f32>,
    /// Estimated tempo, absent when beat tracking was degenerate
    pub tempo_bpm: Option<f32>,
    pub time_signature: Option<TimeSignature>,
}

impl Transcription {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.chords.is_empty()
    }
}
