//! Harmony analyzer: key detection, chord progression, tonal stability
//!
//! Key detection correlates the tonic-rotated mean chroma against the
//! Krumhansl-Schmuckler probe-tone profiles. Chords are matched by cosine
//! similarity against binary pitch-class templates on fixed time segments,
//! then adjacent identical detections merge into one segment.

use crate::audio::AudioState;
use crate::config::{Config, HarmonyConfig};
use crate::error::Result as TranscribeResult;
use crate::events::{ChordSegment, ChordType, KeyEstimate, Mode, TimeSignature};

/// Krumhansl-Schmuckler major key profile (probe-tone ratings)
pub const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Schmuckler minor key profile
pub const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Semitone offsets of the diatonic scale degrees
const DIATONIC_OFFSETS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Pearson correlation coefficient between two equal-length vectors
pub fn pearson(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len() as f32;
    let mean_a = a.iter().sum::<f32>() / n;
    let mean_b = b.iter().sum::<f32>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a) * (x - mean_a);
        var_b += (y - mean_b) * (y - mean_b);
    }

    let denom = (var_a * var_b).sqrt();
    if denom <= f32::EPSILON {
        0.0
    } else {
        cov / denom
    }
}

/// Rotate a chroma vector so the candidate tonic lands on index 0
fn rotate_to_tonic(chroma: &[f32; 12], tonic: usize) -> [f32; 12] {
    let mut rotated = [0.0f32; 12];
    for (i, slot) in rotated.iter_mut().enumerate() {
        *slot = chroma[(tonic + i) % 12];
    }
    rotated
}

/// Best (tonic, mode, correlation) over all 24 keys for one chroma vector
pub fn detect_key(mean_chroma: &[f32; 12]) -> (u8, Mode, f32) {
    let mut best = (0u8, Mode::Major, f32::MIN);

    for tonic in 0..12 {
        let rotated = rotate_to_tonic(mean_chroma, tonic);

        let major = pearson(&rotated, &MAJOR_PROFILE);
        if major > best.2 {
            best = (tonic as u8, Mode::Major, major);
        }

        let minor = pearson(&rotated, &MINOR_PROFILE);
        if minor > best.2 {
            best = (tonic as u8, Mode::Minor, minor);
        }
    }

    best
}

/// Mean chroma over a slice of frames
fn mean_chroma(frames: &[[f32; 12]]) -> [f32; 12] {
    let mut mean = [0.0f32; 12];
    if frames.is_empty() {
        return mean;
    }
    for chroma in frames {
        for (slot, &v) in mean.iter_mut().zip(chroma.iter()) {
            *slot += v;
        }
    }
    for slot in mean.iter_mut() {
        *slot /= frames.len() as f32;
    }
    mean
}

/// Fraction of overlapping windows (50% hop) whose best key agrees with the
/// global estimate. With fewer frames than one window the estimate is taken
/// as fully consistent.
pub fn key_consistency(
    chroma_frames: &[[f32; 12]],
    window_frames: usize,
    global: (u8, Mode),
) -> f32 {
    if window_frames == 0 || chroma_frames.len() <= window_frames {
        return 1.0;
    }

    let stride = (window_frames / 2).max(1);
    let mut total = 0usize;
    let mut agreeing = 0usize;

    let mut start = 0;
    while start + window_frames <= chroma_frames.len() {
        let window = mean_chroma(&chroma_frames[start..start + window_frames]);
        let (tonic, mode, _) = detect_key(&window);
        total += 1;
        if (tonic, mode) == global {
            agreeing += 1;
        }
        start += stride;
    }

    if total == 0 {
        1.0
    } else {
        agreeing as f32 / total as f32
    }
}

/// Full key estimation: global best match plus windowed consistency
pub fn estimate_key(chroma_frames: &[[f32; 12]], window_frames: usize) -> Option<KeyEstimate> {
    if chroma_frames.is_empty() {
        return None;
    }

    let global = mean_chroma(chroma_frames);
    if global.iter().all(|&v| v <= 0.0) {
        return None;
    }

    let (tonic, mode, correlation) = detect_key(&global);
    let consistency = key_consistency(chroma_frames, window_frames, (tonic, mode));

    Some(KeyEstimate {
        tonic_pitch_class: tonic,
        mode,
        correlation,
        consistency,
    })
}

/// Binary pitch-class template for a chord type
fn chord_template(chord_type: ChordType) -> [f32; 12] {
    let mut template = [0.0f32; 12];
    for &interval in chord_type.intervals() {
        template[interval as usize] = 1.0;
    }
    template
}

fn cosine_similarity(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Best chord match for one chroma vector, or None when nothing clears the
/// threshold (the documented "unlabeled" outcome, not an error)
pub fn detect_chord(chroma: &[f32; 12], threshold: f32) -> Option<(u8, ChordType, f32)> {
    let sum: f32 = chroma.iter().sum();
    if sum <= 0.0 {
        return None;
    }
    let mut normalized = *chroma;
    for v in normalized.iter_mut() {
        *v /= sum;
    }

    let mut best: Option<(u8, ChordType, f32)> = None;
    for root in 0..12 {
        let rotated = rotate_to_tonic(&normalized, root);
        for chord_type in ChordType::ALL {
            let similarity = cosine_similarity(&rotated, &chord_template(chord_type));
            if best.map_or(true, |(_, _, s)| similarity > s) {
                best = Some((root as u8, chord_type, similarity));
            }
        }
    }

    best.filter(|&(_, _, similarity)| similarity >= threshold)
}

/// Run chord detection on fixed time segments and merge adjacent identical
/// detections. Unlabeled spans produce no segment, so the sequence may have
/// gaps.
pub fn detect_chord_progression(
    chroma_frames: &[[f32; 12]],
    times: &[f32],
    frame_rate: f32,
    config: &HarmonyConfig,
) -> Vec<ChordSegment> {
    let segment_frames = ((config.chord_segment_seconds * frame_rate) as usize).max(1);
    let mut raw: Vec<ChordSegment> = Vec::new();

    let mut start = 0;
    while start < chroma_frames.len() {
        let end = (start + segment_frames).min(chroma_frames.len());
        let chroma = mean_chroma(&chroma_frames[start..end]);

        if let Some((root, chord_type, confidence)) =
            detect_chord(&chroma, config.chord_threshold)
        {
            let seg_start = times[start];
            let seg_end = if end < times.len() {
                times[end]
            } else {
                times[times.len() - 1]
            };
            if seg_end > seg_start {
                raw.push(ChordSegment {
                    start: seg_start,
                    duration: seg_end - seg_start,
                    root_pitch_class: root,
                    chord_type,
                    confidence,
                });
            }
        }

        start = end;
    }

    merge_segments(raw)
}

/// Merge runs of time-adjacent segments with identical (root, type). The
/// merged segment keeps the first sub-segment's confidence and spans the
/// whole run. A gap (unlabeled span) breaks the run.
pub fn merge_segments(segments: Vec<ChordSegment>) -> Vec<ChordSegment> {
    let mut merged: Vec<ChordSegment> = Vec::with_capacity(segments.len());

    for segment in segments {
        match merged.last_mut() {
            Some(prev)
                if prev.root_pitch_class == segment.root_pitch_class
                    && prev.chord_type == segment.chord_type
                    && (segment.start - prev.end()).abs() < 1e-3 =>
            {
                prev.duration = segment.end() - prev.start;
            }
            _ => merged.push(segment),
        }
    }

    merged
}

/// Fraction of chord segments whose root is diatonic to the key. A global
/// quality metric; detection itself is never altered by it.
pub fn tonal_stability(chords: &[ChordSegment], key: &KeyEstimate) -> f32 {
    if chords.is_empty() {
        return 0.0;
    }

    let diatonic = chords
        .iter()
        .filter(|c| {
            let offset = (c.root_pitch_class + 12 - key.tonic_pitch_class) % 12;
            DIATONIC_OFFSETS.contains(&offset)
        })
        .count();

    diatonic as f32 / chords.len() as f32
}

/// Accent contrast of one beat grouping: mean energy of the best-aligned
/// downbeat comb divided by the mean of the remaining beats. Near 1 when the
/// grouping does not match the accent pattern.
fn grouping_contrast(beat_energies: &[f32], beats_per_measure: usize) -> f32 {
    let mut best = 0.0f32;

    for offset in 0..beats_per_measure {
        let comb: Vec<f32> = beat_energies[offset..]
            .iter()
            .copied()
            .step_by(beats_per_measure)
            .collect();
        if comb.is_empty() || comb.len() == beat_energies.len() {
            continue;
        }

        let comb_sum: f32 = comb.iter().sum();
        let comb_mean = comb_sum / comb.len() as f32;
        let rest_sum: f32 = beat_energies.iter().sum::<f32>() - comb_sum;
        let rest_mean = rest_sum / (beat_energies.len() - comb.len()) as f32;

        let contrast = if rest_mean > f32::EPSILON {
            comb_mean / rest_mean
        } else {
            1.0
        };
        best = best.max(contrast);
    }

    best
}

/// Estimate the time signature from beat-aligned onset energy: the beat
/// grouping whose downbeat comb stands out most from the other beats wins,
/// defaulting to 4/4.
pub fn estimate_time_signature(
    beat_times: &[f32],
    onset_env: &[f32],
    frame_rate: f32,
) -> TimeSignature {
    if beat_times.len() < 4 || onset_env.is_empty() {
        return TimeSignature::default();
    }

    let beat_energies: Vec<f32> = beat_times
        .iter()
        .filter_map(|&t| {
            let frame = (t * frame_rate).round() as usize;
            onset_env.get(frame).copied()
        })
        .collect();

    if beat_energies.len() < 4 {
        return TimeSignature::default();
    }

    // Common time wins ties
    let mut best_grouping = 4usize;
    let mut best_contrast = grouping_contrast(&beat_energies, 4);
    for grouping in [3usize, 6] {
        if beat_energies.len() < grouping * 2 {
            continue;
        }
        let contrast = grouping_contrast(&beat_energies, grouping);
        if contrast > best_contrast {
            best_contrast = contrast;
            best_grouping = grouping;
        }
    }

    match best_grouping {
        3 => TimeSignature {
            numerator: 3,
            denominator: 4,
        },
        6 => TimeSignature {
            numerator: 6,
            denominator: 8,
        },
        _ => TimeSignature::default(),
    }
}

pub fn run(state: &mut AudioState, config: &Config) -> TranscribeResult<()> {
    log::info!("Harmony analyzer");

    if state.frames.is_empty() {
        log::warn!("Harmony analyzer: no frames, skipping");
        return Ok(());
    }

    let chroma_frames: Vec<[f32; 12]> = state.frames.iter().map(|f| f.chroma).collect();
    let frame_rate = state.sr as f32 / config.stft.hop_length as f32;

    let window_frames = (config.harmony.key_window_seconds * frame_rate) as usize;
    state.key = estimate_key(&chroma_frames, window_frames);
    if state.key.is_none() {
        log::warn!("Harmony analyzer: degenerate chroma, key omitted");
    }

    state.chords =
        detect_chord_progression(&chroma_frames, &state.times, frame_rate, &config.harmony);

    state.tonal_stability = state
        .key
        .as_ref()
        .filter(|_| !state.chords.is_empty())
        .map(|key| tonal_stability(&state.chords, key));

    state.time_signature = state.tempo_bpm.map(|_| {
        estimate_time_signature(&state.beat_times, &state.onset_env, frame_rate)
    });

    if let Some(key) = &state.key {
        log::info!(
            "Harmony analyzer: key {} (r={:.3}, consistency={:.2}), {} chords",
            key.name(),
            key.correlation,
            key.consistency,
            state.chords.len()
        );
    }

    Ok(())
}
