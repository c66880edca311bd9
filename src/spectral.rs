//! Spectral processing utilities (STFT, windowing, peak interpolation)

use ndarray::Array2;
use rustfft::{num_complex::Complex32, FftPlanner};

/// STFT data structure
#[derive(Debug, Clone)]
pub struct StftData {
    pub s: Array2<Complex32>,
    pub freqs: Vec<f32>,
    pub times: Vec<f32>,
}

/// Compute a centered STFT of an audio signal.
///
/// The signal is zero-padded by `n_fft / 2` on both sides so frame `i` is
/// centered on sample `i * hop_length` and frame times line up with the raw
/// sample clock. Magnitudes are scaled by `2 / window_sum`, so a full-scale
/// sine of amplitude A peaks near A in the magnitude spectrogram.
pub fn stft(y: &[f32], n_fft: usize, hop_length: usize, window: &str, sample_rate: u32) -> StftData {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);

    let n_frames = y.len() / hop_length + 1;
    let mut s = Array2::<Complex32>::zeros((n_fft / 2 + 1, n_frames));

    let window_fn = generate_window(window, n_fft);
    let window_sum: f32 = window_fn.iter().sum();
    let scale = 2.0 / window_sum;

    let half = n_fft as i64 / 2;
    let mut frame = vec![Complex32::new(0.0, 0.0); n_fft];

    for frame_idx in 0..n_frames {
        let center = (frame_idx * hop_length) as i64;

        for (i, slot) in frame.iter_mut().enumerate() {
            let src = center - half + i as i64;
            let sample = if src >= 0 && (src as usize) < y.len() {
                y[src as usize]
            } else {
                0.0
            };
            *slot = Complex32::new(sample * window_fn[i], 0.0);
        }

        fft.process(&mut frame);

        for (i, &val) in frame[..n_fft / 2 + 1].iter().enumerate() {
            s[[i, frame_idx]] = val * scale;
        }
    }

    let freqs: Vec<f32> = (0..n_fft / 2 + 1)
        .map(|i| i as f32 * sample_rate as f32 / n_fft as f32)
        .collect();

    let times: Vec<f32> = (0..n_frames)
        .map(|i| i as f32 * hop_length as f32 / sample_rate as f32)
        .collect();

    StftData { s, freqs, times }
}

/// Generate window function
fn generate_window(window_type: &str, size: usize) -> Vec<f32> {
    match window_type {
        "hann" => (0..size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
            })
            .collect(),
        _ => vec![1.0; size], // Rectangular window as fallback
    }
}

/// Compute magnitude spectrogram
pub fn magnitude_spectrogram(stft_data: &StftData) -> Array2<f32> {
    stft_data.s.map(|c| c.norm())
}

/// Refine a spectral peak position by parabolic interpolation over the
/// log-magnitudes of the peak bin and its neighbors. Returns the interpolated
/// fractional bin index.
pub fn interpolate_peak_bin(mag_frame: &[f32], peak_bin: usize) -> f32 {
    if peak_bin == 0 || peak_bin + 1 >= mag_frame.len() {
        return peak_bin as f32;
    }

    let y1 = mag_frame[peak_bin - 1].max(1e-10).ln();
    let y2 = mag_frame[peak_bin].max(1e-10).ln();
    let y3 = mag_frame[peak_bin + 1].max(1e-10).ln();

    let denominator = 2.0 * y2 - y1 - y3;
    if denominator.abs() < 1e-6 {
        return peak_bin as f32;
    }

    let shift = (y3 - y1) / (2.0 * denominator);
    if shift.is_finite() {
        peak_bin as f32 + shift.clamp(-0.5, 0.5)
    } else {
        peak_bin as f32
    }
}

/// Convert a frequency in Hz to a fractional MIDI note number
pub fn hz_to_midi(freq: f32) -> f32 {
    69.0 + 12.0 * (freq / 440.0).log2()
}

/// Convert a MIDI note number to a frequency in Hz
pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * 2.0f32.powf((midi - 69.0) / 12.0)
}

/// Per-frame RMS energy over `frame_length`-sample windows centered on each
/// hop position
pub fn frame_rms(y: &[f32], n_frames: usize, hop_length: usize, frame_length: usize) -> Vec<f32> {
    let half = frame_length as i64 / 2;
    (0..n_frames)
        .map(|frame_idx| {
            let center = (frame_idx * hop_length) as i64;
            let start = (center - half).max(0) as usize;
            let end = ((center + half) as usize).min(y.len());
            if end <= start {
                return 0.0;
            }
            let sum_sq: f32 = y[start..end].iter().map(|&s| s * s).sum();
            (sum_sq / (end - start) as f32).sqrt()
        })
        .collect()
}
