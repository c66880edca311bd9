//! Live analysis session
//!
//! An explicit session object owning a worker thread. Callers push sample
//! blocks in; the worker keeps a rolling window of recent audio, re-analyzes
//! it at a fixed interval, and publishes updates over a bounded queue. When
//! the queue is full the newest update is dropped rather than blocking the
//! worker.

use crate::audio::AudioState;
use crate::config::{Config, TranscriptionMode};
use crate::error::{Result as TranscribeResult, TranscribeError};
use crate::events::{ChordSegment, NoteEvent};
use crate::frontend;
use crate::stages::{harmony, mono, poly};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// One re-analysis of the rolling window
#[derive(Debug, Clone)]
pub struct LiveUpdate {
    /// Seconds of audio received when the window was analyzed
    pub stream_time: f32,
    /// Notes detected inside the window (window-relative timings)
    pub notes: Vec<NoteEvent>,
    /// Best chord match over the whole window, when one clears the threshold
    pub chord: Option<ChordSegment>,
}

/// A running live session. Stopping is cooperative: the worker observes the
/// stop flag between analysis rounds and exits on its own.
pub struct LiveSession {
    input_tx: Sender<Vec<f32>>,
    updates_rx: Receiver<LiveUpdate>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl LiveSession {
    /// Spawn the analysis worker and return a handle to the session
    pub fn start(sr: u32, config: Config) -> TranscribeResult<Self> {
        if sr < 8000 {
            return Err(TranscribeError::UnsupportedSampleRate(sr));
        }
        crate::config::validate_config(&config)?;

        let (input_tx, input_rx) = unbounded::<Vec<f32>>();
        let (updates_tx, updates_rx) = bounded::<LiveUpdate>(config.live.queue_capacity);
        let stop = Arc::new(AtomicBool::new(false));

        let worker_stop = Arc::clone(&stop);
        let worker = thread::spawn(move || {
            worker_loop(sr, config, input_rx, updates_tx, worker_stop);
        });

        Ok(Self {
            input_tx,
            updates_rx,
            stop,
            worker: Some(worker),
        })
    }

    /// Push a block of mono samples into the rolling buffer
    pub fn push(&self, samples: &[f32]) -> TranscribeResult<()> {
        self.input_tx.send(samples.to_vec()).map_err(|_| {
            TranscribeError::ProcessingPipelineError("Live worker has exited".to_string())
        })
    }

    /// Receiver side of the update queue
    pub fn updates(&self) -> &Receiver<LiveUpdate> {
        &self.updates_rx
    }

    /// Non-blocking poll for the next update
    pub fn try_next(&self) -> Option<LiveUpdate> {
        self.updates_rx.try_recv().ok()
    }

    /// Request the worker to stop and wait for it to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Live worker panicked");
            }
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    sr: u32,
    config: Config,
    input_rx: Receiver<Vec<f32>>,
    updates_tx: Sender<LiveUpdate>,
    stop: Arc<AtomicBool>,
) {
    let capacity = (config.live.buffer_seconds * sr as f32) as usize;
    let interval = Duration::from_millis(config.live.process_interval_ms);
    let mut buffer: VecDeque<f32> = VecDeque::with_capacity(capacity);
    let mut received: u64 = 0;
    let mut last_run = Instant::now();

    while !stop.load(Ordering::Acquire) {
        // Drain pending blocks into the rolling window
        while let Ok(block) = input_rx.try_recv() {
            received += block.len() as u64;
            for sample in block {
                if buffer.len() == capacity {
                    buffer.pop_front();
                }
                buffer.push_back(sample);
            }
        }

        if last_run.elapsed() >= interval && !buffer.is_empty() {
            last_run = Instant::now();
            let window: Vec<f32> = buffer.iter().copied().collect();
            let stream_time = received as f32 / sr as f32;

            match analyze_window(window, sr, &config, stream_time) {
                Ok(update) => {
                    if let Err(TrySendError::Full(_)) = updates_tx.try_send(update) {
                        log::debug!("Live update queue full, dropping update");
                    }
                }
                Err(e) => log::warn!("Live analysis failed: {}", e),
            }
        }

        thread::sleep(Duration::from_millis(5));
    }
}

/// Run the note tracker and a whole-window chord match on one snapshot.
/// Quantization is skipped: beat estimates on a short rolling window are not
/// stable enough to snap against.
fn analyze_window(
    window: Vec<f32>,
    sr: u32,
    config: &Config,
    stream_time: f32,
) -> TranscribeResult<LiveUpdate> {
    let mut state = AudioState::from_samples(window, sr, config);
    frontend::run(&mut state, config)?;

    match config.mode {
        TranscriptionMode::Monophonic => mono::run(&mut state, config)?,
        TranscriptionMode::Polyphonic => poly::run(&mut state, config)?,
    }

    let chord = window_chord(&state, config);

    Ok(LiveUpdate {
        stream_time,
        notes: state.notes,
        chord,
    })
}

fn window_chord(state: &AudioState, config: &Config) -> Option<ChordSegment> {
    if state.frames.is_empty() {
        return None;
    }

    let mut mean = [0.0f32; 12];
    for frame in &state.frames {
        for (slot, &v) in mean.iter_mut().zip(frame.chroma.iter()) {
            *slot += v;
        }
    }
    for slot in mean.iter_mut() {
        *slot /= state.frames.len() as f32;
    }

    harmony::detect_chord(&mean, config.harmony.chord_threshold).map(
        |(root, chord_type, confidence)| ChordSegment {
            start: 0.0,
            duration: state.duration_sec(),
            root_pitch_class: root,
            chord_type,
            confidence,
        },
    )
}
