//! Validation tests for the live analysis session

use pitch2midi::config::Config;
use pitch2midi::LiveSession;
use std::f32::consts::PI;
use std::time::Duration;

fn generate_sine(freq: f32, amplitude: f32, duration_sec: f32, sr: u32) -> Vec<f32> {
    let n_samples = (duration_sec * sr as f32) as usize;
    (0..n_samples)
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sr as f32).sin())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_rejects_low_sample_rate() {
        assert!(LiveSession::start(4000, Config::default()).is_err());
    }

    #[test]
    fn test_session_produces_updates_for_streamed_audio() {
        let sr = 44100;
        let session = LiveSession::start(sr, Config::default()).unwrap();

        // Stream half a second of A4 in small blocks
        let audio = generate_sine(440.0, 0.5, 0.5, sr);
        for block in audio.chunks(2048) {
            session.push(block).unwrap();
        }

        // Early updates may cover only a fraction of the stream; wait for one
        // that carries the note
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let mut found = false;
        while std::time::Instant::now() < deadline {
            let Ok(update) = session.updates().recv_timeout(Duration::from_secs(1)) else {
                continue;
            };
            assert!(update.stream_time > 0.0);
            if update.notes.iter().any(|n| n.pitch == 69) {
                found = true;
                break;
            }
        }
        assert!(found, "no update carried A4 within the deadline");

        session.stop();
    }

    #[test]
    fn test_stop_is_cooperative_and_idempotent_via_drop() {
        let session = LiveSession::start(44100, Config::default()).unwrap();
        session.push(&[0.0f32; 512]).unwrap();
        // Dropping without an explicit stop must still join the worker
        drop(session);
    }

    #[test]
    fn test_push_after_stop_fails() {
        let session = LiveSession::start(44100, Config::default()).unwrap();
        session.stop();
        // The session has been consumed; a fresh one still works
        let session = LiveSession::start(44100, Config::default()).unwrap();
        assert!(session.push(&[0.0f32; 16]).is_ok());
        session.stop();
    }
}
