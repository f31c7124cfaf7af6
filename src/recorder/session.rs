//! One recording session: encoder, timing and sequence bookkeeping.
//!
//! A [`Session`] lives from `begin()` to the flush that hands its encoded
//! audio to the submitter.  When the interval timer elapses and extensions
//! remain, [`Session::split_segment`] flushes the current encoder as its own
//! segment and re-arms the session with a fresh encoder and an incremented
//! sequence index — the timeout-splitting policy.

use std::time::{Duration, Instant};

use crate::config::AudioConfig;
use crate::encode::{EncodedAudio, EncoderError, StreamEncoder};
use crate::timer::Timer;

/// One continuous recording-to-submission cycle.
///
/// Owned exclusively by the controller; destroyed when flushed (success) or
/// aborted (encoder error).
#[derive(Debug)]
pub struct Session {
    start_time: Instant,
    /// Increments only when the session is *extended* past a timeout.
    sequence_index: u32,
    encoder: StreamEncoder,
    /// Per-interval deadline; restarted on every extension.
    interval: Timer,
    /// Kept so extensions can allocate a matching fresh encoder.
    audio: AudioConfig,
}

impl Session {
    /// Open a new session with its own encoder and a freshly started
    /// interval timer (`interval_secs <= 0` means no deadline).
    pub fn begin(audio: &AudioConfig, interval_secs: f32) -> Result<Self, EncoderError> {
        let encoder = StreamEncoder::open(audio.sample_rate, audio.channels, 16)?;
        let mut interval = Timer::from_secs_or_unbounded(interval_secs);
        interval.start();

        Ok(Self {
            start_time: Instant::now(),
            sequence_index: 0,
            encoder,
            interval,
            audio: audio.clone(),
        })
    }

    /// Feed one frame into the session encoder.
    pub fn feed(&mut self, samples: &[f32], overlap_to_skip: usize) -> Result<(), EncoderError> {
        self.encoder.feed(samples, overlap_to_skip)
    }

    /// `true` when the current interval's deadline has passed.
    pub fn interval_finished(&self) -> bool {
        self.interval.is_finished()
    }

    /// How many times this session has been extended.
    pub fn sequence_index(&self) -> u32 {
        self.sequence_index
    }

    /// Wall-clock time since `begin()`.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Samples fed into the current segment's encoder.
    pub fn samples_fed(&self) -> usize {
        self.encoder.samples_fed()
    }

    /// Re-arm the interval timer without flushing a segment.  Used when the
    /// deadline passes on an empty segment, which cannot be flushed.
    pub fn restart_interval(&mut self) {
        self.interval.start();
    }

    /// Flush the current segment and extend the session: the finished audio
    /// is returned for submission, a fresh encoder takes over, the sequence
    /// index increments and the interval timer restarts.
    pub fn split_segment(&mut self) -> Result<EncodedAudio, EncoderError> {
        let fresh = StreamEncoder::open(self.audio.sample_rate, self.audio.channels, 16)?;
        let finished = std::mem::replace(&mut self.encoder, fresh);

        let audio = finished.finish()?;
        self.sequence_index += 1;
        self.interval.start();
        log::debug!(
            "session: extended to sequence {} ({} bytes flushed)",
            self.sequence_index,
            audio.byte_len()
        );
        Ok(audio)
    }

    /// Final flush: close the encoder and return the session's last segment.
    pub fn finish(self) -> Result<EncodedAudio, EncoderError> {
        self.encoder.finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
