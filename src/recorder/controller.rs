//! The recording controller — session lifecycle, timing policy and the
//! bridge between the real-time audio callback and the submitter.
//!
//! # Concurrency model
//!
//! Three execution contexts touch the controller:
//!
//! 1. **Real-time audio thread** — calls [`RecordingController::on_frame`]
//!    only.  It reads the atomic `recording` flag and `try_lock`s the
//!    session; it never takes the lifecycle lock and never blocks on one
//!    held by another thread (a frame arriving inside the tiny begin/end
//!    window is dropped, not waited for).
//! 2. **Caller threads** — `begin` / `end` / `shutdown`, serialised against
//!    each other by the lifecycle lock.
//! 3. **Submitter worker** — delivers results through
//!    [`ResultDispatcher`](super::dispatch::ResultDispatcher), which updates
//!    controller state and then fires the caller's callback.
//!
//! The one deliberately blocking point is the submit enqueue: when the
//! bounded queue is saturated the submitting thread parks until a slot
//! frees — backpressure instead of dropped audio.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use thiserror::Error;

use crate::audio::AudioFrame;
use crate::config::{AudioConfig, RecognizerConfig};
use crate::encode::{EncodedAudio, EncoderError};
use crate::submit::{
    SubmitError, TranscriptionResult, TranscriptionSubmitter, TranscriptionTask,
};

use super::dispatch::{ResultDispatcher, TranscriptionCallback};
use super::session::Session;
use super::state::{RecordingState, StateListener, StatusEvent};

// ---------------------------------------------------------------------------
// ControllerError
// ---------------------------------------------------------------------------

/// Errors raised by the controller's lifecycle operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// `begin()` while a session is already active (only with `do_throw`).
    #[error("recording is already active")]
    AlreadyActive,

    /// `end()` with no active session (only with `do_throw`).
    #[error("no recording is active")]
    NotActive,

    /// Lifecycle call after `shutdown()` — the controller is terminal.
    #[error("controller has been shut down")]
    Shutdown,

    /// Opening or flushing the session encoder failed.
    #[error(transparent)]
    Encoding(#[from] EncoderError),

    /// The submitter rejected the task (only possible after shutdown).
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

// ---------------------------------------------------------------------------
// RecordingController
// ---------------------------------------------------------------------------

struct ControllerInner {
    state: RecordingState,
    listeners: Vec<StateListener>,
}

/// Owns the session lifecycle and the extend-or-flush timing policy.
///
/// One controller per logical microphone pipeline: it holds at most one
/// live [`Session`] and delegates all network work to one
/// [`TranscriptionSubmitter`].  After [`shutdown`](Self::shutdown) the
/// controller is terminal — build a fresh one to record again.
pub struct RecordingController {
    recognizer_config: RecognizerConfig,
    audio_config: AudioConfig,
    submitter: TranscriptionSubmitter,
    callback: Arc<dyn TranscriptionCallback>,
    /// Rest state after a cycle: `Listening` when auto-record is armed.
    auto_record: bool,

    /// The flag the real-time callback reads; `Release` on write pairs with
    /// `Acquire` in `on_frame` so the session installed by `begin()` is
    /// visible before the flag is.
    recording: AtomicBool,
    /// The live session.  `on_frame` only ever `try_lock`s this.
    session: Mutex<Option<Session>>,
    /// State + listeners; taken by caller threads and the worker, never by
    /// the frame path.
    inner: Mutex<ControllerInner>,
    /// Serialises `begin`/`end`/`shutdown` against each other.
    lifecycle: Mutex<()>,
    /// Numbers tasks for the diagnostic log-path pattern.
    task_counter: AtomicU64,
    self_weak: Weak<Self>,
}

impl RecordingController {
    /// Build a controller.
    ///
    /// # Arguments
    ///
    /// * `recognizer_config` — endpoint, language, key and timing policy.
    /// * `audio_config`      — sample rate / channels for session encoders.
    /// * `submitter`         — owned for the controller's lifetime.
    /// * `callback`          — receiver of per-task outcomes.
    /// * `auto_record`       — rest in `Listening` instead of `Idle`.
    pub fn new(
        recognizer_config: RecognizerConfig,
        audio_config: AudioConfig,
        submitter: TranscriptionSubmitter,
        callback: Arc<dyn TranscriptionCallback>,
        auto_record: bool,
    ) -> Arc<Self> {
        let rest = if auto_record {
            RecordingState::Listening
        } else {
            RecordingState::Idle
        };

        Arc::new_cyclic(|weak| Self {
            recognizer_config,
            audio_config,
            submitter,
            callback,
            auto_record,
            recording: AtomicBool::new(false),
            session: Mutex::new(None),
            inner: Mutex::new(ControllerInner {
                state: rest,
                listeners: Vec::new(),
            }),
            lifecycle: Mutex::new(()),
            task_counter: AtomicU64::new(0),
            self_weak: weak.clone(),
        })
    }

    /// Register a listener for state-change notifications.
    ///
    /// Listeners run synchronously on the transitioning thread; keep them
    /// short and do not call back into the controller from them.
    pub fn add_listener(&self, listener: impl Fn(&StatusEvent) + Send + 'static) {
        self.inner.lock().unwrap().listeners.push(Box::new(listener));
    }

    /// Current state.
    pub fn state(&self) -> RecordingState {
        self.inner.lock().unwrap().state
    }

    /// Whether the real-time callback is currently feeding a session.
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Lifecycle (caller threads)
    // -----------------------------------------------------------------------

    /// Start a new recording session.
    ///
    /// # Errors
    ///
    /// With `do_throw`, [`ControllerError::AlreadyActive`] when a session is
    /// already open and [`ControllerError::Shutdown`] after shutdown;
    /// without it those cases are silent no-ops.  Encoder-open failures are
    /// always returned.
    pub fn begin(&self, do_throw: bool) -> Result<(), ControllerError> {
        let _lifecycle = self.lifecycle.lock().unwrap();

        {
            let inner = self.inner.lock().unwrap();
            match inner.state {
                RecordingState::Idle | RecordingState::Listening => {}
                RecordingState::Shutdown => {
                    return if do_throw {
                        Err(ControllerError::Shutdown)
                    } else {
                        Ok(())
                    };
                }
                _ => {
                    return if do_throw {
                        Err(ControllerError::AlreadyActive)
                    } else {
                        Ok(())
                    };
                }
            }
        }

        let session = Session::begin(
            &self.audio_config,
            self.recognizer_config.max_transcription_interval_secs,
        )?;
        *self.session.lock().unwrap() = Some(session);
        self.recording.store(true, Ordering::Release);

        log::info!("controller: recording started");
        let mut inner = self.inner.lock().unwrap();
        Self::transition_locked(&mut inner, RecordingState::Recording, None, None);
        Ok(())
    }

    /// End the active session: flush its encoder, hand the payload to the
    /// submitter and enter `Transcribing`.
    ///
    /// # Errors
    ///
    /// With `do_throw`, [`ControllerError::NotActive`] when nothing is
    /// recording and [`ControllerError::Shutdown`] after shutdown; silent
    /// no-ops otherwise.  Encoder flush failures abort the session and are
    /// returned.
    pub fn end(&self, do_throw: bool) -> Result<(), ControllerError> {
        let _lifecycle = self.lifecycle.lock().unwrap();

        {
            let inner = self.inner.lock().unwrap();
            match inner.state {
                RecordingState::Recording => {}
                RecordingState::Shutdown => {
                    return if do_throw {
                        Err(ControllerError::Shutdown)
                    } else {
                        Ok(())
                    };
                }
                _ => {
                    return if do_throw {
                        Err(ControllerError::NotActive)
                    } else {
                        Ok(())
                    };
                }
            }
        }

        self.recording.store(false, Ordering::Release);
        // Waits at most one frame-feed: on_frame holds the session lock only
        // while feeding.
        let session = self.session.lock().unwrap().take();

        match session {
            Some(session) => {
                log::info!(
                    "controller: recording ended after {:.2}s (sequence {})",
                    session.elapsed().as_secs_f32(),
                    session.sequence_index()
                );
                self.flush_final(session)
            }
            None => {
                // The timeout policy already force-flushed from the frame
                // path; nothing left to do.
                Ok(())
            }
        }
    }

    /// Shut the pipeline down: terminal state, session discarded, submitter
    /// stopped.  Idempotent.
    pub fn shutdown(&self) {
        {
            let _lifecycle = self.lifecycle.lock().unwrap();

            let mut inner = self.inner.lock().unwrap();
            if inner.state.is_terminal() {
                return;
            }
            inner.state = RecordingState::Shutdown;
            log::info!("controller: shutdown");
            let event = StatusEvent::bare(RecordingState::Shutdown);
            Self::notify_locked(&inner, &event);
            drop(inner);

            self.recording.store(false, Ordering::Release);
            *self.session.lock().unwrap() = None;
        }
        // Join the worker outside the lifecycle lock so a callback that
        // re-enters the controller cannot wedge the join.
        self.submitter.shutdown_now();
    }

    // -----------------------------------------------------------------------
    // Real-time path
    // -----------------------------------------------------------------------

    /// Feed one audio frame.  Called only from the real-time thread.
    ///
    /// Applies the extend-or-flush policy when the interval deadline has
    /// passed: with extensions left, the current segment is flushed as its
    /// own task and the session re-arms (sequence += 1, still `Recording`);
    /// with extensions exhausted, the session force-flushes and the
    /// controller enters `Transcribing`.
    pub fn on_frame(&self, frame: &AudioFrame) {
        if !self.recording.load(Ordering::Acquire) {
            return;
        }

        let Ok(mut guard) = self.session.try_lock() else {
            // begin/end holds the session for a moment; drop the frame.
            return;
        };
        let Some(session) = guard.as_mut() else {
            return;
        };

        if let Err(e) = session.feed(&frame.samples, frame.overlap) {
            log::error!("controller: encoder error — aborting session: {e}");
            *guard = None;
            drop(guard);
            self.abort_to_rest();
            return;
        }

        if !session.interval_finished() {
            return;
        }

        let max = self.recognizer_config.interval_sequence_count_max;
        let extensions_left = max <= 0 || i64::from(session.sequence_index()) < i64::from(max);

        // A segment with nothing in it (fully-overlapped frames since the
        // last split) is not flushable; re-arm the interval and keep going.
        if session.samples_fed() == 0 {
            if extensions_left {
                session.restart_interval();
            } else {
                *guard = None;
                drop(guard);
                log::warn!("controller: interval sequence exhausted with an empty segment — discarding session");
                self.abort_to_rest();
            }
            return;
        }

        if extensions_left {
            match session.split_segment() {
                Ok(audio) => {
                    drop(guard);
                    if let Err(e) = self.submit_segment(audio, false) {
                        log::error!("controller: segment submit failed: {e}");
                    }
                }
                Err(e) => {
                    log::error!("controller: session extension failed — aborting session: {e}");
                    *guard = None;
                    drop(guard);
                    self.abort_to_rest();
                }
            }
        } else {
            let session = guard.take();
            drop(guard);
            self.recording.store(false, Ordering::Release);
            if let Some(session) = session {
                log::info!(
                    "controller: interval sequence exhausted after {:.2}s — flushing",
                    session.elapsed().as_secs_f32()
                );
                if let Err(e) = self.flush_final(session) {
                    log::error!("controller: forced flush failed: {e}");
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Result dispatch (worker thread, via ResultDispatcher)
    // -----------------------------------------------------------------------

    /// Dispatch for a completed round trip.  Only the session's final task
    /// may drive `Transcribing → Success → rest`; a split segment's result
    /// is surfaced as an event without a phase change, whatever the current
    /// state — the final flush may still be in flight behind it.
    pub(crate) fn handle_completed(&self, result: &TranscriptionResult, is_final: bool) {
        let transcript = result.best().map(|h| h.transcript.clone());
        let confidence = result.best().and_then(|h| h.confidence);

        let mut inner = self.inner.lock().unwrap();
        if is_final && inner.state == RecordingState::Transcribing {
            Self::transition_locked(&mut inner, RecordingState::Success, transcript, confidence);
            Self::transition_locked(&mut inner, self.rest_state(), None, None);
        } else if !inner.state.is_terminal() {
            let event = StatusEvent {
                status: RecordingState::Success,
                transcript,
                confidence,
            };
            Self::notify_locked(&inner, &event);
        }
    }

    pub(crate) fn handle_failed(&self, error: &SubmitError, is_final: bool) {
        log::warn!("controller: transcription failed: {error}");

        let mut inner = self.inner.lock().unwrap();
        if is_final && inner.state == RecordingState::Transcribing {
            Self::transition_locked(&mut inner, RecordingState::Error, None, None);
            Self::transition_locked(&mut inner, self.rest_state(), None, None);
        } else if !inner.state.is_terminal() {
            let event = StatusEvent::bare(RecordingState::Error);
            Self::notify_locked(&inner, &event);
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn rest_state(&self) -> RecordingState {
        if self.auto_record {
            RecordingState::Listening
        } else {
            RecordingState::Idle
        }
    }

    /// Abort the current cycle: clear the flag and return to rest.
    fn abort_to_rest(&self) {
        self.recording.store(false, Ordering::Release);
        let mut inner = self.inner.lock().unwrap();
        Self::transition_locked(&mut inner, self.rest_state(), None, None);
    }

    /// Final flush: enter `Transcribing` *before* submitting so the result
    /// dispatch can never observe a stale phase, then hand off the payload.
    fn flush_final(&self, session: Session) -> Result<(), ControllerError> {
        match session.finish() {
            Ok(audio) => {
                {
                    let mut inner = self.inner.lock().unwrap();
                    Self::transition_locked(&mut inner, RecordingState::Transcribing, None, None);
                }
                if let Err(e) = self.submit_segment(audio, true) {
                    // Only reachable after shutdown; transitions no-op then.
                    self.abort_to_rest();
                    return Err(e.into());
                }
                Ok(())
            }
            Err(e) => {
                log::error!("controller: encoder flush failed — session discarded: {e}");
                self.abort_to_rest();
                Err(e.into())
            }
        }
    }

    /// Build and enqueue one task; blocks only under queue saturation.
    /// `is_final` marks the session's closing flush — the one task whose
    /// outcome resolves the `Transcribing` phase.
    fn submit_segment(&self, audio: EncodedAudio, is_final: bool) -> Result<(), SubmitError> {
        let n = self.task_counter.fetch_add(1, Ordering::Relaxed);
        let task = TranscriptionTask {
            payload: audio,
            target_url: self.recognizer_config.recognize_url(),
            log_path: self.recognizer_config.log_path_for(n),
            callback: Box::new(ResultDispatcher::new(
                self.self_weak.clone(),
                Arc::clone(&self.callback),
                is_final,
            )),
        };
        log::info!(
            "controller: submitting task {n} ({} bytes @ {} Hz)",
            task.payload.byte_len(),
            task.payload.sample_rate()
        );
        self.submitter.submit(task)
    }

    fn transition_locked(
        inner: &mut ControllerInner,
        next: RecordingState,
        transcript: Option<String>,
        confidence: Option<f32>,
    ) {
        if inner.state.is_terminal() {
            return;
        }
        inner.state = next;
        log::debug!("controller: → {}", next.label());
        let event = StatusEvent {
            status: next,
            transcript,
            confidence,
        };
        Self::notify_locked(inner, &event);
    }

    fn notify_locked(inner: &ControllerInner, event: &StatusEvent) {
        for listener in &inner.listeners {
            listener(event);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
