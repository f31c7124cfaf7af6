//! Recording lifecycle states and status notifications.
//!
//! [`RecordingState`] drives the controller's state machine.  Downstream
//! consumers (a UI layer, typically) observe it through [`StatusEvent`]s
//! delivered to registered listeners on every transition.

// ---------------------------------------------------------------------------
// RecordingState
// ---------------------------------------------------------------------------

/// States of the recording pipeline.
///
/// The state machine transitions are:
///
/// ```text
/// Idle/Listening ──begin()──▶ Recording
/// Recording ──on_frame, interval elapsed, extensions left──▶ Recording
///                                        (segment flushed, sequence += 1)
/// Recording ──on_frame, extensions exhausted──▶ Transcribing
/// Recording ──end()──▶ Transcribing
/// Transcribing ──completed──▶ Success ──▶ Idle / Listening
/// Transcribing ──failed────▶ Error   ──▶ Idle / Listening
/// any state ──shutdown()──▶ Shutdown   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// Waiting for an explicit `begin()`.
    Idle,

    /// Waiting, with auto-record armed — `begin()` still starts recording.
    Listening,

    /// Microphone frames are being fed to the session encoder.
    Recording,

    /// The session has been flushed and handed to the submitter.
    Transcribing,

    /// Momentary state: the last task completed with a result.
    Success,

    /// Momentary state: the last task failed.
    Error,

    /// Terminal.  The submitter is stopped; a fresh controller is required.
    Shutdown,
}

impl RecordingState {
    /// Returns `true` while a session is open and consuming frames.
    pub fn is_active(&self) -> bool {
        matches!(self, RecordingState::Recording)
    }

    /// Returns `true` once [`RecordingState::Shutdown`] is reached.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordingState::Shutdown)
    }

    /// A short human-readable label suitable for logs and status displays.
    pub fn label(&self) -> &'static str {
        match self {
            RecordingState::Idle => "Idle",
            RecordingState::Listening => "Listening",
            RecordingState::Recording => "Recording",
            RecordingState::Transcribing => "Transcribing",
            RecordingState::Success => "Success",
            RecordingState::Error => "Error",
            RecordingState::Shutdown => "Shutdown",
        }
    }
}

impl Default for RecordingState {
    fn default() -> Self {
        RecordingState::Idle
    }
}

// ---------------------------------------------------------------------------
// StatusEvent / StateListener
// ---------------------------------------------------------------------------

/// A change notification delivered to registered listeners.
///
/// `transcript` and `confidence` are populated on [`RecordingState::Success`]
/// events carrying a recognition result.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub status: RecordingState,
    pub transcript: Option<String>,
    pub confidence: Option<f32>,
}

impl StatusEvent {
    pub(crate) fn bare(status: RecordingState) -> Self {
        Self {
            status,
            transcript: None,
            confidence: None,
        }
    }
}

/// Listener callback invoked synchronously on every transition.
///
/// Listeners run on whichever thread triggered the transition (a caller
/// thread or the submitter worker) — keep them short.
pub type StateListener = Box<dyn Fn(&StatusEvent) + Send>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
