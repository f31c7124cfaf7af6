//! Result dispatch — the submitter-to-controller bridge.
//!
//! [`ResultDispatcher`] is the per-task callback the controller hands to the
//! submitter.  It runs on the worker thread: first the controller updates
//! its state (and notifies listeners), then the original caller-supplied
//! [`TranscriptionCallback`] fires.  No buffering; exactly one dispatch per
//! task.

use std::sync::{Arc, Weak};

use crate::submit::{SubmitError, TaskCallback, TranscriptionResult};

use super::controller::RecordingController;

// ---------------------------------------------------------------------------
// TranscriptionCallback
// ---------------------------------------------------------------------------

/// Caller-supplied receiver of transcription outcomes, provided once at
/// controller construction (an explicit typed interface — there is no
/// runtime method lookup).
pub trait TranscriptionCallback: Send + Sync {
    /// A round trip completed; the result may still carry a negative
    /// recognition status.
    fn completed(&self, result: &TranscriptionResult);

    /// The exchange failed or was cancelled.
    fn failed(&self, error: &SubmitError);
}

// ---------------------------------------------------------------------------
// ResultDispatcher
// ---------------------------------------------------------------------------

/// Per-task adapter: controller state update first, caller callback second.
///
/// Holds the controller weakly — a task outliving a dropped controller
/// still delivers its outcome to the caller.
pub(crate) struct ResultDispatcher {
    controller: Weak<RecordingController>,
    callback: Arc<dyn TranscriptionCallback>,
    /// Whether this task is the session's final flush.  A session that
    /// splits submits several tasks; only the final one may close the
    /// `Transcribing` phase — intermediate results are surfaced as events
    /// without a phase change.
    is_final: bool,
}

impl ResultDispatcher {
    pub(crate) fn new(
        controller: Weak<RecordingController>,
        callback: Arc<dyn TranscriptionCallback>,
        is_final: bool,
    ) -> Self {
        Self {
            controller,
            callback,
            is_final,
        }
    }
}

impl TaskCallback for ResultDispatcher {
    fn completed(&self, result: &TranscriptionResult) {
        if let Some(controller) = self.controller.upgrade() {
            controller.handle_completed(result, self.is_final);
        }
        self.callback.completed(result);
    }

    fn failed(&self, error: &SubmitError) {
        if let Some(controller) = self.controller.upgrade() {
            controller.handle_failed(error, self.is_final);
        }
        self.callback.failed(error);
    }
}
