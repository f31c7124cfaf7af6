//! Task and result value types for the submission pipeline.
//!
//! A [`TranscriptionTask`] is built by the controller when a session is
//! flushed and is immutable from then on: the submitter owns it until its
//! callback fires (success or failure) — never retried automatically.

use std::path::PathBuf;

use thiserror::Error;

use crate::encode::EncodedAudio;

// ---------------------------------------------------------------------------
// SubmitError
// ---------------------------------------------------------------------------

/// Errors surfaced through a task's `failed()` callback.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// Connection or read failure during the network exchange.
    #[error("network exchange failed: {0}")]
    Network(String),

    /// The response could not be parsed as the expected newline-delimited
    /// JSON.  Treated identically to [`SubmitError::Network`] by callers.
    #[error("malformed recognizer response: {0}")]
    Protocol(String),

    /// The task was cancelled by `shutdown_now()` before (or while) being
    /// serviced.
    #[error("task cancelled by shutdown")]
    Cancelled,
}

impl From<reqwest::Error> for SubmitError {
    fn from(e: reqwest::Error) -> Self {
        SubmitError::Network(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Hypothesis / TranscriptionResult
// ---------------------------------------------------------------------------

/// One recognition alternative.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    /// Recognized text.
    pub transcript: String,
    /// Service confidence in `[0, 1]`; absent for secondary alternatives.
    pub confidence: Option<f32>,
}

/// Outcome of one successful round trip to the recognizer.
///
/// "Empty" (no hypotheses, no status) is a valid, distinct value — the
/// service answered but produced nothing, e.g. only keep-alive lines before
/// end-of-stream.  A network failure is *not* represented here; that goes
/// through [`TaskCallback::failed`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptionResult {
    /// Alternatives ordered best-first.
    pub hypotheses: Vec<Hypothesis>,
    /// Index of this result within the response stream.
    pub result_index: u32,
    /// Per-segment recognition status.  `Some(code)` with a non-zero code
    /// means the service understood the request but could not recognize the
    /// audio — a negative outcome, not a transport error.
    pub status: Option<i64>,
}

impl TranscriptionResult {
    /// The best (first) hypothesis, if any.
    pub fn best(&self) -> Option<&Hypothesis> {
        self.hypotheses.first()
    }

    /// `true` when the service produced neither hypotheses nor a status.
    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty() && self.status.is_none()
    }

    /// `true` when the service reported a non-zero per-segment status.
    pub fn is_recognition_failure(&self) -> bool {
        matches!(self.status, Some(code) if code != 0)
    }
}

// ---------------------------------------------------------------------------
// TaskCallback
// ---------------------------------------------------------------------------

/// Per-task completion callback, invoked exactly once from the submitter's
/// worker thread.
pub trait TaskCallback: Send {
    /// The network exchange succeeded; `result` may still carry a negative
    /// recognition outcome (see [`TranscriptionResult::is_recognition_failure`]).
    fn completed(&self, result: &TranscriptionResult);

    /// The exchange failed or the task was cancelled.
    fn failed(&self, error: &SubmitError);
}

// ---------------------------------------------------------------------------
// TranscriptionTask
// ---------------------------------------------------------------------------

/// One unit of work for the submitter: a finished audio payload plus
/// everything needed to perform and report the exchange.
pub struct TranscriptionTask {
    /// Finished FLAC stream (carries its own sample rate).
    pub payload: EncodedAudio,
    /// Full request URL including query parameters.
    pub target_url: String,
    /// Optional diagnostic tee of the payload to disk.
    pub log_path: Option<PathBuf>,
    /// Receiver of the outcome; fired exactly once.
    pub callback: Box<dyn TaskCallback>,
}

impl std::fmt::Debug for TranscriptionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionTask")
            .field("payload_bytes", &self.payload.byte_len())
            .field("sample_rate", &self.payload.sample_rate())
            .field("log_path", &self.log_path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
