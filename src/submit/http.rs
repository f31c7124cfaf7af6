//! The `Recognizer` seam and its production HTTP implementation.
//!
//! [`Recognizer`] is the object-safe interface the worker thread drives.
//! [`HttpRecognizer`] performs the real blocking exchange with the remote
//! recognition service; [`MockRecognizer`] (test-only) scripts outcomes so
//! the submitter and controller can be tested without a network.

use std::io::{BufReader, Cursor};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use super::response::read_result;
use super::task::{SubmitError, TranscriptionResult, TranscriptionTask};

// ---------------------------------------------------------------------------
// Recognizer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for one blocking recognition exchange.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn Recognizer>` and driven from the worker thread.
///
/// # Contract
///
/// - Blocking is allowed and expected; the caller is the dedicated worker.
/// - Every exit path must release the connection and any open streams —
///   errors are returned, never leaked sockets.
pub trait Recognizer: Send + Sync {
    /// Perform the exchange for `task` and parse the response.
    fn recognize(&self, task: &TranscriptionTask) -> Result<TranscriptionResult, SubmitError>;
}

// Compile-time assertion: Box<dyn Recognizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Recognizer>) {}
};

// ---------------------------------------------------------------------------
// HttpRecognizer
// ---------------------------------------------------------------------------

/// Production recognizer speaking the remote service's wire protocol.
///
/// Sends `POST {target_url}` with `Content-Type: audio/x-flac;
/// rate={sample_rate}` and the FLAC payload as a chunked request body (no
/// `Content-Length`), then reads newline-delimited JSON until the first
/// non-empty result.
pub struct HttpRecognizer {
    client: reqwest::blocking::Client,
}

impl HttpRecognizer {
    /// Build a recognizer whose requests time out after `timeout`.
    ///
    /// The timeout is the only bound on an in-flight exchange — the
    /// recording side enforces its own timing via the interval timer, and
    /// `shutdown_now()` relies on this bound for best-effort cancellation.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self { client }
    }
}

impl Recognizer for HttpRecognizer {
    fn recognize(&self, task: &TranscriptionTask) -> Result<TranscriptionResult, SubmitError> {
        // Diagnostic tee: failure to write the capture never fails the task.
        if let Some(path) = &task.log_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = std::fs::write(path, task.payload.bytes()) {
                log::warn!("recognizer: could not tee payload to {}: {e}", path.display());
            }
        }

        let content_type = format!("audio/x-flac; rate={}", task.payload.sample_rate());

        // Body::new over a reader forces chunked transfer encoding.
        let body = reqwest::blocking::Body::new(Cursor::new(task.payload.bytes().to_vec()));

        let response = self
            .client
            .post(&task.target_url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::Network(format!(
                "recognizer returned HTTP {status}"
            )));
        }

        read_result(BufReader::new(response))
    }
}

// ---------------------------------------------------------------------------
// Gate  (test-only)
// ---------------------------------------------------------------------------

/// Two-phase synchronisation point for worker tests: the worker announces
/// entry and then parks until the test opens the gate.
#[cfg(test)]
pub struct Gate {
    inner: std::sync::Mutex<GateInner>,
    cv: std::sync::Condvar,
}

#[cfg(test)]
struct GateInner {
    entered: usize,
    open: bool,
}

#[cfg(test)]
impl Gate {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            inner: std::sync::Mutex::new(GateInner {
                entered: 0,
                open: false,
            }),
            cv: std::sync::Condvar::new(),
        })
    }

    /// Called by the worker side: announce entry, then block until opened.
    pub fn enter(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entered += 1;
        self.cv.notify_all();
        while !inner.open {
            inner = self.cv.wait(inner).unwrap();
        }
    }

    /// Block until at least `n` workers have entered.
    pub fn wait_entered(&self, n: usize) {
        let mut inner = self.inner.lock().unwrap();
        while inner.entered < n {
            inner = self.cv.wait(inner).unwrap();
        }
    }

    /// Release every parked and future `enter()` call.
    pub fn open(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.open = true;
        self.cv.notify_all();
    }
}

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns scripted outcomes without touching a network.
///
/// Responses are consumed front-to-back; once the script is exhausted the
/// default response repeats.  An optional [`Gate`] lets a test park the
/// worker mid-task, and per-call delays simulate slow exchanges.
#[cfg(test)]
pub struct MockRecognizer {
    script: std::sync::Mutex<std::collections::VecDeque<Result<TranscriptionResult, SubmitError>>>,
    default_response: Result<TranscriptionResult, SubmitError>,
    delays: std::sync::Mutex<std::collections::VecDeque<Duration>>,
    gate: Option<std::sync::Arc<Gate>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockRecognizer {
    /// A mock whose every call succeeds with a single hypothesis.
    pub fn ok(transcript: &str) -> Self {
        use super::task::Hypothesis;
        Self::with_default(Ok(TranscriptionResult {
            hypotheses: vec![Hypothesis {
                transcript: transcript.into(),
                confidence: Some(0.9),
            }],
            result_index: 0,
            status: None,
        }))
    }

    /// A mock whose every call fails with `error`.
    pub fn failing(error: SubmitError) -> Self {
        Self::with_default(Err(error))
    }

    pub fn with_default(default_response: Result<TranscriptionResult, SubmitError>) -> Self {
        Self {
            script: std::sync::Mutex::new(std::collections::VecDeque::new()),
            default_response,
            delays: std::sync::Mutex::new(std::collections::VecDeque::new()),
            gate: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Queue one scripted response ahead of the default.
    pub fn push_response(&self, response: Result<TranscriptionResult, SubmitError>) {
        self.script.lock().unwrap().push_back(response);
    }

    /// Queue per-call delays (first call takes the first delay, and so on).
    pub fn push_delay(&self, delay: Duration) {
        self.delays.lock().unwrap().push_back(delay);
    }

    /// Park every call on `gate` until the test opens it.
    pub fn with_gate(mut self, gate: std::sync::Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of `recognize` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl Recognizer for MockRecognizer {
    fn recognize(&self, _task: &TranscriptionTask) -> Result<TranscriptionResult, SubmitError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.enter();
        }
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
