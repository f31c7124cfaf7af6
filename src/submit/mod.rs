//! Asynchronous submission of encoded audio to the remote recognizer.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                TranscriptionSubmitter                      │
//! │                                                            │
//! │  submit(task) ──▶ bounded queue (cap 3) ──▶ worker thread  │
//! │   (blocks when full — deliberate backpressure)    │        │
//! │                                                   ▼        │
//! │                              Recognizer::recognize(task)   │
//! │                              (HttpRecognizer / mock)       │
//! │                                                   │        │
//! │                        completed(result) / failed(error)   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exactly one worker thread services the queue FIFO, so results for
//! sequentially recorded sessions always come back in submission order.
//! The queue capacity is deliberately small to bound outstanding in-flight
//! audio payloads; a full queue blocks the submitting thread rather than
//! dropping audio.

pub mod http;
pub mod response;
pub mod task;
pub mod worker;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use http::{HttpRecognizer, Recognizer};
pub use response::read_result;
pub use task::{Hypothesis, SubmitError, TaskCallback, TranscriptionResult, TranscriptionTask};
pub use worker::{CancelPolicy, TranscriptionSubmitter, DEFAULT_QUEUE_CAPACITY};

// test-only re-exports so sibling modules can build worker/controller tests
// without reaching into `http`'s test internals.
#[cfg(test)]
pub use http::{Gate, MockRecognizer};
