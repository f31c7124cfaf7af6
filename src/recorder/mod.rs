//! Recording lifecycle: the state machine, per-session wiring and the
//! controller that ties capture, encoding and submission together.
//!
//! # Pipeline position
//!
//! ```text
//! audio thread ──▶ RecordingController::on_frame ──▶ Session (encoder+timer)
//!                          │                               │
//!                          │ interval policy               │ flush
//!                          ▼                               ▼
//!                  begin()/end() callers ──▶ TranscriptionSubmitter
//!                          ▲                               │
//!                          └──── ResultDispatcher ◀────────┘
//! ```
//!
//! One [`RecordingController`] per pipeline.  Callers drive it with
//! `begin()`/`end()`; the audio thread feeds it frames; results come back
//! through the caller's [`TranscriptionCallback`] and state listeners.

pub mod controller;
pub mod dispatch;
pub mod session;
pub mod state;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use controller::{ControllerError, RecordingController};
pub use dispatch::TranscriptionCallback;
pub use session::Session;
pub use state::{RecordingState, StateListener, StatusEvent};
