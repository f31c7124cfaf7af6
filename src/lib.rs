//! speech-relay — live microphone transcription via a remote recognizer.
//!
//! Captures audio, encodes it losslessly as FLAC while the user speaks, and
//! submits finished segments to a remote speech-recognition HTTP service,
//! delivering transcripts back through callbacks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────┐   frames    ┌────────────────────┐  EncodedAudio  ┌──────────────────────┐
//! │  cpal   │ ──────────▶ │ RecordingController│ ─────────────▶ │TranscriptionSubmitter│
//! │ capture │  (RT thread)│  Session           │   (task)       │  bounded queue (3)   │
//! └─────────┘             │   ├─ StreamEncoder │                │  single worker       │
//!                         │   └─ Timer         │                └──────────┬───────────┘
//!                         └─────────▲──────────┘                           │ HTTP POST
//!                                   │ results (ResultDispatcher)           ▼
//!                                   └────────────────────────────── remote recognizer
//! ```
//!
//! - [`audio`]    — cpal capture stream producing f32 frames.
//! - [`encode`]   — incremental FLAC encoding of those frames.
//! - [`timer`]    — the interval timer driving the extend-or-flush policy.
//! - [`recorder`] — session lifecycle and the controller state machine.
//! - [`submit`]   — bounded-queue worker performing the network exchange.
//! - [`config`]   — TOML settings and platform paths.

pub mod audio;
pub mod config;
pub mod encode;
pub mod recorder;
pub mod submit;
pub mod timer;
