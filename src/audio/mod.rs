//! Audio source — microphone capture via `cpal`.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioFrame (mpsc) → RecordingController::on_frame
//! ```
//!
//! The pipeline itself is agnostic to where frames come from; this module is
//! the one concrete upstream collaborator the binary wires in.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::mpsc;
//! use speech_relay::audio::{AudioCapture, AudioFrame};
//!
//! let (tx, rx) = mpsc::channel::<AudioFrame>();
//! let capture = AudioCapture::new().unwrap();
//! let _handle = capture.start(tx).unwrap(); // drop handle → stops stream
//!
//! while let Ok(frame) = rx.recv() {
//!     println!("received {} samples @ {}Hz", frame.samples.len(), frame.sample_rate);
//! }
//! ```

pub mod capture;

pub use capture::{AudioCapture, AudioFrame, CaptureError, StreamHandle};
