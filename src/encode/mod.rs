//! Lossless streaming audio encoding.
//!
//! [`StreamEncoder`] consumes fixed-size `f32` frames from the real-time
//! audio callback and produces a FLAC byte stream that the submitter ships
//! to the remote recognition service.
//!
//! # Pipeline position
//!
//! ```text
//! audio callback → RecordingController::on_frame → StreamEncoder::feed
//!                                                          │
//!                                    end()/timeout flush → finish() → EncodedAudio
//! ```
//!
//! `feed` runs on the real-time thread: it converts and accumulates samples
//! in memory, with no locking and no blocking I/O.  The container encode
//! happens once, inside `finish()`, off the hot path.

pub mod flac;

pub use flac::{EncodedAudio, EncoderError, StreamEncoder};
