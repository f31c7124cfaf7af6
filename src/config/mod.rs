//! Configuration module for the speech-relay pipeline.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the recognizer
//! and audio capture, `AppPaths` for cross-platform data directories, and
//! TOML persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, AudioConfig, RecognizerConfig};
