//! Application entry point — speech-relay console front end.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the HTTP recognizer and the submission worker.
//! 4. Build the [`RecordingController`] with a transcript-printing callback.
//! 5. Start the cpal capture stream and the frame pump thread.
//! 6. Read stdin — an empty line toggles recording, `q` quits.

use std::io::BufRead;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::Context;

use speech_relay::{
    audio::{AudioCapture, AudioFrame},
    config::{AppConfig, AudioConfig},
    recorder::{RecordingController, TranscriptionCallback},
    submit::{HttpRecognizer, SubmitError, TranscriptionResult, TranscriptionSubmitter},
};

// ---------------------------------------------------------------------------
// Console callback
// ---------------------------------------------------------------------------

/// Prints every transcription outcome to stdout.
struct ConsoleCallback;

impl TranscriptionCallback for ConsoleCallback {
    fn completed(&self, result: &TranscriptionResult) {
        match result.best() {
            Some(best) => match best.confidence {
                Some(c) => println!("» {} ({c:.2})", best.transcript),
                None => println!("» {}", best.transcript),
            },
            None if result.is_recognition_failure() => {
                println!("» (service could not recognize the audio)");
            }
            None => println!("» (no speech detected)"),
        }
    }

    fn failed(&self, error: &SubmitError) {
        eprintln!("transcription failed: {error}");
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("speech-relay starting up");

    let mut config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }
    };
    if AppConfig::is_first_run() {
        if let Err(e) = config.save() {
            log::warn!("Could not write initial config: {e}");
        }
    }
    if config.recognizer.access_key.is_empty() {
        anyhow::bail!(
            "no API access key configured — set `access_key` in the settings file"
        );
    }

    // The capture device dictates the real stream parameters; the encoder
    // and the Content-Type rate must follow them, not the config defaults.
    let capture = AudioCapture::new().context("opening audio input device")?;
    config.audio = AudioConfig {
        sample_rate: capture.sample_rate(),
        channels: capture.channels(),
    };
    log::info!(
        "capture device: {} Hz, {} channel(s)",
        config.audio.sample_rate,
        config.audio.channels
    );

    let recognizer = Arc::new(HttpRecognizer::new(Duration::from_secs(
        config.recognizer.request_timeout_secs,
    )));
    let submitter = TranscriptionSubmitter::new(recognizer);
    let controller = RecordingController::new(
        config.recognizer.clone(),
        config.audio.clone(),
        submitter,
        Arc::new(ConsoleCallback),
        false,
    );
    controller.add_listener(|event| {
        log::info!("state: {}", event.status.label());
    });

    let (frame_tx, frame_rx) = mpsc::channel::<AudioFrame>();
    let _stream = capture
        .start(frame_tx)
        .context("starting audio capture stream")?;

    // Frame pump: drains the capture channel onto the controller.  Exits
    // when the stream handle is dropped and the channel disconnects.
    let pump_controller = Arc::clone(&controller);
    let pump = std::thread::spawn(move || {
        for frame in frame_rx {
            pump_controller.on_frame(&frame);
        }
    });

    println!("Press Enter to start/stop recording, `q` + Enter to quit.");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        match line.trim() {
            "q" | "quit" => break,
            "" => {
                if controller.is_recording() {
                    if let Err(e) = controller.end(true) {
                        log::warn!("could not stop recording: {e}");
                    }
                } else if let Err(e) = controller.begin(true) {
                    log::warn!("could not start recording: {e}");
                }
            }
            other => println!("unrecognized input {other:?} — Enter toggles, `q` quits"),
        }
    }

    log::info!("shutting down");
    controller.shutdown();
    drop(_stream);
    let _ = pump.join();
    Ok(())
}
