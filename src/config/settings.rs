//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// RecognizerConfig
// ---------------------------------------------------------------------------

/// Settings for the remote recognition service and the session timing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// API access key appended to the request URL.  Required; there is no
    /// usable default — an empty key will be rejected by the service.
    pub access_key: String,
    /// Recognition language as an ISO-639-1 code.
    pub language: String,
    /// Base URI of the recognition endpoint; the request URL is
    /// `{api_base}recognize?output=json&lang={language}&key={access_key}`.
    pub api_base: String,
    /// Maximum length of one recording interval in seconds before the
    /// session is extended or flushed.  `<= 0` means unbounded.
    pub max_transcription_interval_secs: f32,
    /// How many times a session may be extended past the interval before a
    /// forced flush.  `<= 0` means unbounded (never force-flush).
    pub interval_sequence_count_max: i32,
    /// Optional pattern for teeing the encoded payload to disk for
    /// diagnostics; `{n}` is replaced by a per-task counter.  Relative
    /// patterns land in the platform captures directory.
    pub logfile_path_pattern: Option<String>,
    /// Per-request timeout on the blocking HTTP client, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            language: "en".into(),
            api_base: "https://www.google.com/speech-api/v2/".into(),
            max_transcription_interval_secs: 8.0,
            interval_sequence_count_max: 3,
            logfile_path_pattern: None,
            request_timeout_secs: 30,
        }
    }
}

impl RecognizerConfig {
    /// Build the full request URL for one transcription task.
    pub fn recognize_url(&self) -> String {
        format!(
            "{}recognize?output=json&lang={}&key={}",
            self.api_base, self.language, self.access_key
        )
    }

    /// Resolve `logfile_path_pattern` for task number `n`, if configured.
    ///
    /// Relative patterns resolve into the platform captures directory
    /// ([`AppPaths::captures_dir`]); absolute patterns are used as given.
    pub fn log_path_for(&self, n: u64) -> Option<std::path::PathBuf> {
        let pattern = self.logfile_path_pattern.as_ref()?;
        let path = std::path::PathBuf::from(pattern.replace("{n}", &n.to_string()));
        if path.is_absolute() {
            Some(path)
        } else {
            Some(AppPaths::new().captures_dir.join(path))
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for the upstream audio source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Capture sample rate in Hz; also sent in the `Content-Type` header.
    pub sample_rate: u32,
    /// Number of interleaved channels fed to the encoder.
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use speech_relay::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote recognizer and session timing settings.
    pub recognizer: RecognizerConfig,
    /// Audio source settings.
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.recognizer.access_key, loaded.recognizer.access_key);
        assert_eq!(original.recognizer.language, loaded.recognizer.language);
        assert_eq!(original.recognizer.api_base, loaded.recognizer.api_base);
        assert_eq!(
            original.recognizer.max_transcription_interval_secs,
            loaded.recognizer.max_transcription_interval_secs
        );
        assert_eq!(
            original.recognizer.interval_sequence_count_max,
            loaded.recognizer.interval_sequence_count_max
        );
        assert_eq!(
            original.recognizer.request_timeout_secs,
            loaded.recognizer.request_timeout_secs
        );
        assert_eq!(original.audio.sample_rate, loaded.audio.sample_rate);
        assert_eq!(original.audio.channels, loaded.audio.channels);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.recognizer.language, default.recognizer.language);
        assert_eq!(config.recognizer.api_base, default.recognizer.api_base);
        assert_eq!(config.audio.sample_rate, default.audio.sample_rate);
    }

    /// Verify default values.
    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert!(cfg.recognizer.access_key.is_empty());
        assert_eq!(cfg.recognizer.language, "en");
        assert_eq!(cfg.recognizer.api_base, "https://www.google.com/speech-api/v2/");
        assert_eq!(cfg.recognizer.max_transcription_interval_secs, 8.0);
        assert_eq!(cfg.recognizer.interval_sequence_count_max, 3);
        assert!(cfg.recognizer.logfile_path_pattern.is_none());
        assert_eq!(cfg.recognizer.request_timeout_secs, 30);
        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.audio.channels, 1);
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.recognizer.access_key = "abc123".into();
        cfg.recognizer.language = "de".into();
        cfg.recognizer.api_base = "https://stt.example.org/".into();
        cfg.recognizer.max_transcription_interval_secs = -1.0;
        cfg.recognizer.interval_sequence_count_max = 0;
        cfg.recognizer.logfile_path_pattern = Some("/tmp/capture-{n}.flac".into());
        cfg.audio.sample_rate = 44_100;
        cfg.audio.channels = 2;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.recognizer.access_key, "abc123");
        assert_eq!(loaded.recognizer.language, "de");
        assert_eq!(loaded.recognizer.api_base, "https://stt.example.org/");
        assert_eq!(loaded.recognizer.max_transcription_interval_secs, -1.0);
        assert_eq!(loaded.recognizer.interval_sequence_count_max, 0);
        assert_eq!(
            loaded.recognizer.logfile_path_pattern.as_deref(),
            Some("/tmp/capture-{n}.flac")
        );
        assert_eq!(loaded.audio.sample_rate, 44_100);
        assert_eq!(loaded.audio.channels, 2);
    }

    // ---- URL / log-path helpers ----

    #[test]
    fn recognize_url_interpolates_all_fields() {
        let mut cfg = RecognizerConfig::default();
        cfg.access_key = "KEY".into();
        cfg.language = "fr".into();
        cfg.api_base = "https://stt.example.org/v2/".into();

        assert_eq!(
            cfg.recognize_url(),
            "https://stt.example.org/v2/recognize?output=json&lang=fr&key=KEY"
        );
    }

    #[test]
    fn log_path_substitutes_counter() {
        let mut cfg = RecognizerConfig::default();
        cfg.logfile_path_pattern = Some("/tmp/cap-{n}.flac".into());

        assert_eq!(
            cfg.log_path_for(7),
            Some(std::path::PathBuf::from("/tmp/cap-7.flac"))
        );
        cfg.logfile_path_pattern = None;
        assert_eq!(cfg.log_path_for(7), None);
    }

    #[test]
    fn relative_log_pattern_resolves_into_captures_dir() {
        let mut cfg = RecognizerConfig::default();
        cfg.logfile_path_pattern = Some("cap-{n}.flac".into());

        let resolved = cfg.log_path_for(3).expect("path");
        assert_eq!(resolved, AppPaths::new().captures_dir.join("cap-3.flac"));
        assert!(resolved.is_absolute());
    }
}
