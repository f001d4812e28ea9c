//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::midi::Tempo;

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Where job directories live and how long finished ones are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Parent directory of every `<job_id>/` directory.
    pub results_dir: PathBuf,
    /// Seconds a finished job's files are kept before the retention sweeper
    /// removes them.
    pub retention_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            results_dir: AppPaths::new().results_dir,
            retention_secs: 24 * 60 * 60,
        }
    }
}

// ---------------------------------------------------------------------------
// UploadConfig
// ---------------------------------------------------------------------------

/// Upload acceptance rules applied before a file reaches the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Lower-case file extensions accepted for upload.
    pub allowed_extensions: Vec<String>,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: ["mp3", "wav", "m4a", "flac"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// SeparatorConfig
// ---------------------------------------------------------------------------

/// Settings for the Demucs stem separator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparatorConfig {
    /// Executable invoked for separation.
    pub command: String,
    /// Demucs model name; also the name of the sub-directory Demucs writes.
    pub model: String,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            command: "demucs".into(),
            model: "htdemucs".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriberConfig
// ---------------------------------------------------------------------------

/// Settings for the Basic Pitch transcriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Executable invoked for transcription.
    pub command: String,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            command: "basic-pitch".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// MidiConfig
// ---------------------------------------------------------------------------

/// Timing used for every MIDI file the pipeline writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiConfig {
    /// Resolution in ticks per quarter note.
    pub ticks_per_quarter: u16,
    /// Global tempo shared by all tracks.
    pub tempo_bpm: f64,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            ticks_per_quarter: 480,
            tempo_bpm: 120.0,
        }
    }
}

impl MidiConfig {
    /// The tempo map derived from these settings.
    pub fn tempo(&self) -> Tempo {
        Tempo::new(self.tempo_bpm, self.ticks_per_quarter)
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Failure policy of the job pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// When `true`, a stem whose transcription fails is merged as an empty
    /// track instead of failing the whole job.
    pub tolerate_stem_failures: bool,
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use organ_midi::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Result directory and retention.
    pub storage: StorageConfig,
    /// Upload acceptance rules.
    pub upload: UploadConfig,
    /// Stem separator settings.
    pub separator: SeparatorConfig,
    /// Transcriber settings.
    pub transcriber: TranscriberConfig,
    /// MIDI timing.
    pub midi: MidiConfig,
    /// Pipeline failure policy.
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet so
    /// callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
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

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.storage.results_dir, loaded.storage.results_dir);
        assert_eq!(original.storage.retention_secs, loaded.storage.retention_secs);
        assert_eq!(
            original.upload.allowed_extensions,
            loaded.upload.allowed_extensions
        );
        assert_eq!(original.upload.max_upload_bytes, loaded.upload.max_upload_bytes);
        assert_eq!(original.separator.command, loaded.separator.command);
        assert_eq!(original.separator.model, loaded.separator.model);
        assert_eq!(original.transcriber.command, loaded.transcriber.command);
        assert_eq!(
            original.midi.ticks_per_quarter,
            loaded.midi.ticks_per_quarter
        );
        assert_eq!(original.midi.tempo_bpm, loaded.midi.tempo_bpm);
        assert_eq!(
            original.pipeline.tolerate_stem_failures,
            loaded.pipeline.tolerate_stem_failures
        );
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.separator.command, "demucs");
        assert_eq!(config.midi.ticks_per_quarter, 480);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.upload.allowed_extensions, vec!["mp3", "wav", "m4a", "flac"]);
        assert_eq!(cfg.upload.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(cfg.separator.model, "htdemucs");
        assert_eq!(cfg.transcriber.command, "basic-pitch");
        assert_eq!(cfg.midi.tempo_bpm, 120.0);
        assert_eq!(cfg.storage.retention_secs, 86_400);
        assert!(!cfg.pipeline.tolerate_stem_failures);
    }

    /// A partial file keeps defaults for every section it omits.
    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            concat!(
                "[pipeline]\ntolerate_stem_failures = true\n\n",
                "[separator]\ncommand = \"/opt/demucs\"\nmodel = \"htdemucs_ft\"\n",
            ),
        )
        .expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert!(cfg.pipeline.tolerate_stem_failures);
        assert_eq!(cfg.separator.command, "/opt/demucs");
        assert_eq!(cfg.separator.model, "htdemucs_ft");
        assert_eq!(cfg.transcriber.command, "basic-pitch");
        assert_eq!(cfg.midi.ticks_per_quarter, 480);
    }

    #[test]
    fn midi_config_builds_tempo() {
        let cfg = MidiConfig {
            ticks_per_quarter: 960,
            tempo_bpm: 90.0,
        };
        let tempo = cfg.tempo();
        assert_eq!(tempo.ticks_per_quarter(), 960);
        assert_eq!(tempo.bpm(), 90.0);
    }
}
