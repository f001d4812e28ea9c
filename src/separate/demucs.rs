//! Production separator that shells out to the Demucs command-line tool.
//!
//! Demucs writes `<out>/<model>/<track>/{drums,bass,vocals,other}.wav`.
//! [`DemucsSeparator`] runs it into a scratch directory, then copies the four
//! stems to `<out_dir>/<track>_<stem>.wav` and drops the scratch tree.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::SeparatorConfig;

use super::{SeparationError, Stem, StemPaths, StemSeparator};

/// Name of the scratch directory Demucs writes into, below `out_dir`.
const SCRATCH_DIR: &str = ".demucs";

/// Runs `demucs -n <model> -o <scratch> <audio>`.
#[derive(Debug, Clone)]
pub struct DemucsSeparator {
    command: String,
    model: String,
}

impl DemucsSeparator {
    pub fn new(command: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &SeparatorConfig) -> Self {
        Self::new(&config.command, &config.model)
    }

    /// Where Demucs leaves the raw stem for `track`.
    fn raw_stem_path(&self, scratch: &Path, track: &str, stem: Stem) -> PathBuf {
        scratch
            .join(&self.model)
            .join(track)
            .join(format!("{}.wav", stem.name()))
    }
}

impl StemSeparator for DemucsSeparator {
    fn separate(&self, audio: &Path, out_dir: &Path) -> Result<StemPaths, SeparationError> {
        let track = track_name(audio);
        let scratch = out_dir.join(SCRATCH_DIR);
        std::fs::create_dir_all(&scratch).map_err(|e| SeparationError::Io(e.to_string()))?;

        log::info!("separate: running {} on {}", self.command, audio.display());
        let output = Command::new(&self.command)
            .arg("-n")
            .arg(&self.model)
            .arg("-o")
            .arg(&scratch)
            .arg(audio)
            .output()
            .map_err(|e| SeparationError::Launch {
                command: self.command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SeparationError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stems = StemPaths::from_fn(|stem| out_dir.join(format!("{track}_{}.wav", stem.name())));
        for (stem, dest) in stems.iter() {
            let raw = self.raw_stem_path(&scratch, &track, stem);
            if !raw.exists() {
                return Err(SeparationError::MissingStem {
                    stem: stem.name().to_string(),
                    path: raw.display().to_string(),
                });
            }
            std::fs::copy(&raw, dest).map_err(|e| SeparationError::Io(e.to_string()))?;
            log::debug!("separate: {} -> {}", raw.display(), dest.display());
        }

        if let Err(e) = std::fs::remove_dir_all(&scratch) {
            log::warn!("separate: could not remove {}: {e}", scratch.display());
        }

        Ok(stems)
    }
}

/// File stem of `audio`, or `"track"` when it has none.
pub fn track_name(audio: &Path) -> String {
    audio
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("track")
        .to_string()
}
