//! Where `settings.toml` and the job results live.
//!
//! Settings go under the platform config directory, results under the local
//! data directory, each in an `organ-midi/` sub-directory.  On Linux that is
//! `~/.config/organ-midi/settings.toml` and `~/.local/share/organ-midi/results/`.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "organ-midi";

#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Default `settings.toml`.
    pub settings_file: PathBuf,
    /// Default parent of the per-job directories.
    pub results_dir: PathBuf,
}

impl AppPaths {
    /// Resolve against the platform directories, or `.` where the platform
    /// has none.
    pub fn new() -> Self {
        let here = || PathBuf::from(".");
        Self::under(
            &dirs::config_dir().unwrap_or_else(here),
            &dirs::data_local_dir().unwrap_or_else(here),
        )
    }

    /// Lay the paths out below explicit config and data roots.
    pub fn under(config_root: &Path, data_root: &Path) -> Self {
        Self {
            settings_file: config_root.join(APP_DIR).join("settings.toml"),
            results_dir: data_root.join(APP_DIR).join("results"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
