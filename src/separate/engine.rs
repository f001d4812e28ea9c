//! Stem separator trait and error type.
//!
//! [`StemSeparator`] is the seam the job pipeline calls through.  It is
//! object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn StemSeparator>` and run on the blocking thread pool.

use std::path::Path;

use thiserror::Error;

use super::StemPaths;

// ---------------------------------------------------------------------------
// SeparationError
// ---------------------------------------------------------------------------

/// All errors that can arise while splitting a recording into stems.
#[derive(Debug, Clone, Error)]
pub enum SeparationError {
    /// The separator executable could not be started.
    #[error("could not launch separator `{command}`: {reason}")]
    Launch { command: String, reason: String },

    /// The separator ran but reported failure (unsupported codec, corrupt
    /// file, model failure ...).
    #[error("separator exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The separator finished but one of the expected stems is missing.
    #[error("separator produced no {stem} stem at {path}")]
    MissingStem { stem: String, path: String },

    /// Copying or creating stem files failed.
    #[error("stem file I/O failed: {0}")]
    Io(String),
}

// ---------------------------------------------------------------------------
// StemSeparator trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for source separation.
///
/// # Contract
///
/// - `audio` is a readable file in one of the supported containers.
/// - On success every path in the returned [`StemPaths`] exists under
///   `out_dir`.
/// - Calls may block for minutes; callers run them on a blocking pool.
pub trait StemSeparator: Send + Sync {
    /// Split `audio` into drums, bass, vocals and other, writing the stems
    /// below `out_dir`.
    fn separate(&self, audio: &Path, out_dir: &Path) -> Result<StemPaths, SeparationError>;
}

// Compile-time assertion: Box<dyn StemSeparator> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn StemSeparator>) {}
};
