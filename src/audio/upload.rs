//! Upload gate: extension allow-list and size limit.
//!
//! This is the precondition the job orchestrator relies on: it only ever
//! receives files that passed [`check_upload`].

use std::path::Path;

use thiserror::Error;

use super::AudioFormat;
use crate::config::UploadConfig;

/// Reason an upload was refused before a job was created.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UploadError {
    /// The file name has no extension at all.
    #[error("file has no extension (allowed: {allowed})")]
    MissingExtension { allowed: String },

    /// The extension is not on the allow-list.
    #[error("file type .{ext} is not allowed (allowed: {allowed})")]
    DisallowedExtension { ext: String, allowed: String },

    /// The file exceeds the configured size limit.
    #[error("file is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
}

/// Check `path`'s extension and `size` against `config`.
///
/// Returns the format implied by the extension on success.
///
/// ```
/// use std::path::Path;
/// use organ_midi::audio::{check_upload, AudioFormat};
/// use organ_midi::config::UploadConfig;
///
/// let cfg = UploadConfig::default();
/// assert_eq!(check_upload(Path::new("song.MP3"), 1024, &cfg), Ok(AudioFormat::Mp3));
/// assert!(check_upload(Path::new("song.ogg"), 1024, &cfg).is_err());
/// ```
pub fn check_upload(
    path: &Path,
    size: u64,
    config: &UploadConfig,
) -> Result<AudioFormat, UploadError> {
    let allowed = config.allowed_extensions.join(", ");

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| UploadError::MissingExtension {
            allowed: allowed.clone(),
        })?;

    let permitted = config
        .allowed_extensions
        .iter()
        .any(|a| a.eq_ignore_ascii_case(&ext));

    let format = match AudioFormat::from_extension(&ext) {
        Some(format) if permitted => format,
        _ => return Err(UploadError::DisallowedExtension { ext, allowed }),
    };

    if size > config.max_upload_bytes {
        return Err(UploadError::TooLarge {
            size,
            limit: config.max_upload_bytes,
        });
    }

    Ok(format)
}
