//! Container detection for uploaded audio.
//!
//! [`AudioFormat::sniff`] inspects the first bytes of an upload and decides
//! which of the four supported containers it is.  The file extension is not
//! trusted here; see [`super::upload`] for the extension/size gate.
//!
//! | Format | Signature |
//! |--------|-----------|
//! | WAV  | `RIFF` at 0, `WAVE` at 8 |
//! | FLAC | `fLaC` at 0 |
//! | MP3  | `ID3` tag at 0, or an MPEG audio frame sync (`0xFFE`) |
//! | M4A  | `ftyp` box at 4 |

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioFormatError
// ---------------------------------------------------------------------------

/// Reason an audio buffer was not accepted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioFormatError {
    /// The buffer holds no bytes at all.
    #[error("audio buffer is empty")]
    Empty,

    /// The leading bytes match none of the supported containers.
    #[error("unrecognised audio format (expected mp3, wav, m4a or flac)")]
    Unrecognized,
}

// ---------------------------------------------------------------------------
// AudioFormat
// ---------------------------------------------------------------------------

/// The audio containers the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    M4a,
    Flac,
}

impl AudioFormat {
    /// All supported formats.
    pub const ALL: [AudioFormat; 4] = [
        AudioFormat::Mp3,
        AudioFormat::Wav,
        AudioFormat::M4a,
        AudioFormat::Flac,
    ];

    /// Detect the container from the leading bytes of `bytes`.
    ///
    /// ```
    /// use organ_midi::audio::{AudioFormat, AudioFormatError};
    ///
    /// assert_eq!(AudioFormat::sniff(b"fLaC\0\0\0\x22"), Ok(AudioFormat::Flac));
    /// assert_eq!(AudioFormat::sniff(b""), Err(AudioFormatError::Empty));
    /// ```
    pub fn sniff(bytes: &[u8]) -> Result<Self, AudioFormatError> {
        if bytes.is_empty() {
            return Err(AudioFormatError::Empty);
        }

        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            return Ok(AudioFormat::Wav);
        }
        if bytes.starts_with(b"fLaC") {
            return Ok(AudioFormat::Flac);
        }
        if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
            return Ok(AudioFormat::M4a);
        }
        if bytes.starts_with(b"ID3") {
            return Ok(AudioFormat::Mp3);
        }
        // MPEG audio frame header: 11 set sync bits, and the layer field
        // must not be the reserved value 00.
        if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0 && bytes[1] & 0x06 != 0
        {
            return Ok(AudioFormat::Mp3);
        }

        Err(AudioFormatError::Unrecognized)
    }

    /// Map a file extension (case-insensitive, without the dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "m4a" => Some(AudioFormat::M4a),
            "flac" => Some(AudioFormat::Flac),
            _ => None,
        }
    }

    /// Canonical lower-case extension.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::M4a => "m4a",
            AudioFormat::Flac => "flac",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
