//! Audio intake: container detection and upload acceptance.
//!
//! The pipeline never decodes audio itself; the separator does.  This module
//! only decides whether an upload is something the separator can be handed.
//!
//! ```text
//! upload file ──check_upload──▶ extension + size ok
//!     bytes   ──AudioFormat::sniff──▶ mp3 | wav | m4a | flac
//! ```

pub mod format;
pub mod upload;

pub use format::{AudioFormat, AudioFormatError};
pub use upload::{check_upload, UploadError};
