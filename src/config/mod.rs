//! `settings.toml`: one section per pipeline concern, loaded with defaults
//! for anything missing.
//!
//! ```text
//! [storage]      results_dir, retention_secs
//! [upload]       allowed_extensions, max_upload_bytes
//! [separator]    command, model
//! [transcriber]  command
//! [midi]         ticks_per_quarter, tempo_bpm
//! [pipeline]     tolerate_stem_failures
//! ```

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, MidiConfig, PipelineConfig, SeparatorConfig, StorageConfig, TranscriberConfig,
    UploadConfig,
};
