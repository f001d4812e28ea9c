//! Source separation: one mixed recording in, four stems out.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            StemSeparator (trait)             │
//! │                                              │
//! │   ┌──────────────────┐                       │
//! │   │ DemucsSeparator  │── demucs CLI ──┐      │
//! │   └──────────────────┘                ▼      │
//! │                  StemPaths { drums, bass,    │
//! │                              vocals, other } │
//! └──────────────────────────────────────────────┘
//! ```

pub mod demucs;
pub mod engine;
pub mod stem;

pub use demucs::{track_name, DemucsSeparator};
pub use engine::{SeparationError, StemSeparator};
pub use stem::{Stem, StemPaths};
