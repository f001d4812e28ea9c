//! Jobs: state machine, registry, orchestrator and retention.
//!
//! Split into four layers:
//!
//! - [`state`]: [`JobStatus`] FSM, the pure [`transition`] function and the [`Job`] record
//! - [`registry`]: [`JobRegistry`], the only shared mutable state
//! - [`runner`]: [`JobOrchestrator`], which runs each upload as its own task
//! - [`retention`]: [`RetentionSweeper`], which deletes expired jobs

pub mod registry;
pub mod retention;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use registry::JobRegistry;
pub use retention::RetentionSweeper;
pub use runner::{JobError, JobOrchestrator, PipelineError, PipelineSettings};
pub use state::{transition, InvalidTransition, Job, JobEvent, JobId, JobStatus, COMBINED_KEY};
