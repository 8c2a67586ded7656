//! Dependency-ordered repository sync across a stage.
//!
//! # Module Structure
//!
//! - [`types`] - `SyncOptions`, `PollPolicy`, `RepositorySelection`, constants
//! - [`progress`] - `SyncProgress`, `SyncState`, `ProgressCallback`, `emit()`
//! - [`scheduler`] - `run_ordered()`, one task per node gated on its parent
//! - [`machine`] - `sync_node()`, the per-repository state machine
//! - [`report`] - `SyncErrors`, the aggregated error summary
//! - [`engine`] - `sync_stage()`, tying the above together

pub mod engine;
mod error;
pub mod machine;
mod progress;
mod report;
pub mod scheduler;
mod types;

pub use error::{SyncError, TimeoutPhase};

pub use types::{PollPolicy, RepositorySelection, SyncOptions};

pub use types::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAITING_BACKOFF_SECS, DEFAULT_WAITING_RETRIES,
    PROGRESS_CHANNEL_CAPACITY,
};

pub use progress::{NodeRef, ProgressCallback, ProgressSender, SyncProgress, SyncState, emit};

pub use report::{NodeErrorReport, SyncErrors};

pub use engine::sync_stage;
pub use machine::sync_node;
pub use scheduler::run_ordered;
