//! Progress reporting for stage sync runs.
//!
//! This module provides four modes of progress reporting:
//! - Interactive mode (TTY): one indicatif bar per repository and node
//! - Quiet mode (`--quiet`): one styled line per state change
//! - Logging mode (non-TTY): structured logging using tracing
//! - Silent mode (`--silent`): nothing

mod interactive;
mod logging;
mod quiet;

use std::sync::Arc;

use console::Term;
use nodetree::sync::{ProgressCallback, SyncProgress};

pub use interactive::InteractiveReporter;
pub use logging::LoggingReporter;
pub use quiet::QuietReporter;

/// Indentation for a node at `depth`.
fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Progress reporter that dispatches to the selected renderer.
pub enum ProgressReporter {
    /// Interactive progress bars for TTY.
    Interactive(InteractiveReporter),
    /// One line per state change.
    Quiet(QuietReporter),
    /// Structured logging for non-TTY (CI, pipes).
    Logging(LoggingReporter),
    Silent,
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    /// Pick a renderer from the output flags; `silent` wins over `quiet`.
    pub fn for_output(quiet: bool, silent: bool) -> Self {
        if silent {
            Self::Silent
        } else if quiet {
            Self::Quiet(QuietReporter::new())
        } else {
            Self::new()
        }
    }

    /// Handle a progress event.
    pub fn handle(&self, event: SyncProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Quiet(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
            Self::Silent => {}
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> ProgressCallback {
        let reporter = Arc::clone(self);
        Box::new(move |event| {
            reporter.handle(event);
        })
    }

    /// Finish all progress bars (interactive mode only).
    pub fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
