use std::collections::HashMap;
use std::sync::Mutex;

use console::style;
use nodetree::NodeId;
use nodetree::sync::{SyncProgress, SyncState};

use super::indent;

/// Line-per-state-change reporter for `--quiet`.
///
/// Repeated events in the same state (running polls, waiting retries) print
/// nothing.
pub struct QuietReporter {
    last: Mutex<HashMap<(NodeId, String), SyncState>>,
}

impl QuietReporter {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(HashMap::new()),
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        if let Some(line) = self.line_for(&event) {
            println!("{line}");
        }
    }

    fn line_for(&self, event: &SyncProgress) -> Option<String> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let key = (event.node.id, event.repository.clone());
        if last.insert(key, event.state) == Some(event.state) {
            return None;
        }
        Some(format_line(event))
    }
}

impl Default for QuietReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn format_line(event: &SyncProgress) -> String {
    let state = match event.state {
        SyncState::Init | SyncState::Running => style(event.state.as_str()).cyan(),
        SyncState::Waiting => style(event.state.as_str()).yellow(),
        SyncState::Finished => style(event.state.as_str()).green(),
        SyncState::Error => style(event.state.as_str()).red().bold(),
        SyncState::Skipped => style(event.state.as_str()).dim(),
    };

    let mut line = format!(
        "{}{} {}: {}",
        indent(event.node.depth),
        style(&event.node.fqdn).bold(),
        event.repository,
        state
    );
    if let Some(message) = &event.message {
        line.push_str(&format!(" ({message})"));
    }
    line
}
