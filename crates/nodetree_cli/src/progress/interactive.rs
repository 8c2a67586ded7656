use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nodetree::NodeId;
use nodetree::sync::{SyncProgress, SyncState};

use super::indent;

/// Bar of one repository on one node.
struct RepositoryBar {
    bar: ProgressBar,
    /// Whether the bar currently uses the determinate style.
    determinate: bool,
}

/// Interactive progress reporter using indicatif.
///
/// One line per (node, repository) pair, prefixed with the node's fqdn
/// indented by depth. Lines start as spinners and switch to a bar once the
/// job reports an item count.
pub struct InteractiveReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<(NodeId, String), RepositoryBar>>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        let key = (event.node.id, event.repository.clone());
        let entry = bars.entry(key).or_insert_with(|| self.create_bar(&event));
        let pb = &entry.bar;

        match event.state {
            SyncState::Init => {
                pb.set_message(format!("{}: started", event.repository));
            }
            SyncState::Running if event.items_total > 0 => {
                if !entry.determinate {
                    pb.set_style(Self::bar_style());
                    entry.determinate = true;
                }
                pb.set_length(event.items_total);
                pb.set_position(event.items_done());
                pb.set_message(format!("{} ({}%)", event.repository, event.size_percent()));
            }
            SyncState::Running => {
                pb.set_message(format!("{}: running", event.repository));
            }
            SyncState::Waiting => {
                let detail = event.message.as_deref().unwrap_or("waiting");
                pb.set_message(format!("{}: {}", event.repository, style(detail).yellow()));
            }
            SyncState::Finished => {
                if entry.determinate {
                    pb.set_position(event.items_total);
                }
                pb.finish_with_message(format!(
                    "{} {}",
                    style("✓").green().bold(),
                    event.repository
                ));
            }
            SyncState::Error => {
                pb.abandon_with_message(format!(
                    "{} {}: {}",
                    style("✗").red().bold(),
                    event.repository,
                    style(event.message.as_deref().unwrap_or("failed")).red()
                ));
            }
            SyncState::Skipped => {
                pb.finish_with_message(format!(
                    "{} {}",
                    style("-").dim(),
                    style(format!("{} skipped", event.repository)).dim()
                ));
            }
        }
    }

    fn create_bar(&self, event: &SyncProgress) -> RepositoryBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(Self::spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_prefix(format!(
            "{}{:28}",
            indent(event.node.depth),
            event.node.fqdn
        ));
        bar.set_message(event.repository.clone());
        RepositoryBar {
            bar,
            determinate: false,
        }
    }

    pub fn finish(&self) {
        let bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        for entry in bars.values() {
            if !entry.bar.is_finished() {
                entry.bar.finish();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>5}/{len:5} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
