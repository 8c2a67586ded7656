//! Pulp 2 API data types.
//!
//! Only the fields the sync engine reads are modelled; everything else in
//! the responses is ignored.

use serde::Deserialize;

use crate::service::{ContentProgress, JobState, JobStatus, RemoteRepository};

/// A repository from `GET /repositories/?details=true`.
#[derive(Debug, Clone, Deserialize)]
pub struct PulpRepository {
    pub id: String,
    #[serde(default)]
    pub importers: Vec<PulpImporter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PulpImporter {
    #[serde(default, alias = "importer_config")]
    pub config: PulpImporterConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PulpImporterConfig {
    pub feed: Option<String>,
}

impl PulpRepository {
    /// Feed of the first importer, if any.
    #[must_use]
    pub fn feed(&self) -> Option<&str> {
        self.importers.first()?.config.feed.as_deref()
    }
}

impl From<PulpRepository> for RemoteRepository {
    fn from(repo: PulpRepository) -> Self {
        let feed = repo.feed().map(str::to_string);
        RemoteRepository { name: repo.id, feed }
    }
}

/// Response to a sync action.
#[derive(Debug, Clone, Deserialize)]
pub struct CallReport {
    #[serde(default)]
    pub spawned_tasks: Vec<SpawnedTask>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpawnedTask {
    pub task_id: String,
}

/// A task from `GET /tasks/{id}/`.
#[derive(Debug, Clone, Deserialize)]
pub struct PulpTask {
    pub task_id: String,
    pub state: String,
    #[serde(default)]
    pub progress_report: Option<ProgressReport>,
    #[serde(default)]
    pub error: Option<TaskError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressReport {
    #[serde(default)]
    pub yum_importer: Option<YumImporterReport>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YumImporterReport {
    #[serde(default)]
    pub content: Option<ContentReport>,
    #[serde(default)]
    pub metadata: Option<MetadataReport>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ContentReport {
    pub size_total: u64,
    pub size_left: u64,
    pub items_total: u64,
    pub items_left: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataReport {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub description: Option<String>,
}

impl PulpTask {
    fn yum_importer(&self) -> Option<&YumImporterReport> {
        self.progress_report.as_ref()?.yum_importer.as_ref()
    }

    /// Map Pulp task states onto job states.
    ///
    /// `waiting` and `accepted` are queued; `canceled` and `skipped` end the
    /// job without content, which counts as an error.
    #[must_use]
    pub fn job_state(&self) -> JobState {
        match self.state.as_str() {
            "running" => JobState::Running,
            "finished" => JobState::Finished,
            "error" | "canceled" | "skipped" => JobState::Error,
            _ => JobState::Waiting,
        }
    }

    #[must_use]
    pub fn to_job_status(&self) -> JobStatus {
        let state = self.job_state();
        let content = self
            .yum_importer()
            .and_then(|report| report.content)
            .map(|c| ContentProgress {
                size_total: c.size_total,
                size_left: c.size_left,
                items_total: c.items_total,
                items_left: c.items_left,
            });

        let error_detail = (state == JobState::Error).then(|| {
            self.yum_importer()
                .and_then(|report| report.metadata.as_ref())
                .and_then(|metadata| metadata.error.clone())
                .filter(|e| !e.is_empty())
                .or_else(|| self.error.as_ref().and_then(|e| e.description.clone()))
                .unwrap_or_else(|| format!("sync task '{}' ended in state {}", self.task_id, self.state))
        });

        JobStatus {
            state,
            content,
            error_detail,
        }
    }
}
