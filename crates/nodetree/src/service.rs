//! The remote repository sync service a node exposes.
//!
//! The sync engine only talks to nodes through [`RepositorySyncService`]:
//! list a node's repositories, trigger a sync job for one of them, and poll
//! the job. The Pulp implementation lives in [`crate::pulp`]; tests provide
//! in-memory fakes.
//!
//! # Example
//!
//! ```ignore
//! use nodetree::service::{JobState, RepositorySyncService};
//!
//! async fn sync_once<S: RepositorySyncService>(service: &S, node: &Node) -> Result<(), ServiceError> {
//!     let job = service.trigger_sync(node, "rpm-base").await?;
//!     let status = service.job_status(node, &job).await?;
//!     println!("{} is {:?}", job.id, status.state);
//!     Ok(())
//! }
//! ```

mod errors;
mod types;

pub use errors::{Result, ServiceError, short_error_message};
pub use types::{
    ContentProgress, Credentials, JobHandle, JobState, JobStatus, RemoteRepository,
    RepositorySyncService,
};
