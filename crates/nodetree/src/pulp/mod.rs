//! Pulp 2 REST API implementation of [`RepositorySyncService`](crate::service::RepositorySyncService).
//!
//! # Module Structure
//!
//! - [`error`] - Error types for Pulp API operations
//! - [`types`] - Response payloads and their mapping onto service types
//! - [`client`] - The HTTP client
//!
//! ```ignore
//! use std::sync::Arc;
//! use nodetree::pulp::{PulpClient, PulpOptions};
//! use nodetree::sync::{SyncOptions, sync_stage};
//!
//! let client = PulpClient::new(&PulpOptions::default())?;
//! let errors = sync_stage(&stage, Arc::new(client), SyncOptions::named(["rpm-base"]), None).await;
//! ```

mod client;
mod error;
mod types;

pub use client::{API_PREFIX, PulpClient, PulpOptions};
pub use error::PulpError;
pub use types::{
    CallReport, ContentReport, MetadataReport, ProgressReport, PulpImporter, PulpImporterConfig,
    PulpRepository, PulpTask, SpawnedTask, TaskError, YumImporterReport,
};
