//! nodetree - dependency-ordered repository sync across a tree of mirrors.
//!
//! Mirrors are organised into named stages. Each stage is a tree whose root
//! is the content origin; every other node pulls its repositories from its
//! parent. A sync run walks the tree parents-first, triggers a sync job for
//! each selected repository on each node, polls it to completion and
//! skips repositories whose upstream copy failed.
//!
//! # Features
//!
//! - `pulp` (default) - [`pulp::PulpClient`], a Pulp 2 REST API
//!   implementation of [`RepositorySyncService`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nodetree::{StageTree, SyncOptions, sync_stage};
//! use nodetree::pulp::{PulpClient, PulpOptions};
//!
//! let tree: StageTree = serde_json::from_str(&text)?;
//! let stage = Arc::new(tree.stage("prod")?.filter(&fqdns, &tags));
//! let client = PulpClient::new(&PulpOptions::default())?;
//!
//! let errors = sync_stage(&stage, Arc::new(client), SyncOptions::named(["rpm-base"]), None).await;
//! if errors.any() {
//!     eprintln!("{errors}");
//! }
//! ```

pub mod http;
pub mod service;
pub mod sync;
pub mod tree;

#[cfg(feature = "pulp")]
pub mod pulp;

pub use service::{
    ContentProgress, Credentials, JobHandle, JobState, JobStatus, RemoteRepository,
    RepositorySyncService, ServiceError,
};
pub use sync::{
    PollPolicy, ProgressCallback, RepositorySelection, SyncError, SyncErrors, SyncOptions,
    SyncProgress, SyncState, sync_stage,
};
pub use tree::{Node, NodeConfig, NodeId, Stage, StageTree, StageTreeError};
