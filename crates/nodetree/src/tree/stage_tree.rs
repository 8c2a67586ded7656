//! The stage tree file: every stage of a deployment plus shared defaults.

use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use super::node::NodeConfig;
use super::stage::Stage;
use crate::service::Credentials;

/// Errors found while validating a stage tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageTreeError {
    /// Two stages share a name.
    #[error("stage '{0}' is defined more than once")]
    DuplicateStage(String),

    /// A stage has no name.
    #[error("stage #{0} has an empty name")]
    EmptyStageName(usize),

    /// A node has no fqdn.
    #[error("stage '{stage}' contains a node without fqdn")]
    EmptyFqdn { stage: String },

    /// The same fqdn appears twice within one stage.
    #[error("node '{fqdn}' appears more than once in stage '{stage}'")]
    DuplicateNode { stage: String, fqdn: String },

    /// The requested stage does not exist.
    #[error("stage '{0}' not found")]
    StageNotFound(String),
}

/// One stage as written in the stage tree file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StageConfig {
    pub name: String,
    pub root: NodeConfig,
}

/// All stages plus credentials used when a node sets none of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StageTree {
    pub description: Option<String>,
    pub api_user: Option<String>,
    pub api_passwd: Option<String>,
    pub stages: Vec<StageConfig>,
}

impl StageTree {
    /// Stage names in file order.
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name.as_str())
    }

    /// Build the indexed stage called `name`.
    pub fn stage(&self, name: &str) -> Result<Stage, StageTreeError> {
        self.stages
            .iter()
            .find(|s| s.name == name)
            .map(|s| Stage::from_config(s.name.clone(), &s.root))
            .ok_or_else(|| StageTreeError::StageNotFound(name.to_string()))
    }

    /// Credentials applied to nodes that set none of their own.
    #[must_use]
    pub fn default_credentials(&self) -> Option<Credentials> {
        match (&self.api_user, &self.api_passwd) {
            (Some(user), Some(passwd)) => Some(Credentials::new(user, passwd)),
            _ => None,
        }
    }

    /// Check stage names and fqdns for emptiness and duplicates.
    pub fn validate(&self) -> Result<(), StageTreeError> {
        let mut names = HashSet::new();
        for (index, stage) in self.stages.iter().enumerate() {
            if stage.name.trim().is_empty() {
                return Err(StageTreeError::EmptyStageName(index));
            }
            if !names.insert(stage.name.as_str()) {
                return Err(StageTreeError::DuplicateStage(stage.name.clone()));
            }

            let mut fqdns = HashSet::new();
            let mut pending = vec![&stage.root];
            while let Some(node) = pending.pop() {
                if node.fqdn.trim().is_empty() {
                    return Err(StageTreeError::EmptyFqdn {
                        stage: stage.name.clone(),
                    });
                }
                if !fqdns.insert(node.fqdn.as_str()) {
                    return Err(StageTreeError::DuplicateNode {
                        stage: stage.name.clone(),
                        fqdn: node.fqdn.clone(),
                    });
                }
                pending.extend(node.children.iter());
            }
        }
        Ok(())
    }
}
