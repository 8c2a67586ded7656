//! Configuration file support for nodetree.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. Environment variables (prefixed with `NODETREE_`, sections separated by
//!    `__`, e.g. `NODETREE_API__USER`, `NODETREE_TREE_FILE`)
//! 2. The file passed with `--config`
//! 3. Local config file (`./nodetree.toml`)
//! 4. XDG config file (`~/.config/nodetree/config.toml`)
//! 5. Built-in defaults
//!
//! Example config file:
//! ```toml
//! tree_file = "/etc/nodetree/tree.yaml"
//!
//! [api]
//! user = "admin"        # or NODETREE_API__USER
//! passwd = "..."        # or NODETREE_API__PASSWD
//! scheme = "https"
//! timeout_secs = 30
//! accept_invalid_certs = false
//!
//! [sync]
//! poll_interval_ms = 500
//! waiting_backoff_secs = 10
//! waiting_retries = 3
//! check_feeds = true
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use nodetree::pulp::PulpOptions;
use nodetree::{Credentials, PollPolicy, StageTree};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the stage tree file (YAML, TOML or JSON by extension).
    pub tree_file: PathBuf,
    /// Node API settings.
    pub api: ApiConfig,
    /// Poll timing and checks.
    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tree_file: PathBuf::from("tree.yaml"),
            api: ApiConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

/// Node API settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Fallback user when neither the node nor the stage tree sets one.
    pub user: Option<String>,
    pub passwd: Option<String>,
    pub scheme: String,
    pub timeout_secs: u64,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            user: None,
            passwd: None,
            scheme: "https".to_string(),
            timeout_secs: 30,
            accept_invalid_certs: false,
        }
    }
}

/// Poll timing and checks.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub poll_interval_ms: u64,
    pub waiting_backoff_secs: u64,
    pub waiting_retries: usize,
    pub check_feeds: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: nodetree::sync::DEFAULT_POLL_INTERVAL_MS,
            waiting_backoff_secs: nodetree::sync::DEFAULT_WAITING_BACKOFF_SECS,
            waiting_retries: nodetree::sync::DEFAULT_WAITING_RETRIES,
            check_feeds: true,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Failures fall back to defaults with a warning.
    pub fn load(extra: Option<&Path>) -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("nodetree.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./nodetree.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        if let Some(path) = extra {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("NODETREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Read and validate the stage tree file.
    pub fn load_stage_tree(&self) -> Result<StageTree, Box<dyn Error>> {
        load_stage_tree(&self.tree_file)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            poll_interval: Duration::from_millis(self.sync.poll_interval_ms),
            waiting_backoff: Duration::from_secs(self.sync.waiting_backoff_secs),
            waiting_retries: self.sync.waiting_retries,
        }
    }

    /// Client options; stage tree credentials win over configured ones.
    pub fn pulp_options(&self, tree: &StageTree) -> PulpOptions {
        let configured = match (&self.api.user, &self.api.passwd) {
            (Some(user), Some(passwd)) => Some(Credentials::new(user, passwd)),
            _ => None,
        };
        PulpOptions {
            scheme: self.api.scheme.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
            accept_invalid_certs: self.api.accept_invalid_certs,
            default_credentials: tree.default_credentials().or(configured),
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "nodetree").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Parse a stage tree file in any format the config crate infers from its
/// extension, then validate it.
pub fn load_stage_tree(path: &Path) -> Result<StageTree, Box<dyn Error>> {
    if !path.exists() {
        return Err(format!("stage tree file {} does not exist", path.display()).into());
    }

    let tree = ConfigBuilder::builder()
        .add_source(File::from(path).required(true))
        .build()
        .and_then(|settings| settings.try_deserialize::<StageTree>())
        .map_err(|e| format!("could not read stage tree {}: {}", path.display(), e))?;

    tree.validate()
        .map_err(|e| format!("invalid stage tree {}: {}", path.display(), e))?;
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock should be after epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("nodetree-config-test-{nonce}"));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let path = dir.join(name);
        std::fs::write(&path, contents).expect("temp file should be writable");
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tree_file, PathBuf::from("tree.yaml"));
        assert_eq!(config.api.scheme, "https");
        assert_eq!(config.api.timeout_secs, 30);
        assert!(!config.api.accept_invalid_certs);
        assert_eq!(config.sync.poll_interval_ms, 500);
        assert_eq!(config.sync.waiting_backoff_secs, 10);
        assert_eq!(config.sync.waiting_retries, 3);
        assert!(config.sync.check_feeds);
    }

    #[test]
    fn test_poll_policy_from_defaults_matches_library() {
        assert_eq!(Config::default().poll_policy(), PollPolicy::default());
    }

    #[test]
    fn test_config_builder_partial_override() {
        let toml_content = r#"
            tree_file = "/etc/nodetree/tree.yaml"

            [sync]
            waiting_retries = 5
        "#;

        let settings = ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap();
        let config: Config = settings.try_deserialize().unwrap();

        assert_eq!(config.tree_file, PathBuf::from("/etc/nodetree/tree.yaml"));
        assert_eq!(config.sync.waiting_retries, 5);
        assert_eq!(config.sync.poll_interval_ms, 500);
        assert_eq!(config.api.scheme, "https");
    }

    #[test]
    fn test_config_merging_order() {
        let base_toml = r#"
            [api]
            scheme = "http"
            timeout_secs = 10
        "#;
        let override_toml = r#"
            [api]
            timeout_secs = 60
        "#;

        let settings = ConfigBuilder::builder()
            .add_source(config::File::from_str(base_toml, FileFormat::Toml))
            .add_source(config::File::from_str(override_toml, FileFormat::Toml))
            .build()
            .unwrap();
        let config: Config = settings.try_deserialize().unwrap();

        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.api.scheme, "http");
    }

    #[test]
    fn test_config_invalid_toml() {
        let result = ConfigBuilder::builder()
            .add_source(config::File::from_str("[sync\nwaiting_retries = 1", FileFormat::Toml))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_pulp_options_prefer_tree_credentials() {
        let mut config = Config::default();
        config.api.user = Some("config-user".to_string());
        config.api.passwd = Some("config-pw".to_string());

        let without_tree = config.pulp_options(&StageTree::default());
        assert_eq!(
            without_tree.default_credentials,
            Some(Credentials::new("config-user", "config-pw"))
        );

        let tree = StageTree {
            api_user: Some("tree-user".to_string()),
            api_passwd: Some("tree-pw".to_string()),
            ..StageTree::default()
        };
        let with_tree = config.pulp_options(&tree);
        assert_eq!(
            with_tree.default_credentials,
            Some(Credentials::new("tree-user", "tree-pw"))
        );
        assert_eq!(with_tree.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_load_stage_tree_from_yaml() {
        let path = temp_file(
            "tree.yaml",
            r#"
description: rpm mirrors
api_user: admin
api_passwd: secret
stages:
  - name: prod
    root:
      fqdn: master.example.com
      children:
        - fqdn: eu.example.com
          tags: [eu]
          children:
            - fqdn: eu1.example.com
        - fqdn: us.example.com
"#,
        );

        let tree = load_stage_tree(&path).expect("tree should load");
        let stage = tree.stage("prod").expect("prod exists");
        assert_eq!(stage.len(), 4);
        assert_eq!(tree.description.as_deref(), Some("rpm mirrors"));

        std::fs::remove_dir_all(path.parent().expect("temp dir")).ok();
    }

    #[test]
    fn test_load_stage_tree_rejects_duplicates() {
        let path = temp_file(
            "tree.json",
            r#"{"stages": [
                {"name": "prod", "root": {"fqdn": "a"}},
                {"name": "prod", "root": {"fqdn": "b"}}
            ]}"#,
        );

        let err = load_stage_tree(&path).expect_err("duplicate stage");
        assert!(err.to_string().contains("defined more than once"));

        std::fs::remove_dir_all(path.parent().expect("temp dir")).ok();
    }

    #[test]
    fn test_load_stage_tree_missing_file() {
        let err = load_stage_tree(Path::new("/nonexistent/nodetree/tree.yaml"))
            .expect_err("missing file");
        assert!(err.to_string().contains("does not exist"));
    }
}
