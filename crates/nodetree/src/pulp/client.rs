//! Pulp API client.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::error::PulpError;
use super::types::{CallReport, PulpRepository, PulpTask};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::service::{
    self, Credentials, JobHandle, JobStatus, RemoteRepository, RepositorySyncService,
};
use crate::tree::Node;

/// Path of the Pulp 2 REST API on every node.
pub const API_PREFIX: &str = "/pulp/api/v2";

/// Connection settings shared by every node of a stage.
#[derive(Debug, Clone)]
pub struct PulpOptions {
    /// `https` or `http`.
    pub scheme: String,
    pub timeout: StdDuration,
    pub accept_invalid_certs: bool,
    /// Used for nodes that set no credentials of their own.
    pub default_credentials: Option<Credentials>,
}

impl Default for PulpOptions {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            timeout: StdDuration::from_secs(30),
            accept_invalid_certs: false,
            default_credentials: None,
        }
    }
}

/// Pulp error body; only the message is used.
#[derive(Debug, Deserialize)]
struct PulpErrorBody {
    error_message: Option<String>,
}

/// Pulp 2 API client.
///
/// One client serves every node: the host comes from the node's fqdn and
/// credentials from the node, falling back to the client's defaults.
#[derive(Clone)]
pub struct PulpClient {
    transport: Arc<dyn HttpTransport>,
    scheme: String,
    default_credentials: Option<Credentials>,
}

impl PulpClient {
    /// Create a client backed by reqwest.
    pub fn new(options: &PulpOptions) -> Result<Self, PulpError> {
        let transport = ReqwestTransport::with_options(options.timeout, options.accept_invalid_certs)
            .map_err(|e| PulpError::Config(e.to_string()))?;

        Ok(Self::new_with_transport(
            &options.scheme,
            options.default_credentials.clone(),
            Arc::new(transport),
        ))
    }

    pub fn new_with_transport(
        scheme: &str,
        default_credentials: Option<Credentials>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            scheme: scheme.trim_end_matches("://").to_string(),
            default_credentials,
        }
    }

    fn url(&self, node: &Node, path: &str) -> String {
        format!("{}://{}{}{}", self.scheme, node.fqdn, API_PREFIX, path)
    }

    fn authorization(&self, node: &Node) -> Option<String> {
        let credentials = node.credentials().or_else(|| self.default_credentials.clone())?;
        let token = STANDARD.encode(format!("{}:{}", credentials.user, credentials.passwd));
        Some(format!("Basic {token}"))
    }

    /// Send a request to `node` and decode a JSON response.
    async fn request<T: DeserializeOwned>(
        &self,
        node: &Node,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, PulpError> {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), "nodetree".to_string()),
        ];
        if let Some(auth) = self.authorization(node) {
            headers.push(("Authorization".to_string(), auth));
        }
        let body = match body {
            Some(value) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                serde_json::to_vec(&value)?
            }
            None => Vec::new(),
        };

        let request = HttpRequest {
            method,
            url: self.url(node, path),
            headers,
            body,
        };
        tracing::trace!(method = method.as_str(), url = %request.url, "Pulp request");

        let response: HttpResponse = self
            .transport
            .send(request)
            .await
            .map_err(|e| PulpError::Http(e.to_string()))?;

        if !response.is_success() {
            let message = serde_json::from_slice::<PulpErrorBody>(&response.body)
                .ok()
                .and_then(|b| b.error_message)
                .unwrap_or_else(|| String::from_utf8_lossy(&response.body).to_string());
            return Err(PulpError::Api {
                status: response.status,
                message,
            });
        }

        serde_json::from_slice(&response.body).map_err(PulpError::Json)
    }

    /// List repositories with importer details.
    pub async fn repositories(&self, node: &Node) -> Result<Vec<PulpRepository>, PulpError> {
        self.request(node, HttpMethod::Get, "/repositories/?details=true", None)
            .await
    }

    /// Start a sync of `repository` with its stored importer config.
    pub async fn sync_repository(&self, node: &Node, repository: &str) -> Result<CallReport, PulpError> {
        let path = format!("/repositories/{repository}/actions/sync/");
        self.request(
            node,
            HttpMethod::Post,
            &path,
            Some(serde_json::json!({ "override_config": {} })),
        )
        .await
    }

    pub async fn task(&self, node: &Node, task_id: &str) -> Result<PulpTask, PulpError> {
        self.request(node, HttpMethod::Get, &format!("/tasks/{task_id}/"), None)
            .await
    }
}

#[async_trait]
impl RepositorySyncService for PulpClient {
    async fn list_repositories(&self, node: &Node) -> service::Result<Vec<RemoteRepository>> {
        let repositories = self.repositories(node).await?;
        Ok(repositories.into_iter().map(RemoteRepository::from).collect())
    }

    async fn trigger_sync(&self, node: &Node, repository: &str) -> service::Result<JobHandle> {
        let report = self.sync_repository(node, repository).await?;
        let task = report
            .spawned_tasks
            .into_iter()
            .next()
            .ok_or_else(|| PulpError::NoSpawnedTask(repository.to_string()))?;
        Ok(JobHandle::new(task.task_id))
    }

    async fn job_status(&self, node: &Node, job: &JobHandle) -> service::Result<JobStatus> {
        let task = self.task(node, &job.id).await?;
        Ok(task.to_job_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockTransport;
    use crate::service::{JobState, ServiceError};
    use crate::tree::{NodeConfig, Stage};

    const BASE: &str = "https://mirror.example.com/pulp/api/v2";

    fn stage(config: NodeConfig) -> Stage {
        Stage::from_config("prod", &config)
    }

    fn client(transport: &MockTransport) -> PulpClient {
        PulpClient::new_with_transport(
            "https",
            Some(Credentials::new("admin", "secret")),
            Arc::new(transport.clone()),
        )
    }

    #[tokio::test]
    async fn list_repositories_uses_details_and_default_credentials() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/repositories/?details=true"),
            200,
            r#"[
                {"id": "rpm-base", "importers": [{"config": {"feed": "https://parent/pulp/repos/rpm-base/"}}]},
                {"id": "rpm-local", "importers": []}
            ]"#,
        );
        let stage = stage(NodeConfig::new("mirror.example.com"));
        let node = stage.node(stage.root());

        let repos = client(&transport)
            .list_repositories(node)
            .await
            .expect("listing should succeed");

        assert_eq!(
            repos,
            vec![
                RemoteRepository::new("rpm-base").with_feed("https://parent/pulp/repos/rpm-base/"),
                RemoteRepository::new("rpm-local"),
            ]
        );
        let requests = transport.requests();
        // admin:secret
        assert_eq!(
            requests[0].header("authorization"),
            Some("Basic YWRtaW46c2VjcmV0")
        );
    }

    #[tokio::test]
    async fn node_credentials_override_defaults() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{BASE}/repositories/?details=true"), 200, "[]");
        let stage = stage(NodeConfig::new("mirror.example.com").with_credentials("node", "pw"));
        let node = stage.node(stage.root());

        client(&transport)
            .list_repositories(node)
            .await
            .expect("listing should succeed");

        let expected = format!("Basic {}", STANDARD.encode("node:pw"));
        assert_eq!(
            transport.requests()[0].header("authorization"),
            Some(expected.as_str())
        );
    }

    #[tokio::test]
    async fn trigger_sync_posts_override_config_and_returns_first_task() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/repositories/rpm-base/actions/sync/"),
            202,
            r#"{"result": null, "error": null, "spawned_tasks": [{"_href": "/pulp/api/v2/tasks/abc/", "task_id": "abc"}]}"#,
        );
        let stage = stage(NodeConfig::new("mirror.example.com"));
        let node = stage.node(stage.root());

        let job = client(&transport)
            .trigger_sync(node, "rpm-base")
            .await
            .expect("trigger should succeed");

        assert_eq!(job, JobHandle::new("abc"));
        let request = &transport.requests()[0];
        assert_eq!(request.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&request.body).expect("json body");
        assert_eq!(body, serde_json::json!({ "override_config": {} }));
    }

    #[tokio::test]
    async fn trigger_without_spawned_task_is_an_error() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/repositories/rpm-base/actions/sync/"),
            202,
            r#"{"spawned_tasks": []}"#,
        );
        let stage = stage(NodeConfig::new("mirror.example.com"));

        let err = client(&transport)
            .trigger_sync(stage.node(stage.root()), "rpm-base")
            .await
            .expect_err("no task spawned");
        assert!(err.to_string().contains("spawned no task"));
    }

    #[tokio::test]
    async fn job_status_maps_task() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/tasks/abc/"),
            200,
            r#"{"task_id": "abc", "state": "finished", "progress_report": {}}"#,
        );
        let stage = stage(NodeConfig::new("mirror.example.com"));

        let status = client(&transport)
            .job_status(stage.node(stage.root()), &JobHandle::new("abc"))
            .await
            .expect("status should succeed");
        assert_eq!(status.state, JobState::Finished);
    }

    #[tokio::test]
    async fn api_errors_use_pulp_error_message() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/repositories/rpm-base/actions/sync/"),
            404,
            r#"{"http_status": 404, "error_message": "Missing resource(s): repository=rpm-base"}"#,
        );
        let stage = stage(NodeConfig::new("mirror.example.com"));

        let err = client(&transport)
            .trigger_sync(stage.node(stage.root()), "rpm-base")
            .await
            .expect_err("404 should fail");
        assert_eq!(
            err,
            ServiceError::not_found("Missing resource(s): repository=rpm-base")
        );
    }

    #[tokio::test]
    async fn transport_failure_is_unreachable() {
        let transport = MockTransport::new();
        transport.push_failure(
            HttpMethod::Get,
            format!("{BASE}/repositories/?details=true"),
            "connection refused",
        );
        let stage = stage(NodeConfig::new("mirror.example.com"));

        let err = client(&transport)
            .list_repositories(stage.node(stage.root()))
            .await
            .expect_err("transport failure");
        assert!(matches!(err, ServiceError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn plain_http_scheme_is_honoured() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            "http://mirror.example.com/pulp/api/v2/tasks/t/",
            200,
            r#"{"task_id": "t", "state": "waiting"}"#,
        );
        let client = PulpClient::new_with_transport("http://", None, Arc::new(transport.clone()));
        let stage = stage(NodeConfig::new("mirror.example.com"));

        let status = client
            .job_status(stage.node(stage.root()), &JobHandle::new("t"))
            .await
            .expect("status should succeed");
        assert_eq!(status.state, JobState::Waiting);
        assert_eq!(transport.requests()[0].header("authorization"), None);
    }
}
